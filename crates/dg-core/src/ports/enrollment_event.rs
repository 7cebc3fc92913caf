use async_trait::async_trait;

use crate::enrollment::{StepIndicator, WizardState};

/// Notifies the host UI about wizard changes.
#[async_trait]
pub trait EnrollmentEventPort: Send + Sync {
    async fn emit_wizard_state_changed(&self, state: WizardState, indicator: Option<StepIndicator>);
}
