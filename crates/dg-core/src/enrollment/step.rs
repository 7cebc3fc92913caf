use serde::{Deserialize, Serialize};

/// Wizard steps in presentation order.
///
/// 向导步骤（按展示顺序）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStep {
    Welcome,
    DataVerification,
    Password,
    Device,
    MfaChoice,
    MfaSetup,
    MfaRecovery,
    /// Automatic; never rendered in the indicator.
    Activate,
    Finish,
}

impl EnrollmentStep {
    pub fn is_mfa(self) -> bool {
        matches!(self, Self::MfaChoice | Self::MfaSetup | Self::MfaRecovery)
    }

    pub fn is_hidden(self) -> bool {
        matches!(self, Self::Activate)
    }
}

/// Server-provided switches that shape the wizard for one session.
///
/// 服务端下发的向导开关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepFlags {
    /// The device step may be skipped.
    pub vpn_optional: bool,
    pub mfa_required: bool,
    pub mfa_skippable: bool,
}
