//! Enrollment domain.
//!
//! Defines the wizard steps, the pure step state machine and the session
//! data the wizard accumulates.

mod clock;
mod password;
mod session;
pub mod state_machine;
mod step;
mod visible_steps;

pub use clock::SessionClock;
pub use password::{validate_password, MIN_PASSWORD_LEN};
pub use session::{
    DeviceKeys, EnrollmentSession, PersistedEnrollment, SessionEnvelope, SESSION_SCHEMA_VERSION,
};
pub use state_machine::{
    EnrollmentStateMachine, NavigationIntent, StepContext, StepError, StepInput, WizardAction,
    WizardEvent, WizardState,
};
pub use step::{EnrollmentStep, StepFlags};
pub use visible_steps::{IndicatorEntry, StepIndicator, VisibleSteps};
