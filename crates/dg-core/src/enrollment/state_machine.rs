//! Enrollment wizard state machine.
//!
//! Defines a pure state transition function for the enrollment wizard.
//! Side effects are returned as [`WizardAction`]s and executed by the
//! application layer, which feeds their results back as events.

use serde::Serialize;
use thiserror::Error;

use super::password::validate_password;
use super::{EnrollmentStep, StepFlags};
use crate::error_kind::ErrorKind;
use crate::mfa::{is_valid_code, MfaMethod};
use crate::secret::SecretString;

/// Wizard state.
///
/// 向导状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WizardState {
    /// A step is shown, optionally with the error of its last submission.
    ///
    /// 当前步骤（可附带上次提交的错误）。
    Active {
        step: EnrollmentStep,
        error: Option<StepError>,
    },
    /// Session deadline passed. Terminal.
    ///
    /// 会话已过期（终态）。
    Expired,
    /// Wizard finished and the session was cleared. Terminal.
    ///
    /// 向导完成（终态）。
    Completed,
}

impl WizardState {
    pub fn at(step: EnrollmentStep) -> Self {
        Self::Active { step, error: None }
    }

    pub fn step(&self) -> Option<EnrollmentStep> {
        match self {
            Self::Active { step, .. } => Some(*step),
            Self::Expired | Self::Completed => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            Self::Active { error, .. } => error.as_ref(),
            Self::Expired | Self::Completed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Completed)
    }
}

/// Single navigation intent emitted by the wizard chrome.
///
/// 导航意图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    Advance(StepInput),
    Retreat,
}

/// Form content submitted with an advance intent.
///
/// 前进时提交的表单内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    None,
    Contact { phone_number: Option<String> },
    Password {
        password: SecretString,
        repeat: SecretString,
    },
    Device { name: String },
    SkipDevice,
    MfaMethod(MfaMethod),
    SkipMfa,
    MfaCode { code: String },
}

/// Events that drive the wizard.
///
/// 驱动向导的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Navigate(NavigationIntent),
    /// Ask the proxy to send a fresh email code.
    ResendMfaCode,
    DeviceCreated,
    MfaRegistrationStarted,
    MfaRegistered,
    Activated,
    ActionFailed { error: StepError },
    DeadlineElapsed,
}

/// Side effects produced by transitions.
///
/// 状态迁移产生的副作用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    StoreContact { phone_number: Option<String> },
    StorePassword { password: SecretString },
    CreateDevice { name: String },
    StartMfaRegistration { method: MfaMethod },
    FinishMfaRegistration { code: String },
    /// Recovery codes were shown; drop them from the session.
    ConsumeRecoveryCodes,
    ActivateUser,
    CompleteEnrollment,
    ExpireSession,
}

impl WizardAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StoreContact { .. } => "store_contact",
            Self::StorePassword { .. } => "store_password",
            Self::CreateDevice { .. } => "create_device",
            Self::StartMfaRegistration { .. } => "start_mfa_registration",
            Self::FinishMfaRegistration { .. } => "finish_mfa_registration",
            Self::ConsumeRecoveryCodes => "consume_recovery_codes",
            Self::ActivateUser => "activate_user",
            Self::CompleteEnrollment => "complete_enrollment",
            Self::ExpireSession => "expire_session",
        }
    }
}

/// Step-level error shown next to the form that caused it.
///
/// 步骤错误类型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum StepError {
    #[error("password is required")]
    PasswordEmpty,
    #[error("password must be at least {min_len} characters long")]
    PasswordTooShort { min_len: usize },
    #[error("password must contain a digit")]
    PasswordMissingDigit,
    #[error("password must contain a lowercase letter")]
    PasswordMissingLowercase,
    #[error("password must contain an uppercase letter")]
    PasswordMissingUppercase,
    #[error("password must contain a special character")]
    PasswordMissingSpecial,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("device name is required")]
    DeviceNameEmpty,
    #[error("a device is required to finish enrollment")]
    DeviceSkipNotAllowed,
    #[error("code must be 6 digits")]
    InvalidCodeFormat,
    #[error("multi-factor authentication is required")]
    MfaSkipNotAllowed,
    #[error("{0} cannot be registered here")]
    UnsupportedMfaMethod(MfaMethod),
    #[error("{message}")]
    Request { kind: ErrorKind, message: String },
}

impl StepError {
    pub fn request(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Request {
            kind,
            message: message.into(),
        }
    }
}

/// Session facts the transition function needs besides the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepContext {
    pub flags: StepFlags,
    /// Device config was created and saved; going back past it is not allowed.
    pub device_committed: bool,
    /// MFA was registered; recovery codes were issued.
    pub mfa_registered: bool,
    pub mfa_method: Option<MfaMethod>,
}

impl StepContext {
    /// Step reached by advancing from `step`.
    pub fn next_after(&self, step: EnrollmentStep) -> EnrollmentStep {
        match step {
            EnrollmentStep::Welcome => EnrollmentStep::DataVerification,
            EnrollmentStep::DataVerification => EnrollmentStep::Password,
            EnrollmentStep::Password if self.device_committed => {
                self.next_after(EnrollmentStep::Device)
            }
            EnrollmentStep::Password => EnrollmentStep::Device,
            EnrollmentStep::Device if self.flags.mfa_required && !self.mfa_registered => {
                EnrollmentStep::MfaChoice
            }
            EnrollmentStep::Device => EnrollmentStep::Activate,
            EnrollmentStep::MfaChoice => EnrollmentStep::MfaSetup,
            EnrollmentStep::MfaSetup => EnrollmentStep::MfaRecovery,
            EnrollmentStep::MfaRecovery => EnrollmentStep::Activate,
            EnrollmentStep::Activate | EnrollmentStep::Finish => EnrollmentStep::Finish,
        }
    }

    /// Step reached by retreating from `step`, if going back is permitted.
    pub fn previous(&self, step: EnrollmentStep) -> Option<EnrollmentStep> {
        match step {
            EnrollmentStep::Welcome => None,
            EnrollmentStep::DataVerification => Some(EnrollmentStep::Welcome),
            EnrollmentStep::Password => Some(EnrollmentStep::DataVerification),
            EnrollmentStep::Device | EnrollmentStep::MfaChoice if self.device_committed => None,
            EnrollmentStep::Device => Some(EnrollmentStep::Password),
            EnrollmentStep::MfaChoice => Some(EnrollmentStep::Device),
            EnrollmentStep::MfaSetup => Some(EnrollmentStep::MfaChoice),
            EnrollmentStep::MfaRecovery | EnrollmentStep::Activate | EnrollmentStep::Finish => {
                None
            }
        }
    }

    pub fn can_retreat(&self, step: EnrollmentStep) -> bool {
        self.previous(step).is_some()
    }
}

/// Pure enrollment state machine.
///
/// 纯状态机：不包含副作用。
pub struct EnrollmentStateMachine;

impl EnrollmentStateMachine {
    pub fn transition(
        state: WizardState,
        event: WizardEvent,
        ctx: &StepContext,
    ) -> (WizardState, Vec<WizardAction>) {
        let (step, error) = match state {
            WizardState::Active { step, error } => (step, error),
            terminal => return (terminal, Vec::new()),
        };

        match (step, event) {
            (_, WizardEvent::DeadlineElapsed) => {
                (WizardState::Expired, vec![WizardAction::ExpireSession])
            }
            (step, WizardEvent::ActionFailed { error }) => (
                WizardState::Active {
                    step,
                    error: Some(error),
                },
                Vec::new(),
            ),
            (step, WizardEvent::Navigate(NavigationIntent::Retreat)) => match ctx.previous(step) {
                Some(previous) => (WizardState::at(previous), Vec::new()),
                None => (WizardState::Active { step, error }, Vec::new()),
            },
            (step, WizardEvent::Navigate(NavigationIntent::Advance(input))) => {
                Self::advance(step, error, input, ctx)
            }
            (EnrollmentStep::Device, WizardEvent::DeviceCreated) => {
                enter(ctx.next_after(EnrollmentStep::Device), Vec::new())
            }
            (
                EnrollmentStep::MfaChoice | EnrollmentStep::MfaSetup,
                WizardEvent::MfaRegistrationStarted,
            ) => (WizardState::at(EnrollmentStep::MfaSetup), Vec::new()),
            (EnrollmentStep::MfaSetup, WizardEvent::ResendMfaCode)
                if ctx.mfa_method == Some(MfaMethod::Email) =>
            {
                (
                    WizardState::at(EnrollmentStep::MfaSetup),
                    vec![WizardAction::StartMfaRegistration {
                        method: MfaMethod::Email,
                    }],
                )
            }
            (EnrollmentStep::MfaSetup, WizardEvent::MfaRegistered) => {
                (WizardState::at(EnrollmentStep::MfaRecovery), Vec::new())
            }
            (EnrollmentStep::Activate, WizardEvent::Activated) => {
                (WizardState::at(EnrollmentStep::Finish), Vec::new())
            }
            (step, _event) => (WizardState::Active { step, error }, Vec::new()),
        }
    }

    fn advance(
        step: EnrollmentStep,
        error: Option<StepError>,
        input: StepInput,
        ctx: &StepContext,
    ) -> (WizardState, Vec<WizardAction>) {
        let stay = |error: StepError| {
            (
                WizardState::Active {
                    step,
                    error: Some(error),
                },
                Vec::new(),
            )
        };
        let next = ctx.next_after(step);

        match (step, input) {
            (EnrollmentStep::Welcome, StepInput::None) => enter(next, Vec::new()),
            (EnrollmentStep::DataVerification, StepInput::None) => enter(next, Vec::new()),
            (EnrollmentStep::DataVerification, StepInput::Contact { phone_number }) => enter(
                next,
                vec![WizardAction::StoreContact {
                    phone_number: phone_number
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty()),
                }],
            ),
            (EnrollmentStep::Password, StepInput::Password { password, repeat }) => {
                match validate_password(&password, &repeat) {
                    Ok(()) => enter(next, vec![WizardAction::StorePassword { password }]),
                    Err(error) => stay(error),
                }
            }
            (EnrollmentStep::Device, _) if ctx.device_committed => enter(next, Vec::new()),
            (EnrollmentStep::Device, StepInput::Device { name }) => {
                let name = name.trim();
                if name.is_empty() {
                    return stay(StepError::DeviceNameEmpty);
                }
                (
                    WizardState::at(step),
                    vec![WizardAction::CreateDevice {
                        name: name.to_string(),
                    }],
                )
            }
            (EnrollmentStep::Device, StepInput::SkipDevice) if ctx.flags.vpn_optional => {
                enter(next, Vec::new())
            }
            (EnrollmentStep::Device, StepInput::SkipDevice) => {
                stay(StepError::DeviceSkipNotAllowed)
            }
            (EnrollmentStep::MfaChoice, StepInput::MfaMethod(method)) => {
                if !method.is_registrable() {
                    return stay(StepError::UnsupportedMfaMethod(method));
                }
                (
                    WizardState::at(step),
                    vec![WizardAction::StartMfaRegistration { method }],
                )
            }
            (EnrollmentStep::MfaChoice, StepInput::SkipMfa) if ctx.flags.mfa_skippable => {
                enter(EnrollmentStep::Activate, Vec::new())
            }
            (EnrollmentStep::MfaChoice, StepInput::SkipMfa) => stay(StepError::MfaSkipNotAllowed),
            (EnrollmentStep::MfaSetup, StepInput::MfaCode { code }) => {
                let code = code.trim();
                if !is_valid_code(code) {
                    return stay(StepError::InvalidCodeFormat);
                }
                (
                    WizardState::at(step),
                    vec![WizardAction::FinishMfaRegistration {
                        code: code.to_string(),
                    }],
                )
            }
            (EnrollmentStep::MfaRecovery, StepInput::None) => {
                enter(next, vec![WizardAction::ConsumeRecoveryCodes])
            }
            // Explicit retry of a failed activation.
            (EnrollmentStep::Activate, _) => {
                (WizardState::at(step), vec![WizardAction::ActivateUser])
            }
            (EnrollmentStep::Finish, _) => (
                WizardState::Completed,
                vec![WizardAction::CompleteEnrollment],
            ),
            (step, _input) => (WizardState::Active { step, error }, Vec::new()),
        }
    }
}

fn enter(step: EnrollmentStep, mut actions: Vec<WizardAction>) -> (WizardState, Vec<WizardAction>) {
    if step == EnrollmentStep::Activate {
        actions.push(WizardAction::ActivateUser);
    }
    (WizardState::at(step), actions)
}
