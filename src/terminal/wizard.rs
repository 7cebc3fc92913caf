//! Interactive enrollment wizard on the terminal.
//!
//! Renders the current step from a session snapshot, reads the answer and
//! submits it through the [`NavigationQueue`]. Typing `back` on any step
//! that allows it goes to the previous step.

use std::sync::Arc;

use tracing::debug;

use dg_app::usecases::enrollment::{EnrollmentOrchestrator, NavigationQueue};
use dg_core::enrollment::{
    EnrollmentSession, EnrollmentStep, NavigationIntent, StepInput, WizardEvent, WizardState,
};
use dg_core::{MfaMethod, SecretString};

use super::console::Console;
use super::prompt::parse_choice;

const BACK: &str = "back";
const SKIP: &str = "skip";
const RESEND: &str = "resend";

const REGISTRABLE_METHODS: [MfaMethod; 2] = [MfaMethod::Totp, MfaMethod::Email];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    Completed,
    Expired,
    /// Input ended before the wizard finished. The session stays stored.
    Interrupted,
}

pub struct WizardDriver {
    orchestrator: Arc<EnrollmentOrchestrator>,
    queue: NavigationQueue,
    console: Arc<Console>,
    device_name: String,
}

fn advance(input: StepInput) -> WizardEvent {
    WizardEvent::Navigate(NavigationIntent::Advance(input))
}

fn retreat() -> WizardEvent {
    WizardEvent::Navigate(NavigationIntent::Retreat)
}

impl WizardDriver {
    pub fn new(
        orchestrator: Arc<EnrollmentOrchestrator>,
        queue: NavigationQueue,
        console: Arc<Console>,
        device_name: String,
    ) -> Self {
        Self {
            orchestrator,
            queue,
            console,
            device_name,
        }
    }

    pub async fn run(&self) -> anyhow::Result<WizardOutcome> {
        let _deadline = self.orchestrator.mount().await;

        loop {
            let step = match self.orchestrator.state().await {
                WizardState::Completed => return Ok(WizardOutcome::Completed),
                WizardState::Expired => return Ok(WizardOutcome::Expired),
                WizardState::Active { step, error } => {
                    if let Some(error) = error {
                        self.console.say(format!("! {error}")).await;
                    }
                    step
                }
            };
            let Some(session) = self.orchestrator.session().await else {
                return Ok(WizardOutcome::Completed);
            };
            if let Some(indicator) = self.orchestrator.indicator().await {
                self.console
                    .say(format!("\n== Step {} of {} ==", indicator.current, indicator.total))
                    .await;
            }

            let Some(event) = self.read_step(step, &session).await else {
                return Ok(WizardOutcome::Interrupted);
            };
            if event == retreat() && !self.orchestrator.can_retreat().await {
                self.console.say("You cannot go back from here.").await;
                continue;
            }

            match self.queue.submit(event).await {
                Some(result) => {
                    result?;
                }
                None => debug!("submission ignored while another is in flight"),
            }
        }
    }

    async fn read_step(&self, step: EnrollmentStep, session: &EnrollmentSession) -> Option<WizardEvent> {
        let console = &self.console;
        let user = &session.user_info;
        match step {
            EnrollmentStep::Welcome => {
                console
                    .say(format!(
                        "Welcome {}! You are enrolling to {}.",
                        user.first_name, session.instance.name
                    ))
                    .await;
                console
                    .say(format!(
                        "Your administrator is {} <{}>.",
                        session.admin_info.name, session.admin_info.email
                    ))
                    .await;
                console.ask("Press Enter to continue.").await?;
                Some(advance(StepInput::None))
            }
            EnrollmentStep::DataVerification => {
                console
                    .say(format!(
                        "{} {} ({}), {}",
                        user.first_name, user.last_name, user.login, user.email
                    ))
                    .await;
                let current = session.phone_number.clone().unwrap_or_default();
                let answer = console.ask_or("Phone number", &current).await?;
                if answer == BACK {
                    return Some(retreat());
                }
                Some(advance(StepInput::Contact {
                    phone_number: Some(answer),
                }))
            }
            EnrollmentStep::Password => {
                let password = console.ask("New password:").await?;
                if password == BACK {
                    return Some(retreat());
                }
                let repeat = console.ask("Repeat password:").await?;
                Some(advance(StepInput::Password {
                    password: SecretString::new(password),
                    repeat: SecretString::new(repeat),
                }))
            }
            EnrollmentStep::Device => {
                if session.device_committed {
                    return Some(advance(StepInput::None));
                }
                if session.flags.vpn_optional {
                    console.say(format!("Type '{SKIP}' to skip VPN setup.")).await;
                }
                let answer = console.ask_or("Device name", &self.device_name).await?;
                Some(match answer.as_str() {
                    BACK => retreat(),
                    SKIP => advance(StepInput::SkipDevice),
                    _ => advance(StepInput::Device { name: answer }),
                })
            }
            EnrollmentStep::MfaChoice => {
                console.say("Set up multi-factor authentication:").await;
                for (n, method) in REGISTRABLE_METHODS.iter().enumerate() {
                    console.say(format!("  {}) {method}", n + 1)).await;
                }
                if session.flags.mfa_skippable {
                    console.say(format!("Type '{SKIP}' to set it up later.")).await;
                }
                loop {
                    let answer = console.ask("Method:").await?;
                    match answer.as_str() {
                        BACK => return Some(retreat()),
                        SKIP => return Some(advance(StepInput::SkipMfa)),
                        _ => {}
                    }
                    if let Some(index) = parse_choice(&answer, REGISTRABLE_METHODS.len()) {
                        return Some(advance(StepInput::MfaMethod(REGISTRABLE_METHODS[index])));
                    }
                    console.say("Unknown choice.").await;
                }
            }
            EnrollmentStep::MfaSetup => {
                match (session.mfa_method, session.totp_secret.as_deref()) {
                    (Some(MfaMethod::Email), _) => {
                        console
                            .say(format!(
                                "A code was sent to {}. Type '{RESEND}' to send another one.",
                                user.email
                            ))
                            .await
                    }
                    (_, Some(secret)) => {
                        console
                            .say(format!("Add this secret to your authenticator app: {secret}"))
                            .await
                    }
                    _ => {}
                }
                let answer = console.ask("Code:").await?;
                Some(match answer.as_str() {
                    BACK => retreat(),
                    RESEND => WizardEvent::ResendMfaCode,
                    _ => advance(StepInput::MfaCode { code: answer }),
                })
            }
            EnrollmentStep::MfaRecovery => {
                console
                    .say("Save these recovery codes. They are shown only once:")
                    .await;
                for code in session.recovery_codes.iter().flatten() {
                    console.say(format!("  {code}")).await;
                }
                console.ask("Press Enter once saved.").await?;
                Some(advance(StepInput::None))
            }
            EnrollmentStep::Activate => {
                console.ask("Press Enter to retry activation.").await?;
                Some(advance(StepInput::None))
            }
            EnrollmentStep::Finish => {
                if !session.final_page_content.is_empty() {
                    console.say(&session.final_page_content).await;
                }
                console.say("Enrollment complete.").await;
                console.ask("Press Enter to close.").await?;
                Some(advance(StepInput::None))
            }
        }
    }
}
