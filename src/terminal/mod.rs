//! Terminal adapters for the UI-facing ports.

mod console;
mod prompt;
mod ui;
mod wizard;

pub use console::Console;
pub use prompt::TerminalMfaPrompt;
pub use ui::{TerminalNavigator, TracingEnrollmentEvents};
pub use wizard::{WizardDriver, WizardOutcome};
