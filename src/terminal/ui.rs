use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use dg_core::enrollment::{StepIndicator, WizardState};
use dg_core::ports::{EnrollmentEventPort, NavigatorPort};
use dg_core::Route;

use super::console::Console;

/// Prints route changes and forwards them to whoever drives the terminal.
pub struct TerminalNavigator {
    console: Arc<Console>,
    routes: mpsc::UnboundedSender<Route>,
}

impl TerminalNavigator {
    pub fn new(console: Arc<Console>) -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (routes, rx) = mpsc::unbounded_channel();
        (Self { console, routes }, rx)
    }
}

#[async_trait]
impl NavigatorPort for TerminalNavigator {
    async fn navigate(&self, route: Route) {
        match &route {
            Route::Enrollment => {}
            Route::SessionExpired => {
                self.console
                    .say("Your enrollment session has expired. Ask your administrator for a new token.")
                    .await
            }
            Route::ClientHome {
                selected_instance: Some(id),
            } => self.console.say(format!("Instance {id} is ready.")).await,
            Route::ClientHome {
                selected_instance: None,
            } => {}
        }
        if self.routes.send(route).is_err() {
            debug!("route receiver dropped");
        }
    }
}

/// Logs wizard state changes; the wizard driver renders the steps itself.
#[derive(Debug, Default)]
pub struct TracingEnrollmentEvents;

#[async_trait]
impl EnrollmentEventPort for TracingEnrollmentEvents {
    async fn emit_wizard_state_changed(&self, state: WizardState, indicator: Option<StepIndicator>) {
        debug!(state = ?state, indicator = ?indicator, "wizard state changed");
    }
}
