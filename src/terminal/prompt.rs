use std::sync::Arc;

use async_trait::async_trait;

use dg_core::mfa::{is_valid_code, MfaError, MfaMethod, MfaStatus, QrPayload};
use dg_core::ports::{MfaPromptPort, RetryChoice};

use super::console::Console;

/// MFA dialog rendered on the terminal. An empty answer or end of input
/// closes the dialog.
pub struct TerminalMfaPrompt {
    console: Arc<Console>,
}

impl TerminalMfaPrompt {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

/// 1-based menu choice.
pub(crate) fn parse_choice(answer: &str, options: usize) -> Option<usize> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=options).contains(n))
        .map(|n| n - 1)
}

fn parse_retry(answer: &str) -> RetryChoice {
    match answer.trim().to_ascii_lowercase().as_str() {
        "r" | "retry" => RetryChoice::Retry,
        "m" | "method" => RetryChoice::ChangeMethod,
        _ => RetryChoice::Dismiss,
    }
}

#[async_trait]
impl MfaPromptPort for TerminalMfaPrompt {
    async fn choose_method(&self, available: &[MfaMethod]) -> Option<MfaMethod> {
        self.console.say("Choose how to authenticate:").await;
        for (n, method) in available.iter().enumerate() {
            self.console.say(format!("  {}) {method}", n + 1)).await;
        }
        loop {
            let answer = self.console.ask("Method (empty to cancel):").await?;
            if answer.is_empty() {
                return None;
            }
            match parse_choice(&answer, available.len()) {
                Some(index) => return available.get(index).copied(),
                None => self.console.say("Unknown choice.").await,
            }
        }
    }

    async fn request_code(&self, method: MfaMethod) -> Option<String> {
        loop {
            let answer = self
                .console
                .ask(&format!("Code from {method} (empty to cancel):"))
                .await?;
            if answer.is_empty() {
                return None;
            }
            if is_valid_code(&answer) {
                return Some(answer);
            }
            self.console.say("The code has six digits.").await;
        }
    }

    async fn offer_retry(&self, error: &MfaError) -> RetryChoice {
        self.console.say(format!("Authentication failed: {error}")).await;
        match self
            .console
            .ask("[r]etry, change [m]ethod or anything else to close:")
            .await
        {
            Some(answer) => parse_retry(&answer),
            None => RetryChoice::Dismiss,
        }
    }

    async fn show_qr(&self, payload: &QrPayload) {
        self.console
            .say("Open the defguard mobile app and scan this payload:")
            .await;
        self.console.say(payload.to_base64()).await;
    }

    async fn report(&self, status: MfaStatus) {
        let line = match status {
            MfaStatus::Starting(method) => format!("Starting {method} authentication..."),
            MfaStatus::AwaitingCode(method) => format!("Waiting for the {method} code."),
            MfaStatus::AwaitingBrowser { url } => {
                format!("Finish logging in in your browser. If it did not open, visit {url}")
            }
            MfaStatus::AwaitingMobile => "Waiting for approval on your phone...".to_string(),
            MfaStatus::Failed(error) => format!("Failed: {error}"),
            MfaStatus::Authorized => "Authenticated.".to_string(),
            MfaStatus::Cancelled => "Authentication cancelled.".to_string(),
        };
        self.console.say(line).await;
    }
}
