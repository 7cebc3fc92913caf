//! MFA use cases: the challenge orchestrator and its timer/socket helpers.

pub mod orchestrator;
pub mod poll;
pub mod remote;

pub use orchestrator::{MfaOrchestrator, MfaSettings, CLIENT_MFA_METHODS};
pub use poll::{poll_until, PollOutcome, PollStep};
pub use remote::RemoteMfaConnection;
