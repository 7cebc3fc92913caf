//! MFA domain: methods, challenge targets, outcomes and error classification.

mod error;
mod method;
mod qr;
mod target;

pub use error::MfaError;
pub use method::{MfaMethod, UnknownMfaMethod};
pub use qr::QrPayload;
pub use target::{MfaChallenge, MfaOutcome, MfaStatus, MfaTarget, PresharedKey};

/// Length of a TOTP / email code.
pub const MFA_CODE_LEN: usize = 6;

/// `true` when `code` is exactly six ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == MFA_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}
