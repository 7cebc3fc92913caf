use super::StepError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Local password policy, checked before anything is sent to the proxy.
pub fn validate_password(password: &str, repeat: &str) -> Result<(), StepError> {
    if password.is_empty() {
        return Err(StepError::PasswordEmpty);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StepError::PasswordTooShort {
            min_len: MIN_PASSWORD_LEN,
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(StepError::PasswordMissingDigit);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(StepError::PasswordMissingLowercase);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(StepError::PasswordMissingUppercase);
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err(StepError::PasswordMissingSpecial);
    }
    if password != repeat {
        return Err(StepError::PasswordMismatch);
    }
    Ok(())
}
