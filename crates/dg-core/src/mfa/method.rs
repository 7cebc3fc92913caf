use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication challenge protocol. Serialized as its numeric wire code.
///
/// 多因素认证方式（按数字编码序列化）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MfaMethod {
    Totp,
    Email,
    OpenId,
    MobileApprove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown mfa method code {0}")]
pub struct UnknownMfaMethod(pub u8);

impl MfaMethod {
    pub const fn code(self) -> u8 {
        match self {
            Self::Totp => 0,
            Self::Email => 1,
            Self::OpenId => 2,
            Self::MobileApprove => 4,
        }
    }

    /// Methods where the user types a six-digit code.
    pub const fn is_code_based(self) -> bool {
        matches!(self, Self::Totp | Self::Email)
    }

    /// Methods offered during enrollment registration.
    pub const fn is_registrable(self) -> bool {
        self.is_code_based()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Totp => "authenticator app",
            Self::Email => "email code",
            Self::OpenId => "OpenID",
            Self::MobileApprove => "mobile approval",
        }
    }
}

impl TryFrom<u8> for MfaMethod {
    type Error = UnknownMfaMethod;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Totp),
            1 => Ok(Self::Email),
            2 => Ok(Self::OpenId),
            4 => Ok(Self::MobileApprove),
            other => Err(UnknownMfaMethod(other)),
        }
    }
}

impl From<MfaMethod> for u8 {
    fn from(value: MfaMethod) -> Self {
        value.code()
    }
}

impl std::fmt::Display for MfaMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
