//! ID type wrappers for type safety.

mod id_macro;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use id_macro::impl_id;

/// Stable instance identifier as issued by the server (a UUID string).
///
/// Two instances are the same instance iff their ids compare equal; the
/// reconciler relies on this and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl_id!(InstanceId);

/// Location (network) identifier assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl LocationId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for LocationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LocationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_serializes_as_plain_string() {
        let id = InstanceId::from("2f1c6f0e-3f36-4d6e-9a53-4a3b5d1f7c11");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2f1c6f0e-3f36-4d6e-9a53-4a3b5d1f7c11\"");
    }

    #[test]
    fn location_id_round_trips_through_json_number() {
        let id: LocationId = serde_json::from_str("42").unwrap();
        assert_eq!(id, LocationId(42));
        assert_eq!(id.to_string(), "42");
    }
}
