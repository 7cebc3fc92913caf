use chrono::{DateTime, Utc};

/// Absolute bounds of an enrollment session.
///
/// A session without an end is treated as already expired.
///
/// 会话时间边界；无结束时间视为已过期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SessionClock {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.end {
            Some(end) => now >= end,
            None => true,
        }
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.end
            .and_then(|end| (end - now).to_std().ok())
            .unwrap_or_default()
    }
}
