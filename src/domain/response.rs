use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Outcome of a successful send.
pub struct SendResponse {
    /// Receipt of an emergency message awaiting acknowledgment.
    pub receipt: Option<String>,
    /// Server status (`1` on success).
    pub status: i64,
    /// Request identifier assigned by the server.
    pub request: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Monthly message quota of the application.
pub struct Limits {
    /// Number of messages the application may send per month.
    pub limit: i64,
    /// Messages left until the quota resets.
    pub remaining: i64,
    /// Unix timestamp of the next reset, `0` when none is scheduled.
    pub reset: i64,
    /// [`Limits::reset`] as wall-clock time, set only when `reset > 0`.
    pub reset_time: Option<DateTime<Utc>>,
}

impl Limits {
    /// Build a snapshot, deriving [`Limits::reset_time`] from the raw epoch.
    pub fn new(limit: i64, remaining: i64, reset: i64) -> Self {
        let reset_time = if reset > 0 {
            DateTime::from_timestamp(reset, 0)
        } else {
            None
        };
        Self {
            limit,
            remaining,
            reset,
            reset_time,
        }
    }
}
