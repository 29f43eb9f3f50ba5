use std::fmt;
use std::str::FromStr;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i8)]
/// Pushover message priority (`priority`).
///
/// Variants are ordered from least to most urgent. Only [`Priority::Emergency`]
/// makes the server honour `retry` and `expire`.
pub enum Priority {
    /// No notification or alert is generated on the user's devices.
    Lowest = -2,
    /// Delivered as a quiet notification.
    Low = -1,
    #[default]
    Normal = 0,
    /// Bypasses the user's quiet hours.
    High = 1,
    /// Bypasses quiet hours and repeats until the user acknowledges it.
    Emergency = 2,
}

impl Priority {
    /// Form field name used by Pushover (`priority`).
    pub const FIELD: &'static str = "priority";

    /// Numeric value sent on the wire.
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// Whether `retry` and `expire` apply.
    pub fn is_emergency(self) -> bool {
        self == Self::Emergency
    }
}

impl TryFrom<i8> for Priority {
    type Error = ValidationError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Priority {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -2 => Ok(Self::Lowest),
            -1 => Ok(Self::Low),
            0 => Ok(Self::Normal),
            1 => Ok(Self::High),
            2 => Ok(Self::Emergency),
            actual => Err(ValidationError::PriorityOutOfRange { actual }),
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    /// Accepts either a name (`lowest`, `low`, `normal`, `high`, `emergency`)
    /// or the numeric value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "lowest" => Ok(Self::Lowest),
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "emergency" => Ok(Self::Emergency),
            other => match other.parse::<i64>() {
                Ok(value) => Self::try_from(value),
                Err(_) => Err(ValidationError::UnknownPriority {
                    input: trimmed.to_owned(),
                }),
            },
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}
