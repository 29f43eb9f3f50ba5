use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    PriorityOutOfRange { actual: i64 },
    UnknownPriority { input: String },
    UnsupportedScheme { scheme: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriorityOutOfRange { actual } => {
                write!(f, "priority out of range: {actual} (expected -2..=2)")
            }
            Self::UnknownPriority { input } => write!(f, "unknown priority: {input}"),
            Self::UnsupportedScheme { scheme } => {
                write!(f, "unsupported URL scheme: {scheme} (expected http or https)")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
