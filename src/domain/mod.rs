//! Domain layer: message, priority and result types (no I/O).

mod api_error;
mod request;
mod response;
mod validation;
mod value;

pub use api_error::ApiError;
pub use request::{EMERGENCY_MAX_EXPIRE, EMERGENCY_MIN_RETRY, Message};
pub use response::{Limits, SendResponse};
pub use validation::ValidationError;
pub use value::Priority;
