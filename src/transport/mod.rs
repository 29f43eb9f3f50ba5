//! Transport layer: wire formats of the Pushover API (form and multipart
//! encoding, JSON decoding, field limits).

mod limits;
mod messages;
mod response;
mod text;

pub use limits::{
    LIMITS_PATH, decode_limits_json_response, encode_limits_query, limits_from_headers,
};
pub use messages::{
    ATTACHMENT_FIELD, AttachmentFile, Credentials, EncodeError, EncodedBody, FORM_CONTENT_TYPE,
    MultipartBody, decode_send_json_response, encode_send_body,
};
pub use response::{
    DecodeError, ERROR_BODY_LIMIT, SUCCESS_BODY_LIMIT, decode_api_error, is_success,
};
pub use text::{ELLIPSIS, truncate};

pub const MESSAGES_PATH: &str = "/1/messages.json";
