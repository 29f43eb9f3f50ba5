use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Failure reported by the Pushover API in a non-2xx response.
pub struct ApiError {
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Server status (`0` or negative on failure).
    pub status: i64,
    /// Request identifier assigned by the server.
    pub request: Option<String>,
    /// The `user` field echoed back when the user key was rejected.
    pub user: Option<String>,
    /// Human-readable validation messages.
    pub errors: Vec<String>,
    /// Receipt echoed by receipt-based endpoints.
    pub receipt: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = reqwest::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("");
        write!(f, "pushover: {} {reason}; status={}", self.status_code, self.status)?;
        if let Some(request) = self.request.as_deref() {
            write!(f, "; request={request}")?;
        }
        if let Some(user) = self.user.as_deref() {
            write!(f, "; user={user}")?;
        }
        if !self.errors.is_empty() {
            write!(f, "; errors=[{}]", self.errors.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn display_includes_reason_and_errors() {
        let err = ApiError {
            status_code: 429,
            status: 0,
            request: Some("5042853c-402d-4a18-abcb-168734a801de".to_owned()),
            errors: vec!["application token invalid".to_owned(), "user invalid".to_owned()],
            ..Default::default()
        };
        assert_eq!(
            err.to_string(),
            "pushover: 429 Too Many Requests; status=0; \
             request=5042853c-402d-4a18-abcb-168734a801de; \
             errors=[application token invalid; user invalid]"
        );
    }

    #[test]
    fn display_reports_rejected_user() {
        let err = ApiError {
            status_code: 400,
            status: 0,
            user: Some("invalid".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            err.to_string(),
            "pushover: 400 Bad Request; status=0; user=invalid"
        );
    }
}
