use thiserror::Error;

/// Type alias for Result with TidyError
pub type Result<T> = std::result::Result<T, TidyError>;

/// Error types for the newsletter report
///
/// Only caller contract violations and mail-service plumbing failures surface
/// here. Malformed sender headers and dates are recovered where they are found.
#[derive(Error, Debug)]
pub enum TidyError {
    /// Caller passed an argument outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl TidyError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TidyError::RateLimitExceeded { .. }
                | TidyError::ServerError { .. }
                | TidyError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Accepts either delay-seconds ("120") or an HTTP-date. Missing, invalid or
/// past values fall back to 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    if let Some(retry_after_value) = response.headers().get("retry-after") {
        if let Ok(retry_after_str) = retry_after_value.to_str() {
            if let Ok(seconds) = retry_after_str.parse::<u64>() {
                return seconds;
            }

            if let Ok(http_date) = httpdate::parse_http_date(retry_after_str) {
                let now = std::time::SystemTime::now();
                if let Ok(duration) = http_date.duration_since(now) {
                    return duration.as_secs();
                }
            }
        }
    }

    DEFAULT_RETRY_AFTER
}

impl From<google_gmail1::Error> for TidyError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        TidyError::RateLimitExceeded { retry_after }
                    }
                    404 => TidyError::MessageNotFound("Resource not found".to_string()),
                    400 => TidyError::BadRequest(message),
                    401 => TidyError::AuthError(message),
                    403 => TidyError::Forbidden(message),
                    500..=599 => TidyError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => TidyError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => TidyError::BadRequest(format!("{}", err)),
            google_gmail1::Error::HttpError(ref err) => {
                TidyError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => TidyError::NetworkError(err.to_string()),
            _ => TidyError::ApiError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let rate_limit = TidyError::RateLimitExceeded { retry_after: 5 };
        assert!(rate_limit.is_transient());
        assert!(!rate_limit.is_permanent());

        let server_error = TidyError::ServerError {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(server_error.is_transient());

        let network_error = TidyError::NetworkError("Connection timeout".to_string());
        assert!(network_error.is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(TidyError::BadRequest("Invalid query".to_string()).is_permanent());
        assert!(TidyError::MessageNotFound("msg123".to_string()).is_permanent());
        assert!(TidyError::InvalidArgument("negative".to_string()).is_permanent());
    }

    #[test]
    fn test_error_display() {
        let error = TidyError::RateLimitExceeded { retry_after: 10 };
        let display = format!("{}", error);
        assert!(display.contains("Rate limit exceeded"));
        assert!(display.contains("10 seconds"));

        let invalid = TidyError::InvalidArgument("unknown sort mode 'size'".to_string());
        assert_eq!(
            invalid.to_string(),
            "Invalid argument: unknown sort mode 'size'"
        );
    }

    #[test]
    fn test_parse_retry_after_header_integer() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();
        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_static("120"),
        );

        assert_eq!(parse_retry_after_header(&response), 120);
    }

    #[test]
    fn test_parse_retry_after_header_missing() {
        let response = hyper::Response::builder().status(429).body(()).unwrap();
        assert_eq!(parse_retry_after_header(&response), 5);
    }

    #[test]
    fn test_parse_retry_after_header_invalid() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();
        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_static("invalid"),
        );

        assert_eq!(parse_retry_after_header(&response), 5);
    }

    #[test]
    fn test_parse_retry_after_header_past_http_date() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();
        let past_time = std::time::SystemTime::now() - std::time::Duration::from_secs(60);
        let http_date = httpdate::fmt_http_date(past_time);

        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_str(&http_date).unwrap(),
        );

        assert_eq!(parse_retry_after_header(&response), 5);
    }
}
