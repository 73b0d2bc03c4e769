use std::{error, fmt, sync::Arc};

pub mod client;
pub mod directions;
pub mod geocoder;
pub mod offline;
pub mod provider;
pub mod requests;
pub mod wire;

#[derive(Debug, Clone)]
pub enum ApiError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    RateLimitReached,
    MissingCredentials(&'static str),
    Other(String),
}

impl ApiError {
    /// Transient failures may succeed on a later attempt. Everything else
    /// (malformed bodies, client errors) is as good as "not found".
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RequestError(_) | ApiError::RateLimitReached => true,
            ApiError::InvalidResponse { status_code, .. } => {
                status_code.is_server_error()
                    || *status_code == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || *status_code == reqwest::StatusCode::REQUEST_TIMEOUT
            }
            ApiError::JsonError(_)
            | ApiError::MissingCredentials(_)
            | ApiError::Other(_) => false,
        }
    }
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            ApiError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            ApiError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response({}) {}", status_code, url),
            },
            ApiError::RateLimitReached => write!(f, "Rate limit reached."),
            ApiError::MissingCredentials(name) => {
                write!(f, "Missing credentials: {} is not set", name)
            }
            ApiError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::JsonError(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(status_code: reqwest::StatusCode) -> ApiError {
        ApiError::InvalidResponse {
            status_code,
            url: "https://example.invalid".to_owned(),
            response: None,
        }
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(invalid(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(invalid(reqwest::StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(ApiError::RateLimitReached.is_transient());
    }

    #[test]
    fn malformed_and_client_errors_are_not() {
        assert!(!invalid(reqwest::StatusCode::NOT_FOUND).is_transient());
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!ApiError::from(json).is_transient());
    }
}
