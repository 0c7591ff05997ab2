use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network unavailable: {0}")]
    Offline(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a failure to get any response at all. Connection and
    /// timeout failures mean the origin is unreachable.
    pub fn from_send(err: reqwest::Error, url: &str) -> Self {
        if err.is_connect() || err.is_timeout() {
            FetchError::Offline(format!("{}: {}", url, err))
        } else {
            FetchError::NetworkError(err)
        }
    }

    pub fn from_status(status: reqwest::StatusCode, url: &str, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => FetchError::AccessDenied(format!("{}: {}", url, truncated)),
            404 | 410 => FetchError::NotFound(url.to_string()),
            500..=599 => FetchError::ServerError(format!("{} ({}): {}", url, status, truncated)),
            _ => FetchError::InvalidResponse(format!("{} status {}: {}", url, status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status() {
        let url = "https://app.example.com/main.dart.js";
        assert!(matches!(
            FetchError::from_status(StatusCode::NOT_FOUND, url, ""),
            FetchError::NotFound(ref u) if u == url
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::FORBIDDEN, url, "nope"),
            FetchError::AccessDenied(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY, url, ""),
            FetchError::ServerError(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::IM_A_TEAPOT, url, ""),
            FetchError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let truncated = FetchError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert_eq!(FetchError::truncate_body("short"), "short");
    }
}
