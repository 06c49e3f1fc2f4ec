use serde::Deserialize;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures talking to the video platform or fetching its public pages.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The daily unit budget is spent. Never retried.
    #[error("daily quota exhausted")]
    QuotaExhausted,

    #[error("transient upstream error (status {status:?}): {message}")]
    Transient { status: Option<u16>, message: String },

    #[error("credential rejected: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded", "dailyLimitExceededUnreg"];
const RATE_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];
const AUTH_REASONS: &[&str] = &["keyInvalid", "keyExpired", "accessNotConfigured", "ipRefererBlocked"];

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient { .. })
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, ApiError::QuotaExhausted)
    }

    /// Classify a non-success response from its status and body.
    ///
    /// Google APIs report the interesting part in `error.errors[].reason`;
    /// bodies that are not that envelope (HTML pages) classify on status alone.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (message, reasons): (String, Vec<String>) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(env) => (
                env.error.message,
                env.error.errors.into_iter().map(|e| e.reason).collect(),
            ),
            Err(_) => (truncate(body, 200), Vec::new()),
        };
        let has = |list: &[&str]| reasons.iter().any(|r| list.contains(&r.as_str()));

        if has(QUOTA_REASONS) {
            ApiError::QuotaExhausted
        } else if status == 429 || status >= 500 || has(RATE_REASONS) {
            ApiError::Transient {
                status: Some(status),
                message,
            }
        } else if status == 401 || has(AUTH_REASONS) {
            ApiError::Auth(message)
        } else {
            ApiError::Api { status, message }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ApiError::Transient {
                status: None,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(code: u16, reason: &str) -> String {
        format!(
            r#"{{"error":{{"code":{code},"message":"msg {reason}","errors":[{{"reason":"{reason}","domain":"youtube.quota"}}]}}}}"#
        )
    }

    #[test]
    fn test_quota_reason_wins_over_status() {
        assert!(ApiError::from_response(403, &envelope(403, "quotaExceeded")).is_quota());
        assert!(ApiError::from_response(403, &envelope(403, "dailyLimitExceeded")).is_quota());
    }

    #[test]
    fn test_transient_statuses() {
        assert!(ApiError::from_response(503, "upstream down").is_retryable());
        assert!(ApiError::from_response(429, "").is_retryable());
        assert!(ApiError::from_response(403, &envelope(403, "rateLimitExceeded")).is_retryable());
    }

    #[test]
    fn test_auth_errors() {
        let err = ApiError::from_response(400, &envelope(400, "keyInvalid"));
        assert!(matches!(err, ApiError::Auth(_)));
        assert!(!err.is_retryable());
        assert!(matches!(ApiError::from_response(401, ""), ApiError::Auth(_)));
    }

    #[test]
    fn test_other_client_errors_are_final() {
        let err = ApiError::from_response(404, &envelope(404, "playlistNotFound"));
        assert!(matches!(err, ApiError::Api { status: 404, .. }));
        assert!(!err.is_retryable());
        assert!(!err.is_quota());
    }

    #[test]
    fn test_html_body_is_truncated() {
        let body = "x".repeat(500);
        match ApiError::from_response(404, &body) {
            ApiError::Api { message, .. } => assert_eq!(message.chars().count(), 203),
            other => panic!("unexpected {other:?}"),
        }
    }
}
