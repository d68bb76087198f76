use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PostgrestError>;

/// Postgres SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum PostgrestError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}, code {}): {message}", .code.as_deref().unwrap_or("-"))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl PostgrestError {
    /// True when the request was rejected by a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            PostgrestError::Api { status, code, .. } => {
                code.as_deref() == Some(UNIQUE_VIOLATION) || (*status == 409 && code.is_none())
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PostgrestError {
    fn from(err: reqwest::Error) -> Self {
        PostgrestError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PostgrestError {
    fn from(err: serde_json::Error) -> Self {
        PostgrestError::Parse(err.to_string())
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
}

impl PostgrestError {
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => {
                let mut message = parsed.message.unwrap_or_default();
                if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
                    message = format!("{message} ({details})");
                }
                PostgrestError::Api {
                    status,
                    code: parsed.code,
                    message,
                }
            }
            Err(_) => PostgrestError::Api {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }
}
