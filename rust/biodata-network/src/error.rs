use biodata_access::AccessError;
use serde_json::Value;
use thiserror::Error;

/// HTTP status signalling that there is no valid session
pub const UNAUTHENTICATED_STATUS: u16 = 401;

/// HTTP status signalling an authenticated but forbidden request
pub const FORBIDDEN_STATUS: u16 = 403;

/// How the interceptors treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The backend has no valid session for us; the local session is cleared
    Unauthenticated,
    /// The backend refused the operation; the session is left alone
    Forbidden,
    /// Anything else
    Other,
}

/// Errors surfaced by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No valid session (HTTP 401)
    #[error("Not signed in: {message}")]
    Unauthenticated {
        /// Server supplied message, if any
        message: String,
    },

    /// Signed in but not allowed (HTTP 403, or refused locally before sending)
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Server supplied reason when available
        reason: String,
    },

    /// Any other non-success status
    #[error("Request failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: Value,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The fixed client timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// A successful response did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Base URL and path do not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Map a non-success status to an error; `None` for 2xx
    pub fn from_status(status: u16, body: &Value) -> Option<ApiError> {
        if (200..300).contains(&status) {
            return None;
        }

        let message = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Some(match status {
            UNAUTHENTICATED_STATUS => ApiError::Unauthenticated {
                message: message.unwrap_or_else(|| "unauthenticated".into()),
            },
            FORBIDDEN_STATUS => ApiError::Forbidden {
                reason: message.unwrap_or_else(|| "forbidden".into()),
            },
            _ => ApiError::Status {
                status,
                body: body.clone(),
            },
        })
    }

    /// The class the interceptors react to
    pub fn class(&self) -> FailureClass {
        match self {
            ApiError::Unauthenticated { .. } => FailureClass::Unauthenticated,
            ApiError::Forbidden { .. } => FailureClass::Forbidden,
            _ => FailureClass::Other,
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Denied { reason } => ApiError::Forbidden { reason },
        }
    }
}
