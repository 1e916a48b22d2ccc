//! Errors that can happen while talking to the backend or validating user input

use reqwest::StatusCode;

use crate::session::Privileges;

/// Everything that can go wrong in this crate.
///
/// None of these errors is retried automatically: they are meant to be shown to the acting user.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The request did not reach the server, or its response could not be read
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status
    #[error("server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    /// Something the user entered cannot be sent as-is
    #[error("invalid input: {0}")]
    Validation(String),

    /// A privileged action was attempted without an admin token
    #[error("this action requires an admin token ({0:?})")]
    Forbidden(Privileges),

    /// The admin token could not be read from or written to its backing file
    #[error("unable to access the token store: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ConsoleError {
    pub fn validation<S: ToString>(message: S) -> Self {
        Self::Validation(message.to_string())
    }

    /// Whether this error comes from a rejected admin token (HTTP 401 or 403)
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN,
            Self::Forbidden(_) => true,
            _ => false,
        }
    }
}
