use thiserror::Error;

/// Errors that stop a dispatch before a full trace can be produced.
///
/// Upstream failures (a non-2xx from either endpoint) are not errors: they are
/// reported inside the returned [`crate::ApiResult`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Token response did not contain an access_token")]
    MissingAccessToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// Whether the error was caused by the caller's input rather than the network.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownAction(_) | Self::MissingParameter(_))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
