use thiserror::Error;

/// Top-level error type for the `nordswitch-api` crate.
///
/// Every variant means "the observation is unavailable" to the rotation
/// workflow; the distinction only matters for logs and diagnostics.
/// `nordswitch-core` folds these into its own error ladder.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to construct the underlying HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Response ────────────────────────────────────────────────────
    /// The lookup service answered with a non-success status.
    #[error("IP lookup service returned HTTP {status}")]
    Status { status: u16, body: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The response parsed but carried no usable `ip` value.
    #[error("Response is missing the '{field}' field")]
    MissingField { field: &'static str },
}

impl Error {
    /// HTTP status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
