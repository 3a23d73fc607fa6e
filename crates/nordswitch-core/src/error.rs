// ── Core error types ──
//
// User-facing errors from nordswitch-core. Bootstrap variants are fatal
// and mean the operator must fix the environment. Within a rotation only
// `IpObservation` is ever raised; connect trouble and an unconfirmed
// switch are reported, not thrown.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Environment (bootstrap) ──────────────────────────────────────
    #[error("Unsupported platform '{os}': only Windows and Linux are supported")]
    UnsupportedPlatform { os: String },

    #[error("NordVPN client not installed: {detail}")]
    ClientNotInstalled { detail: String },

    #[error("NordVPN service '{service}' is not running")]
    ServiceNotRunning { service: String },

    #[error("NordVPN app did not start within {timeout_secs}s")]
    ClientLaunchTimeout { timeout_secs: u64 },

    #[error("NordVPN login failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Rotation ─────────────────────────────────────────────────────
    #[error("Could not observe the current public IP after {attempts} attempt(s): {last_error}")]
    IpObservation { attempts: u32, last_error: String },

    #[error("Client command '{command}' failed: {reason}")]
    ClientInvocation { command: String, reason: String },

    // ── Oracle (single lookups outside the workflow) ─────────────────
    #[error("IP lookup failed: {message}")]
    Oracle { message: String, status: Option<u16> },

    // ── Input / configuration ────────────────────────────────────────
    #[error("Invalid target '{label}': {reason}")]
    InvalidTarget { label: String, reason: String },

    #[error("Server catalog error: {message}")]
    Catalog { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for errors raised while preparing a session, which
    /// a long-running caller cannot recover from by retrying.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform { .. }
                | Self::ClientNotInstalled { .. }
                | Self::ServiceNotRunning { .. }
                | Self::ClientLaunchTimeout { .. }
                | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nordswitch_api::Error> for CoreError {
    fn from(err: nordswitch_api::Error) -> Self {
        match err {
            nordswitch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid IP lookup URL: {e}"),
            },
            nordswitch_api::Error::ClientBuild(message) => CoreError::Config { message },
            other => CoreError::Oracle {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
