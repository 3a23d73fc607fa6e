//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use nordswitch_config::ConfigError;
use nordswitch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UNCONFIRMED: i32 = 9;
    pub const ENVIRONMENT: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Client environment ───────────────────────────────────────────

    #[error("Unsupported platform '{os}'")]
    #[diagnostic(
        code(nordswitch::unsupported_platform),
        help("The NordVPN client can only be driven on Windows and Linux.")
    )]
    UnsupportedPlatform { os: String },

    #[error("NordVPN client not installed: {detail}")]
    #[diagnostic(
        code(nordswitch::client_not_installed),
        help(
            "Install the NordVPN app, or point nordswitch at it:\n\
             nordswitch --install-dir <DIR> ...   (Windows)\n\
             Make sure `nordvpn` is on PATH        (Linux)"
        )
    )]
    ClientNotInstalled { detail: String },

    #[error("NordVPN service '{service}' is not running")]
    #[diagnostic(
        code(nordswitch::service_not_running),
        help("Start the NordVPN service (Task Manager > Services) and try again.")
    )]
    ServiceNotRunning { service: String },

    #[error("NordVPN app did not start within {seconds}s")]
    #[diagnostic(
        code(nordswitch::launch_timeout),
        help("Raise launch_timeout in your profile, or start the app by hand first.")
    )]
    LaunchTimeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("NordVPN login failed: {message}")]
    #[diagnostic(
        code(nordswitch::auth_failed),
        help(
            "Check the token or password configured for this profile.\n\
             Run: nordswitch config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("Incomplete credentials for profile '{profile}': {reason}")]
    #[diagnostic(
        code(nordswitch::no_credentials),
        help(
            "Configure credentials with: nordswitch config init\n\
             Or set NORDSWITCH_TOKEN."
        )
    )]
    NoCredentials { profile: String, reason: String },

    // ── Rotation ─────────────────────────────────────────────────────

    #[error("Could not determine the public IP after {attempts} attempt(s)")]
    #[diagnostic(
        code(nordswitch::ip_unavailable),
        help(
            "Last error: {reason}\n\
             Check network access, or try another lookup service with --oracle-url."
        )
    )]
    IpUnavailable { attempts: u32, reason: String },

    #[error("NordVPN client command '{command}' failed")]
    #[diagnostic(code(nordswitch::client_command), help("{reason}"))]
    ClientCommand { command: String, reason: String },

    #[error("Public IP did not change after switching to {server} ({outcome})")]
    #[diagnostic(
        code(nordswitch::unconfirmed),
        help("The connection may still be settling. Rerun without --strict to ignore this.")
    )]
    Unconfirmed { server: String, outcome: String },

    // ── Catalog ──────────────────────────────────────────────────────

    #[error("Invalid target '{label}': {reason}")]
    #[diagnostic(code(nordswitch::invalid_target))]
    InvalidTarget { label: String, reason: String },

    #[error("Server group '{name}' not found")]
    #[diagnostic(
        code(nordswitch::group_not_found),
        help("Run: nordswitch regions   to see available groups")
    )]
    GroupNotFound { name: String },

    #[error("Server catalog error: {message}")]
    #[diagnostic(code(nordswitch::catalog))]
    Catalog { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nordswitch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nordswitch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nordswitch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Lookup service error: {message}")]
    #[diagnostic(code(nordswitch::oracle))]
    Oracle { message: String },

    #[error(transparent)]
    #[diagnostic(code(nordswitch::config))]
    Config(Box<figment::Error>),

    #[error("Configuration error: {message}")]
    #[diagnostic(code(nordswitch::config))]
    ConfigInvalid { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(nordswitch::keyring),
        help("Store the secret in the profile or an environment variable instead.")
    )]
    Keyring { message: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedPlatform { .. }
            | Self::ClientNotInstalled { .. }
            | Self::ServiceNotRunning { .. } => exit_code::ENVIRONMENT,
            Self::LaunchTimeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::IpUnavailable { .. } | Self::ClientCommand { .. } | Self::Oracle { .. } => {
                exit_code::CONNECTION
            }
            Self::Unconfirmed { .. } => exit_code::UNCONFIRMED,
            Self::GroupNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidTarget { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedPlatform { os } => CliError::UnsupportedPlatform { os },
            CoreError::ClientNotInstalled { detail } => CliError::ClientNotInstalled { detail },
            CoreError::ServiceNotRunning { service } => CliError::ServiceNotRunning { service },
            CoreError::ClientLaunchTimeout { timeout_secs } => CliError::LaunchTimeout {
                seconds: timeout_secs,
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::IpObservation {
                attempts,
                last_error,
            } => CliError::IpUnavailable {
                attempts,
                reason: last_error,
            },
            CoreError::ClientInvocation { command, reason } => {
                CliError::ClientCommand { command, reason }
            }
            CoreError::Oracle { message, status: _ } => CliError::Oracle { message },
            CoreError::InvalidTarget { label, reason } => CliError::InvalidTarget { label, reason },
            CoreError::Catalog { message } => CliError::Catalog { message },
            CoreError::Config { message } => CliError::ConfigInvalid { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, reason } => {
                CliError::NoCredentials { profile, reason }
            }
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Keyring(message) => CliError::Keyring { message },
            ConfigError::Catalog(message) => CliError::Catalog { message },
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::ConfigInvalid {
                message: e.to_string(),
            },
        }
    }
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
