// ── Runtime session configuration ──
//
// These types describe *how* to prepare a session and how patient a
// rotation should be. They carry credential data and timings but never
// touch disk. The CLI builds them from profiles and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// How to log in to the NordVPN client when it reports no session.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Access token (`nordvpn login --token`).
    Token(SecretString),
    /// Account username and password (`nordvpn login -u -p`).
    Password {
        username: String,
        password: SecretString,
    },
}

/// Everything the bootstrapper needs to produce a descriptor.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Logical target: a country, city, special group or catalog group name.
    pub target: String,
    /// Windows install directory. Probed from the usual locations when unset.
    pub install_dir: Option<PathBuf>,
    /// Used only when the client reports that nobody is logged in.
    pub credentials: Option<Credentials>,
    /// How long to wait for the desktop app to appear after launching it.
    pub launch_timeout: Duration,
    /// Interval between process-list checks while waiting for the app.
    pub launch_poll_interval: Duration,
}

impl SessionConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target: "countries".into(),
            install_dir: None,
            credentials: None,
            launch_timeout: Duration::from_secs(60),
            launch_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Where and how to ask for the public IP.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: nordswitch_api::DEFAULT_ORACLE_URL.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Attempt counts and fixed pauses for one rotation.
///
/// No backoff, no jitter: each pause is a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Oracle calls allowed for the baseline observation.
    pub baseline_attempts: u32,
    /// Pause after a failed baseline call.
    pub baseline_retry_delay: Duration,
    /// Connect invocations per rotation (1 = no internal retry).
    pub connect_attempts: u32,
    /// Pause after a failed connect invocation.
    pub connect_failure_delay: Duration,
    /// Oracle calls allowed while waiting for the address to change.
    pub confirm_attempts: u32,
    /// Pause after an erroring confirmation call.
    pub confirm_retry_delay: Duration,
    /// Pause after a confirmation call that still returned the baseline.
    pub confirm_unchanged_delay: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            baseline_attempts: 3,
            baseline_retry_delay: Duration::from_secs(3),
            connect_attempts: 1,
            connect_failure_delay: Duration::from_secs(15),
            confirm_attempts: 12,
            confirm_retry_delay: Duration::from_secs(5),
            confirm_unchanged_delay: Duration::ZERO,
        }
    }
}

impl RotationPolicy {
    /// Reject policies that would skip a step entirely.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        let zero = [
            ("baseline_attempts", self.baseline_attempts),
            ("connect_attempts", self.connect_attempts),
            ("confirm_attempts", self.confirm_attempts),
        ]
        .into_iter()
        .find(|(_, n)| *n == 0);

        match zero {
            Some((field, _)) => Err(crate::error::CoreError::Config {
                message: format!("{field} must be at least 1"),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_timings() {
        let p = RotationPolicy::default();
        assert_eq!(p.baseline_attempts, 3);
        assert_eq!(p.baseline_retry_delay, Duration::from_secs(3));
        assert_eq!(p.connect_failure_delay, Duration::from_secs(15));
        assert_eq!(p.confirm_attempts, 12);
        assert_eq!(p.confirm_retry_delay, Duration::from_secs(5));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let p = RotationPolicy {
            confirm_attempts: 0,
            ..RotationPolicy::default()
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("confirm_attempts"));
    }
}
