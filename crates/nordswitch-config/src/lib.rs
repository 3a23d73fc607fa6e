//! Shared configuration for nordswitch.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation into the `nordswitch_core` session, oracle and rotation
//! settings. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use nordswitch_core::{Catalog, Credentials, OracleConfig, RotationPolicy, SessionConfig};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "nordswitch";

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "NORDSWITCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("incomplete credentials for profile '{profile}': {reason}")]
    NoCredentials { profile: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("server catalog: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named session profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to built-in defaults for the
    /// implicit `default` profile.
    pub fn profile(&self, name: &str) -> Option<Profile> {
        match self.profiles.get(name) {
            Some(p) => Some(p.clone()),
            None if name == "default" => Some(Profile::default()),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// IP lookup service.
    #[serde(default = "default_oracle_url")]
    pub oracle_url: String,

    /// IP lookup timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            oracle_url: default_oracle_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_oracle_url() -> String {
    OracleConfig::default().url
}
fn default_timeout() -> u64 {
    10
}
fn default_target() -> String {
    "countries".into()
}

/// A named session profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Country, city, special group or catalog group to rotate through.
    #[serde(default = "default_target")]
    pub target: String,

    /// NordVPN install directory (Windows).
    pub install_dir: Option<PathBuf>,

    /// Account username for password login.
    pub username: Option<String>,

    /// Account password (plaintext, prefer keyring).
    pub password: Option<String>,

    /// Access token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Replacement server catalog file.
    pub catalog: Option<PathBuf>,

    /// Override the IP lookup service.
    pub oracle_url: Option<String>,

    /// Override the IP lookup timeout (seconds).
    pub timeout: Option<u64>,

    /// Seconds to wait for the Windows app to start.
    pub launch_timeout: Option<u64>,

    /// Rotation attempt counts and pauses.
    #[serde(default, skip_serializing_if = "RotationOverrides::is_empty")]
    pub rotation: RotationOverrides,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            target: default_target(),
            install_dir: None,
            username: None,
            password: None,
            token: None,
            token_env: None,
            catalog: None,
            oracle_url: None,
            timeout: None,
            launch_timeout: None,
            rotation: RotationOverrides::default(),
        }
    }
}

/// Per-profile tweaks to the rotation policy. Durations are seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RotationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_failure_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_unchanged_delay: Option<u64>,
}

impl RotationOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the overrides to the default policy and validate the result.
    pub fn to_policy(&self) -> Result<RotationPolicy, ConfigError> {
        let base = RotationPolicy::default();
        let secs = |v: Option<u64>, d: Duration| v.map_or(d, Duration::from_secs);
        let policy = RotationPolicy {
            baseline_attempts: self.baseline_attempts.unwrap_or(base.baseline_attempts),
            baseline_retry_delay: secs(self.baseline_retry_delay, base.baseline_retry_delay),
            connect_attempts: self.connect_attempts.unwrap_or(base.connect_attempts),
            connect_failure_delay: secs(self.connect_failure_delay, base.connect_failure_delay),
            confirm_attempts: self.confirm_attempts.unwrap_or(base.confirm_attempts),
            confirm_retry_delay: secs(self.confirm_retry_delay, base.confirm_retry_delay),
            confirm_unchanged_delay: secs(
                self.confirm_unchanged_delay,
                base.confirm_unchanged_delay,
            ),
        };
        policy.validate().map_err(|e| ConfigError::Validation {
            field: "rotation".into(),
            reason: e.to_string(),
        })?;
        Ok(policy)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "nordswitch", "nordswitch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nordswitch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path`, then `NORDSWITCH_*` variables.
///
/// Nested keys are separated by a double underscore, e.g.
/// `NORDSWITCH_DEFAULTS__ORACLE_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Which secret a keyring entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Token,
    Password,
}

impl SecretKind {
    fn entry_name(self, profile_name: &str) -> String {
        match self {
            Self::Token => format!("{profile_name}/token"),
            Self::Password => format!("{profile_name}/password"),
        }
    }
}

/// Store a secret in the system keyring for `profile_name`.
pub fn store_secret(profile_name: &str, kind: SecretKind, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.entry_name(profile_name))
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(value)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_secret(entry_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, entry_name)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// Resolve login credentials for a profile.
///
/// A token wins over a password. Token order: the profile's `token_env`
/// variable, `NORDSWITCH_TOKEN`, keyring, plaintext. Password order:
/// `NORDSWITCH_PASSWORD`, keyring, plaintext. `Ok(None)` means nothing
/// is configured, which is fine while the client is already logged in.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<Credentials>, ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_secret,
    )
}

/// [`resolve_credentials`] with explicit environment and keyring lookups.
pub fn resolve_credentials_with<E, K>(
    profile: &Profile,
    profile_name: &str,
    env: E,
    stored: K,
) -> Result<Option<Credentials>, ConfigError>
where
    E: Fn(&str) -> Option<String>,
    K: Fn(&str) -> Option<String>,
{
    let token = profile
        .token_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env("NORDSWITCH_TOKEN"))
        .or_else(|| stored(&SecretKind::Token.entry_name(profile_name)))
        .or_else(|| profile.token.clone());
    if let Some(token) = token {
        return Ok(Some(Credentials::Token(SecretString::from(token))));
    }

    let Some(username) = profile
        .username
        .clone()
        .or_else(|| env("NORDSWITCH_USERNAME"))
    else {
        return Ok(None);
    };

    let password = env("NORDSWITCH_PASSWORD")
        .or_else(|| stored(&SecretKind::Password.entry_name(profile_name)))
        .or_else(|| profile.password.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
            reason: format!("username '{username}' has no password"),
        })?;

    Ok(Some(Credentials::Password {
        username,
        password: SecretString::from(password),
    }))
}

// ── Translation to core settings ────────────────────────────────────

/// Build a `SessionConfig` from a profile and already-resolved credentials.
pub fn profile_to_session_config(
    profile: &Profile,
    credentials: Option<Credentials>,
) -> SessionConfig {
    let mut session = SessionConfig::new(profile.target.clone());
    session.install_dir.clone_from(&profile.install_dir);
    session.credentials = credentials;
    if let Some(secs) = profile.launch_timeout {
        session.launch_timeout = Duration::from_secs(secs);
    }
    session
}

/// Oracle URL and timeout: profile overrides, then global defaults.
pub fn oracle_config(defaults: &Defaults, profile: &Profile) -> Result<OracleConfig, ConfigError> {
    let url = profile
        .oracle_url
        .clone()
        .unwrap_or_else(|| defaults.oracle_url.clone());
    url::Url::parse(&url).map_err(|e| ConfigError::Validation {
        field: "oracle_url".into(),
        reason: format!("{url}: {e}"),
    })?;

    Ok(OracleConfig {
        url,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// The profile's catalog override, or the embedded catalog.
pub fn load_catalog(profile: &Profile) -> Result<Catalog, ConfigError> {
    match &profile.catalog {
        Some(path) => Catalog::load(path).map_err(|e| ConfigError::Catalog(e.to_string())),
        None => Ok(Catalog::embedded().clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn none(_: &str) -> Option<String> {
        None
    }

    fn token_of(creds: Option<Credentials>) -> String {
        match creds {
            Some(Credentials::Token(t)) => t.expose_secret().to_owned(),
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[test]
    fn loads_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "work"

[defaults]
output = "json"

[profiles.work]
target = "europe"
token_env = "WORK_TOKEN"

[profiles.work.rotation]
confirm_attempts = 20
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("work"));
        assert_eq!(cfg.defaults.output, "json");
        let work = cfg.profile("work").unwrap();
        assert_eq!(work.target, "europe");
        assert_eq!(work.rotation.confirm_attempts, Some(20));
        assert_eq!(work.rotation.to_policy().unwrap().confirm_attempts, 20);
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[defaults]\noracle_url = \"https://file.example/\"\n",
            )?;
            jail.set_env("NORDSWITCH_DEFAULTS__ORACLE_URL", "https://env.example/");
            jail.set_env("NORDSWITCH_DEFAULTS__TIMEOUT", "3");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.defaults.oracle_url, "https://env.example/");
            assert_eq!(cfg.defaults.timeout, 3);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.profile("default").unwrap().target, "countries");
        assert!(cfg.profile("other").is_none());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                target: "japan".into(),
                username: Some("me".into()),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("[profiles.home.rotation]"), "{text}");

        let back = load_config_from(&path).unwrap();
        assert_eq!(back.profiles["home"].target, "japan");
        assert_eq!(back.profiles["home"].username.as_deref(), Some("me"));
    }

    #[test]
    fn token_env_beats_keyring_and_plaintext() {
        let profile = Profile {
            token: Some("plain".into()),
            token_env: Some("MY_TOKEN".into()),
            ..Profile::default()
        };
        let env = lookup(&[("MY_TOKEN", "from-env"), ("NORDSWITCH_TOKEN", "generic")]);
        let keyring = lookup(&[("default/token", "from-keyring")]);

        let creds = resolve_credentials_with(&profile, "default", env, keyring).unwrap();
        assert_eq!(token_of(creds), "from-env");
    }

    #[test]
    fn keyring_beats_plaintext_token() {
        let profile = Profile {
            token: Some("plain".into()),
            ..Profile::default()
        };
        let keyring = lookup(&[("home/token", "from-keyring")]);

        let creds = resolve_credentials_with(&profile, "home", none, keyring).unwrap();
        assert_eq!(token_of(creds), "from-keyring");

        let creds = resolve_credentials_with(&profile, "home", none, none).unwrap();
        assert_eq!(token_of(creds), "plain");
    }

    #[test]
    fn password_credentials_resolved() {
        let profile = Profile {
            username: Some("me@example.com".into()),
            password: Some("plain".into()),
            ..Profile::default()
        };
        let keyring = lookup(&[("default/password", "from-keyring")]);

        match resolve_credentials_with(&profile, "default", none, keyring).unwrap() {
            Some(Credentials::Password { username, password }) => {
                assert_eq!(username, "me@example.com");
                assert_eq!(password.expose_secret(), "from-keyring");
            }
            other => panic!("expected password credentials, got {other:?}"),
        }
    }

    #[test]
    fn username_without_password_is_error() {
        let profile = Profile {
            username: Some("me".into()),
            ..Profile::default()
        };
        let err = resolve_credentials_with(&profile, "default", none, none).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn nothing_configured_is_none() {
        let creds = resolve_credentials_with(&Profile::default(), "default", none, none).unwrap();
        assert!(creds.is_none());
    }

    #[test]
    fn zero_attempt_override_rejected() {
        let overrides = RotationOverrides {
            baseline_attempts: Some(0),
            ..RotationOverrides::default()
        };
        assert!(matches!(
            overrides.to_policy().unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    #[test]
    fn oracle_config_prefers_profile() {
        let defaults = Defaults::default();
        let profile = Profile {
            oracle_url: Some("http://127.0.0.1:9/".into()),
            timeout: Some(2),
            ..Profile::default()
        };

        let oracle = oracle_config(&defaults, &profile).unwrap();
        assert_eq!(oracle.url, "http://127.0.0.1:9/");
        assert_eq!(oracle.timeout, Duration::from_secs(2));

        let bad = Profile {
            oracle_url: Some("not a url".into()),
            ..Profile::default()
        };
        assert!(oracle_config(&defaults, &bad).is_err());
    }

    #[test]
    fn session_config_from_profile() {
        let profile = Profile {
            target: "asia pacific".into(),
            install_dir: Some("D:/NordVPN".into()),
            launch_timeout: Some(90),
            ..Profile::default()
        };
        let session = profile_to_session_config(&profile, None);
        assert_eq!(session.target, "asia pacific");
        assert_eq!(session.install_dir, Some(PathBuf::from("D:/NordVPN")));
        assert_eq!(session.launch_timeout, Duration::from_secs(90));
    }
}
