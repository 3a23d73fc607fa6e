//! CLI configuration: thin wrapper around `nordswitch_config`.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--target, --oracle-url, --install-dir, --timeout) on top of a profile.

use nordswitch_core::{Catalog, OracleConfig, RotationPolicy, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nordswitch_config::{
    Config, Profile, SecretKind, config_path, load_config, load_config_or_default,
    save_config, store_secret,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything a command needs from configuration, with flags applied.
pub struct Settings {
    pub profile_name: String,
    pub profile: Profile,
    pub oracle: OracleConfig,
    pub policy: RotationPolicy,
    pub catalog: Catalog,
}

impl Settings {
    /// Session settings for bootstrap. Credentials are resolved here, not
    /// earlier, so offline commands never touch the keyring.
    pub fn session(&self, target: Option<&str>) -> Result<SessionConfig, CliError> {
        let credentials = nordswitch_config::resolve_credentials(&self.profile, &self.profile_name)?;
        let mut session = nordswitch_config::profile_to_session_config(&self.profile, credentials);
        if let Some(target) = target {
            session.target = target.to_owned();
        }
        Ok(session)
    }
}

/// Load config, pick the profile and apply flag overrides.
pub fn resolve_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = cfg
        .profile(&profile_name)
        .ok_or_else(|| CliError::ProfileNotFound {
            name: profile_name.clone(),
            available: available_profiles(&cfg),
        })?;

    // Flag > env > profile
    if let Some(target) = &global.target {
        profile.target.clone_from(target);
    }
    if let Some(dir) = &global.install_dir {
        profile.install_dir = Some(dir.clone());
    }
    if let Some(url) = &global.oracle_url {
        profile.oracle_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let oracle = nordswitch_config::oracle_config(&cfg.defaults, &profile)?;
    let policy = profile.rotation.to_policy()?;
    let catalog = nordswitch_config::load_catalog(&profile)?;

    Ok(Settings {
        profile_name,
        profile,
        oracle,
        policy,
        catalog,
    })
}

/// Comma-separated profile names for error help text.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
