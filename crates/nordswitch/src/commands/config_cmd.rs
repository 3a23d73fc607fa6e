//! Config subcommand handlers.

use dialoguer::{Input, Select};
use nordswitch_core::Platform;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile, SecretKind};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
        if profile.token.is_some() {
            profile.token = Some(MASK.into());
        }
    }
    cfg
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "oracle_url = \"{}\"", cfg.defaults.oracle_url);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "target = \"{}\"", p.target);
        if let Some(ref dir) = p.install_dir {
            let _ = writeln!(out, "install_dir = \"{}\"", dir.display());
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if let Some(ref pw) = p.password {
            let _ = writeln!(out, "password = \"{pw}\"");
        }
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref catalog) = p.catalog {
            let _ = writeln!(out, "catalog = \"{}\"", catalog.display());
        }
        if let Some(ref url) = p.oracle_url {
            let _ = writeln!(out, "oracle_url = \"{url}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(secs) = p.launch_timeout {
            let _ = writeln!(out, "launch_timeout = {secs}");
        }
        if !p.rotation.is_empty() {
            let _ = writeln!(out, "# rotation overrides: {:?}", p.rotation);
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_secret(label: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    secret: &str,
    profile_name: &str,
    kind: SecretKind,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_secret(profile_name, kind, secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

fn require_profile(cfg: &Config, name: &str) -> Result<(), CliError> {
    if cfg.profile(name).is_some() {
        return Ok(());
    }
    Err(CliError::ProfileNotFound {
        name: name.into(),
        available: config::available_profiles(cfg),
    })
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("nordswitch configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let target: String = Input::new()
        .with_prompt("Target (country, city, or group such as 'europe')")
        .default("countries".into())
        .interact_text()
        .map_err(prompt_err)?;

    let login_choices = &[
        "Access token (recommended)",
        "Username/Password",
        "None (client is already logged in)",
    ];
    let login = Select::new()
        .with_prompt("How should nordswitch log in when the client has no session?")
        .items(login_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        target,
        ..Profile::default()
    };

    match login {
        0 => {
            let token = prompt_secret("Access token: ")?;
            profile.token =
                prompt_keyring_storage(&token, &profile_name, SecretKind::Token, "token")?;
        }
        1 => {
            let user: String = Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?;
            let pass = prompt_secret("Password: ")?;
            profile.username = Some(user);
            profile.password =
                prompt_keyring_storage(&pass, &profile_name, SecretKind::Password, "password")?;
        }
        _ => {}
    }

    if matches!(Platform::current(), Ok(Platform::Windows)) {
        let dir: String = Input::new()
            .with_prompt("NordVPN install directory (blank to auto-detect)")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?;
        if !dir.trim().is_empty() {
            profile.install_dir = Some(dir.trim().into());
        }
    }

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: nordswitch rotate");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: nordswitch config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            store(profile, global, SecretKind::Token, "Access token: ")
        }

        ConfigCommand::SetPassword { profile } => {
            store(profile, global, SecretKind::Password, "Password: ")
        }
    }
}

fn store(
    profile: Option<String>,
    global: &GlobalOpts,
    kind: SecretKind,
    prompt: &str,
) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
    require_profile(&cfg, &profile_name)?;

    let secret = prompt_secret(prompt)?;
    config::store_secret(&profile_name, kind, &secret)?;
    eprintln!("✓ Secret stored in system keyring for profile '{profile_name}'");
    Ok(())
}
