//! Clap derive structures for the `nordswitch` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nordswitch -- rotate NordVPN servers and confirm every switch
#[derive(Debug, Parser)]
#[command(
    name = "nordswitch",
    version,
    about = "Rotate NordVPN servers and verify the public IP changed",
    long_about = "Drives the installed NordVPN client on Windows or Linux.\n\n\
        Each rotation records the public IP, connects to the target server\n\
        (or a random member of a server group), then polls an IP lookup\n\
        service until the address changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "NORDSWITCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Country, city, special group or catalog group (overrides profile)
    #[arg(long, short = 't', env = "NORDSWITCH_TARGET", global = true)]
    pub target: Option<String>,

    /// IP lookup service URL (overrides profile)
    #[arg(long, env = "NORDSWITCH_ORACLE_URL", global = true)]
    pub oracle_url: Option<String>,

    /// NordVPN install directory on Windows (overrides profile)
    #[arg(long, env = "NORDSWITCH_INSTALL_DIR", global = true)]
    pub install_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NORDSWITCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// IP lookup timeout in seconds (overrides profile)
    #[arg(long, env = "NORDSWITCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlatformArg {
    Windows,
    Linux,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch server once and confirm the public IP changed
    #[command(alias = "r")]
    Rotate(RotateArgs),

    /// Rotate on a fixed interval until interrupted
    Watch(WatchArgs),

    /// Drop the active VPN connection
    #[command(alias = "d")]
    Disconnect,

    /// Show the current public IP
    Ip,

    /// List server groups, or the members of one group
    #[command(alias = "groups")]
    Regions(RegionsArgs),

    /// Show which server a label resolves to, without connecting
    Resolve(ResolveArgs),

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Rotation ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RotateArgs {
    /// Target label (overrides --target and the profile)
    #[arg(id = "label", value_name = "TARGET")]
    pub target: Option<String>,

    /// Exit with status 9 unless the IP change was confirmed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Target label (overrides --target and the profile)
    #[arg(id = "label", value_name = "TARGET")]
    pub target: Option<String>,

    /// Time between rotations (e.g. "90s", "10m", "1h 30m")
    #[arg(long, short = 'i', default_value = "10m", value_parser = parse_interval)]
    pub interval: Duration,

    /// Stop after this many rotations
    #[arg(long, short = 'n')]
    pub count: Option<u32>,

    /// Re-resolve group targets before every rotation
    #[arg(long)]
    pub reshuffle: bool,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RegionsArgs {
    /// Group to list members of
    pub group: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Label to resolve
    pub label: String,

    /// Spell the server name for this platform instead of the host's
    #[arg(long)]
    pub platform: Option<PlatformArg>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a NordVPN access token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Store a NordVPN account password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interval_parses_humantime() {
        assert_eq!(parse_interval("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1h 30m").unwrap(), Duration::from_secs(5400));
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn rotate_accepts_positional_target() {
        let cli = Cli::try_parse_from(["nordswitch", "rotate", "europe", "--strict"]).unwrap();
        match cli.command {
            Command::Rotate(args) => {
                assert_eq!(args.target.as_deref(), Some("europe"));
                assert!(args.strict);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rotate_accepts_global_target_flag() {
        for flag in ["-t", "--target"] {
            let cli = Cli::try_parse_from(["nordswitch", "rotate", flag, "japan"]).unwrap();
            assert_eq!(cli.global.target.as_deref(), Some("japan"));
            match cli.command {
                Command::Rotate(args) => assert_eq!(args.target, None),
                other => panic!("unexpected command {other:?}"),
            }
        }
    }

    #[test]
    fn watch_keeps_flag_and_positional_apart() {
        let cli = Cli::try_parse_from([
            "nordswitch", "watch", "europe", "-t", "japan", "-n", "2", "--reshuffle",
        ])
        .unwrap();
        assert_eq!(cli.global.target.as_deref(), Some("japan"));
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.target.as_deref(), Some("europe"));
                assert_eq!(args.count, Some(2));
                assert!(args.reshuffle);
                assert_eq!(args.interval, Duration::from_secs(600));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
