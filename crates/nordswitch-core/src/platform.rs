// ── Host platform ──
//
// The two operating systems the NordVPN client ships a scriptable
// interface for, and the command syntax each one expects.

use std::path::PathBuf;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Program name used for every client invocation.
pub const CLIENT_PROGRAM: &str = "nordvpn";

/// Desktop app executable on Windows.
pub const WINDOWS_APP_EXE: &str = "NordVPN.exe";

/// Background service process on Windows.
pub const WINDOWS_SERVICE_PROCESS: &str = "nordvpn-service.exe";

/// Install locations probed on Windows when none is configured.
pub const WINDOWS_DEFAULT_INSTALL_DIRS: [&str; 2] =
    ["C:/Program Files/NordVPN", "C:/Program Files (x86)/NordVPN"];

/// A supported host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Result<Self, CoreError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value onto a supported platform.
    pub fn from_os(os: &str) -> Result<Self, CoreError> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            other => Err(CoreError::UnsupportedPlatform { os: other.into() }),
        }
    }

    /// Program + fixed flags for "connect to <server>"; the server is appended.
    pub fn connect_template(self) -> Vec<String> {
        let flags: &[&str] = match self {
            Self::Windows => &["-c", "-g"],
            Self::Linux => &["c"],
        };
        template(flags)
    }

    /// Program + flags for "drop the active session".
    ///
    /// On Windows the same command also opens the desktop app, which the
    /// bootstrapper relies on.
    pub fn disconnect_template(self) -> Vec<String> {
        let flags: &[&str] = match self {
            Self::Windows => &["-d"],
            Self::Linux => &["d"],
        };
        template(flags)
    }

    /// Whether client commands go through the system shell.
    ///
    /// The Windows client is resolved relative to its install directory,
    /// which only the shell lookup does.
    pub fn uses_shell(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Whether the client needs a working directory to be found.
    pub fn requires_working_dir(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Turn a catalog name into the spelling this platform's client accepts.
    ///
    /// The Linux client wants `united_kingdom`; the Windows client takes the
    /// display name as-is.
    pub fn normalize_server_name(self, name: &str) -> String {
        let name = name.trim().to_lowercase();
        match self {
            Self::Linux => name.split_whitespace().collect::<Vec<_>>().join("_"),
            Self::Windows => name,
        }
    }

    /// Default install directories to probe, in order.
    pub fn default_install_dirs(self) -> Vec<PathBuf> {
        match self {
            Self::Windows => WINDOWS_DEFAULT_INSTALL_DIRS
                .iter()
                .map(PathBuf::from)
                .collect(),
            Self::Linux => Vec::new(),
        }
    }
}

fn template(flags: &[&str]) -> Vec<String> {
    std::iter::once(CLIENT_PROGRAM)
        .chain(flags.iter().copied())
        .map(str::to_owned)
        .collect()
}
