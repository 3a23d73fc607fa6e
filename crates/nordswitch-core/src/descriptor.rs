// ── Connection descriptor ──
//
// The immutable bundle a session produces once and every rotation reads:
// platform, resolved server, command template, working directory.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::platform::Platform;
use crate::runner::Invocation;

/// Resolved, reusable description of how to reach one target server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    platform: Platform,
    requested_label: String,
    target_server: String,
    command_template: Vec<String>,
    working_directory: Option<PathBuf>,
}

impl ConnectionDescriptor {
    /// Build a descriptor for an already-resolved server name.
    ///
    /// The name is re-spelled for the platform's client. Windows requires
    /// the install directory so the client executable can be found.
    pub fn new(
        platform: Platform,
        requested_label: impl Into<String>,
        server: &str,
        working_directory: Option<PathBuf>,
    ) -> Result<Self, CoreError> {
        let target_server = platform.normalize_server_name(server);
        if target_server.is_empty() {
            return Err(CoreError::InvalidTarget {
                label: server.into(),
                reason: "resolved server name is empty".into(),
            });
        }
        if platform.requires_working_dir() && working_directory.is_none() {
            return Err(CoreError::Config {
                message: format!("{platform} requires the NordVPN install directory"),
            });
        }

        Ok(Self {
            platform,
            requested_label: requested_label.into(),
            target_server,
            command_template: platform.connect_template(),
            working_directory,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The label the caller originally asked for (e.g. `europe`).
    pub fn requested_label(&self) -> &str {
        &self.requested_label
    }

    pub fn target_server(&self) -> &str {
        &self.target_server
    }

    pub fn command_template(&self) -> &[String] {
        &self.command_template
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// `command_template + [target_server]`, scoped to the working directory.
    pub fn connect_invocation(&self) -> Invocation {
        let mut argv = self.command_template.clone();
        argv.push(self.target_server.clone());
        self.invocation(argv)
    }

    /// The platform's disconnect command.
    pub fn disconnect_invocation(&self) -> Invocation {
        self.invocation(self.platform.disconnect_template())
    }

    fn invocation(&self, argv: Vec<String>) -> Invocation {
        Invocation::from_argv(argv)
            .in_dir(self.working_directory.clone())
            .through_shell(self.platform.uses_shell())
    }
}
