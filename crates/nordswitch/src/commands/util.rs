//! Shared helpers for command handlers.

use nordswitch_api::{IpOracleClient, TransportConfig};
use nordswitch_core::{
    Bootstrapper, ConnectionDescriptor, CoreError, ProcessRunner, Rotator, SysinfoProbe,
};
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

/// IP lookup client for the active profile.
pub fn oracle_client(settings: &Settings) -> Result<IpOracleClient, CliError> {
    let transport = TransportConfig::with_timeout(settings.oracle.timeout);
    IpOracleClient::new(&settings.oracle.url, &transport)
        .map_err(|e| CliError::from(CoreError::from(e)))
}

/// Bootstrapper wired to real processes and the profile's catalog.
pub fn bootstrapper(settings: &Settings) -> Bootstrapper<ProcessRunner, SysinfoProbe> {
    Bootstrapper::new(ProcessRunner::default(), SysinfoProbe::new())
        .with_catalog(settings.catalog.clone())
}

/// A prepared client plus the rotator that drives it.
pub struct Session {
    pub rotator: Rotator<IpOracleClient, ProcessRunner>,
    pub descriptor: ConnectionDescriptor,
}

impl Session {
    /// Bootstrap the client for `target` (or the profile's target).
    pub async fn establish(
        settings: &Settings,
        global: &GlobalOpts,
        target: Option<&str>,
    ) -> Result<Self, CliError> {
        let session_config = settings.session(target)?;
        let oracle = oracle_client(settings)?;
        let bootstrapper = bootstrapper(settings);

        let spinner = output::spinner(global, "preparing NordVPN client");
        let descriptor = bootstrapper.establish(&session_config).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let descriptor = descriptor?;
        debug!(server = descriptor.target_server(), "session established");

        let rotator = Rotator::new(
            oracle,
            bootstrapper.runner().clone(),
            settings.policy.clone(),
        );
        Ok(Self { rotator, descriptor })
    }
}
