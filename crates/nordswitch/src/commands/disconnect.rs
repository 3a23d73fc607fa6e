//! `disconnect` handler.
//!
//! Skips the session bootstrap: dropping a connection needs neither a
//! login nor a freshly launched app.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use nordswitch_core::Rotator;

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::config::Settings;
use crate::error::CliError;

pub async fn handle(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let bootstrapper = util::bootstrapper(settings);
    let descriptor = bootstrapper.describe_installed(
        &settings.profile.target,
        settings.profile.install_dir.as_deref(),
        &mut StdRng::from_entropy(),
    )?;
    debug!(command = %descriptor.disconnect_invocation(), "disconnecting");

    let rotator = Rotator::new(
        util::oracle_client(settings)?,
        bootstrapper.runner().clone(),
        settings.policy.clone(),
    );
    rotator.disconnect(&descriptor).await?;
    if !global.quiet {
        eprintln!("✓ Disconnected");
    }
    Ok(())
}
