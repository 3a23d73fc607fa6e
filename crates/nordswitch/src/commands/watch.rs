//! `watch` handler: rotate on a timer until the count is reached or the
//! user interrupts.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use nordswitch_core::{Schedule, ScheduleEnd};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::commands::rotate::render_report;
use crate::commands::util::Session;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::establish(settings, global, args.target.as_deref()).await?;
    let schedule = Schedule {
        interval: args.interval,
        count: args.count,
        reshuffle: args.reshuffle.then(|| settings.catalog.clone()),
    };

    info!(
        interval = %humantime::format_duration(schedule.interval),
        count = ?schedule.count,
        "watching"
    );

    let summary = session
        .rotator
        .run_schedule(
            session.descriptor,
            &schedule,
            &mut StdRng::from_entropy(),
            interrupted(),
            |report| output::print_output(&render_report(report, global), global.quiet),
        )
        .await?;

    if summary.end == ScheduleEnd::Interrupted && !global.quiet {
        eprintln!("✓ Disconnected after {} rotation(s)", summary.completed);
    }
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
