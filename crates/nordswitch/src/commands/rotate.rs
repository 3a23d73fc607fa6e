//! `rotate` handler and rotation report rendering.

use nordswitch_core::{ConnectStatus, RotationReport};

use crate::cli::{GlobalOpts, RotateArgs};
use crate::commands::util::Session;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

/// Key/value block for one report.
pub(crate) fn report_detail(report: &RotationReport, color: bool) -> String {
    let connect = match &report.connect {
        ConnectStatus::Connected { server: Some(s) } => format!("connected ({s})"),
        ConnectStatus::Connected { server: None } => "connected".into(),
        ConnectStatus::Failed { reason } => format!("failed: {reason}"),
    };
    let elapsed = report.elapsed().to_std().unwrap_or_default();
    let elapsed = std::time::Duration::from_secs(elapsed.as_secs());

    output::detail_block(&[
        ("Target", report.requested_target.clone()),
        ("Server", report.server.clone()),
        ("Connect", connect),
        ("Old IP", report.baseline_ip.clone()),
        ("New IP", report.new_ip.clone().unwrap_or_else(|| "-".into())),
        ("Outcome", output::paint_outcome(report.outcome, color)),
        ("Polls", report.poll_attempts.to_string()),
        ("Elapsed", humantime::format_duration(elapsed).to_string()),
    ])
}

/// Render one report in the selected format.
pub(crate) fn render_report(report: &RotationReport, global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    output::render_single(
        &global.output,
        report,
        |r| report_detail(r, color),
        |r| r.new_ip.clone().unwrap_or_default(),
    )
}

pub async fn handle(args: RotateArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::establish(settings, global, args.target.as_deref()).await?;

    let spinner = output::spinner(
        global,
        &format!("switching to {}", session.descriptor.target_server()),
    );
    let report = session.rotator.rotate(&session.descriptor).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = report?;

    output::print_output(&render_report(&report, global), global.quiet);

    if args.strict && !report.is_confirmed() {
        return Err(CliError::Unconfirmed {
            server: report.server,
            outcome: report.outcome.to_string(),
        });
    }
    Ok(())
}
