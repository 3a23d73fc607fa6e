//! `resolve` handler: show what a label would connect to.

use nordswitch_core::Platform;
use serde::Serialize;

use crate::cli::{GlobalOpts, PlatformArg, ResolveArgs};
use crate::commands::util;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ResolveView {
    label: String,
    group: Option<String>,
    platform: Platform,
    server: String,
    command: String,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::Linux => Platform::Linux,
        }
    }
}

fn detail(view: &ResolveView) -> String {
    output::detail_block(&[
        ("Label", view.label.clone()),
        ("Group", view.group.clone().unwrap_or_else(|| "-".into())),
        ("Platform", view.platform.to_string()),
        ("Server", view.server.clone()),
        ("Command", view.command.clone()),
    ])
}

pub fn handle(args: &ResolveArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let mut bootstrapper = util::bootstrapper(settings);
    if let Some(platform) = args.platform {
        bootstrapper = bootstrapper.with_platform(platform.into());
    }
    let platform = bootstrapper.platform()?;
    let working_dir = resolve_working_dir(settings, platform);

    let descriptor = bootstrapper.describe(&args.label, working_dir, &mut rand::thread_rng())?;
    let group = bootstrapper
        .catalog()
        .is_group(descriptor.requested_label())
        .then(|| descriptor.requested_label().to_owned());

    let view = ResolveView {
        label: descriptor.requested_label().to_owned(),
        group,
        platform,
        server: descriptor.target_server().to_owned(),
        command: descriptor.connect_invocation().to_string(),
    };
    let out = output::render_single(&global.output, &view, detail, |v| v.server.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Install dir for display purposes only; nothing is checked on disk.
fn resolve_working_dir(settings: &Settings, platform: Platform) -> Option<std::path::PathBuf> {
    if !platform.requires_working_dir() {
        return None;
    }
    settings
        .profile
        .install_dir
        .clone()
        .or_else(|| platform.default_install_dirs().into_iter().next())
}

