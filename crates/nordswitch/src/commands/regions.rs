//! `regions` handler: browse the server catalog.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, RegionsArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct GroupView {
    name: String,
    members: Vec<String>,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    name: String,
    #[tabled(rename = "Servers")]
    count: usize,
    #[tabled(rename = "Members")]
    preview: String,
}

#[derive(Serialize)]
struct MemberView {
    server: String,
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Server")]
    server: String,
}

const PREVIEW_LEN: usize = 4;

fn group_row(g: &GroupView) -> GroupRow {
    let mut preview = g
        .members
        .iter()
        .take(PREVIEW_LEN)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if g.members.len() > PREVIEW_LEN {
        preview.push_str(", ...");
    }
    GroupRow {
        name: g.name.clone(),
        count: g.members.len(),
        preview,
    }
}

pub fn handle(args: &RegionsArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let catalog = &settings.catalog;

    let out = match &args.group {
        None => {
            let groups: Vec<GroupView> = catalog
                .groups()
                .map(|(name, members)| GroupView {
                    name: name.to_owned(),
                    members: members.to_vec(),
                })
                .collect();
            output::render_list(&global.output, &groups, group_row, |g| g.name.clone())
        }
        Some(name) => {
            let members = catalog
                .group(name)
                .ok_or_else(|| CliError::GroupNotFound { name: name.clone() })?;
            let members: Vec<MemberView> = members
                .iter()
                .map(|m| MemberView { server: m.clone() })
                .collect();
            output::render_list(
                &global.output,
                &members,
                |m| MemberRow {
                    server: m.server.clone(),
                },
                |m| m.server.clone(),
            )
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
