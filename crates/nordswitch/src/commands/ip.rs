//! `ip` handler: one lookup, no client involved.

use nordswitch_api::PublicIp;
use nordswitch_core::CoreError;

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

fn detail(ip: &PublicIp) -> String {
    let mut pairs = vec![("IP", ip.ip.clone())];
    if let Some(country) = &ip.country {
        pairs.push(("Country", country.clone()));
    }
    if let Some(code) = &ip.country_code {
        pairs.push(("Code", code.clone()));
    }
    output::detail_block(&pairs)
}

pub async fn handle(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::oracle_client(settings)?;
    let observed = client.lookup().await.map_err(CoreError::from)?;
    let out = output::render_single(&global.output, &observed, detail, |ip| ip.ip.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
