//! Share subcommand: print the URL that reproduces the persisted query.

use serde::Serialize;

use downtime_core::persist;

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ShareView {
    url: String,
}

pub fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let page = resolved.open_page(global, None)?;

    // Built from the store, like the URL a query leaves behind.
    let url = persist::reflect_to_url(page.store(), page.location())
        .unwrap_or_else(|| page.share_url().clone());

    let view = ShareView {
        url: url.to_string(),
    };
    let out = output::render_single(global.output(), &view, |v| v.url.clone(), |v| v.url.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
