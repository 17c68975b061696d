//! Query subcommand: the "get downtime" action.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use downtime_core::{CoreError, DeviceSpec, DeviceState, QueryOutcome, Report, ReportRow};

use crate::cli::{GlobalOpts, OutputFormat, QueryArgs};
use crate::commands::window::apply_bounds;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DowntimeRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Downtime")]
    downtime: String,
    #[tabled(rename = "% of window")]
    percentage: String,
}

fn to_row(row: &ReportRow) -> DowntimeRow {
    DowntimeRow {
        device: row.device.clone(),
        downtime: row.downtime.clone(),
        percentage: row.percentage.clone(),
    }
}

fn detail(report: &Report) -> String {
    let rows: Vec<DowntimeRow> = report.rows.iter().map(to_row).collect();
    let table = output::render_table(&rows);
    match report.caption {
        Some(ref caption) => format!("{table}\n{caption}"),
        None => table,
    }
}

fn plain(report: &Report) -> String {
    report
        .rows
        .iter()
        .map(|r| format!("{}\t{}\t{}", r.device, r.downtime, r.percentage))
        .collect::<Vec<_>>()
        .join("\n")
}

fn spinner(global: &GlobalOpts, devices: usize) -> Option<ProgressBar> {
    if global.quiet || !matches!(global.output(), OutputFormat::Table) || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Querying {devices} device(s)"));
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Devices that did not complete, one stderr line each.
fn report_incomplete(outcome: &QueryOutcome, color: bool) {
    for (name, state) in outcome.incomplete() {
        eprintln!("! {name}: {}", output::paint_state(state, color));
    }
}

pub async fn handle(args: QueryArgs, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let mut page = resolved.open_page(global, args.url.as_deref())?;

    apply_bounds(page.form_mut(), &args.window)?;
    if !args.device.is_empty() {
        page.form_mut().rows = args.device.iter().map(|d| DeviceSpec::parse(d)).collect();
    }

    let options = resolved.query_options(args.release, args.timeout)?;
    let logger = resolved.logger(global)?;
    let logger_url = logger.url().to_string();
    tracing::info!(logger = %logger_url, release = %options.release, "Running downtime query");

    let pb = spinner(global, page.form().configured_rows().count());
    let result = page.get_downtime(&logger, &options).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let outcome = result.map_err(|e| match e {
        CoreError::LoggerUnavailable { reason } => CliError::ConnectionFailed {
            url: logger_url,
            reason,
        },
        other => other.into(),
    })?;

    let out = output::render_single(global.output(), page.report(), detail, plain)?;
    output::print_output(&out, global.quiet);
    report_incomplete(&outcome, output::should_color(global.color()));

    let timed_out = outcome
        .incomplete()
        .filter(|(_, state)| *state == DeviceState::TimedOut)
        .count();
    match options.deadline {
        Some(deadline) if timed_out > 0 => Err(CliError::Timeout {
            count: timed_out,
            seconds: deadline.as_secs(),
        }),
        _ => Ok(()),
    }
}
