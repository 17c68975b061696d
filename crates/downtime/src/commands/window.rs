//! Window subcommand handler, plus the bound handling shared with `query`.

use chrono::{Local, TimeDelta, Utc};
use serde::Serialize;

use downtime_core::window::parse_timestamp_in;
use downtime_core::{QueryForm, ResolvedWindow, TimeWindow, humanize};

use crate::cli::{GlobalOpts, WindowBounds};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct WindowView {
    t1: String,
    t2: String,
    /// Humanized length, when both bounds resolve.
    length: Option<String>,
}

impl From<&QueryForm> for WindowView {
    fn from(form: &QueryForm) -> Self {
        Self {
            t1: form.t1.clone(),
            t2: form.t2.clone(),
            length: form
                .window()
                .resolve()
                .ok()
                .map(|w| humanize(w.duration())),
        }
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

fn detail(view: &WindowView) -> String {
    let mut lines = vec![
        format!("t1:      {}", or_unset(&view.t1)),
        format!("t2:      {}", or_unset(&view.t2)),
    ];
    if let Some(ref length) = view.length {
        lines.push(format!("length:  {length}"));
    }
    lines.join("\n")
}

/// Apply `--t1`/`--t2`/`--last` to the form. Returns whether anything changed.
pub fn apply_bounds(form: &mut QueryForm, bounds: &WindowBounds) -> Result<bool, CliError> {
    if let Some(ref last) = bounds.last {
        let length = humantime::parse_duration(last).map_err(|e| CliError::Validation {
            field: "last".into(),
            reason: format!("'{last}': {e}"),
        })?;
        let length = TimeDelta::from_std(length).map_err(|_| CliError::Validation {
            field: "last".into(),
            reason: format!("'{last}' is too long"),
        })?;

        let end = match bounds.t2.as_deref() {
            Some(t2) => parse_timestamp_in(t2, &Local).ok_or_else(|| CliError::Validation {
                field: "t2".into(),
                reason: format!("'{t2}' is not a recognized timestamp"),
            })?,
            None => Utc::now(),
        };

        let window = ResolvedWindow::ending_at(end, length)?;
        form.set_window(&window.to_time_window());
        return Ok(true);
    }

    if bounds.t1.is_none() && bounds.t2.is_none() {
        return Ok(false);
    }
    form.set_window(&TimeWindow {
        t1: bounds.t1.clone(),
        t2: bounds.t2.clone(),
    });
    Ok(true)
}

pub fn handle(bounds: &WindowBounds, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let mut page = resolved.open_page(global, None)?;

    if apply_bounds(page.form_mut(), bounds)? {
        page.persist()?;
        if !global.quiet {
            eprintln!("✓ Window updated");
        }
    }

    let view = WindowView::from(page.form());
    let out = output::render_single(global.output(), &view, detail, |v| {
        format!("{}\n{}", v.t1, v.t2)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
