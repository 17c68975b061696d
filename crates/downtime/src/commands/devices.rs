//! Devices subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use downtime_core::DeviceSpec;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct IndexedSpec {
    index: usize,
    #[serde(flatten)]
    spec: DeviceSpec,
    drf: String,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Clock")]
    clock: String,
    #[tabled(rename = "Delay")]
    delay: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
}

fn to_row(row: &IndexedSpec) -> DeviceRow {
    let s = &row.spec;
    DeviceRow {
        index: row.index,
        device: s.device.clone(),
        event: s.event_period.clone(),
        rate: s.rate.clone(),
        clock: s.clock_type.clone(),
        delay: s.delay.clone(),
        threshold: s.threshold.clone(),
    }
}

pub fn handle(args: DevicesArgs, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let mut page = resolved.open_page(global, None)?;

    match args.command {
        DevicesCommand::List => {
            let rows: Vec<IndexedSpec> = page
                .form()
                .rows
                .iter()
                .enumerate()
                .map(|(index, spec)| IndexedSpec {
                    index,
                    spec: spec.clone(),
                    drf: spec.to_drf(),
                })
                .collect();
            let out = output::render_list(global.output(), &rows, to_row, |r| r.drf.clone())?;
            output::print_output(&out, global.quiet);
        }

        DevicesCommand::Add { drf } => {
            let form = page.form_mut();
            match drf {
                Some(ref drf) => form.add_spec(DeviceSpec::parse(drf)),
                None => {
                    form.add_device();
                }
            }
            let index = form.rows.len() - 1;
            let added = form.rows[index].to_drf();
            page.persist()?;
            if !global.quiet {
                eprintln!("✓ Added row {index}: {}", if added.is_empty() { "(empty)" } else { &added });
            }
        }

        DevicesCommand::Remove { index } => {
            let removed = page.form_mut().remove_device(index)?;
            page.persist()?;
            if !global.quiet {
                eprintln!("✓ Removed row {index}: {}", removed.to_drf());
            }
        }
    }

    Ok(())
}
