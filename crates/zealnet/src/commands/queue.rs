//! Offline queue command handlers.
//!
//! Each invocation opens the profile's store, so the queue a previous run
//! left behind is what `list` and `process` see.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use zealnet_core::{ActionKind, DrainReport, Portal, QueuedAction};

use crate::cli::{ActionKindArg, GlobalOpts, OutputFormat, QueueArgs, QueueCommand};
use crate::config::resolve_portal;
use crate::error::CliError;
use crate::output::{self, detail_line, should_color};

use super::util;

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Queued")]
    queued: String,
    #[tabled(rename = "Retries")]
    retries: u32,
    #[tabled(rename = "Payload")]
    payload: String,
}

impl ActionRow {
    fn from_action(a: &QueuedAction) -> Self {
        let mut payload = a.payload.to_string();
        if payload.chars().count() > 48 {
            payload = payload.chars().take(47).collect::<String>() + "…";
        }
        Self {
            id: a.id.clone(),
            kind: a.kind.to_string(),
            queued: a.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            retries: a.retry_count,
            payload,
        }
    }
}

impl From<ActionKindArg> for ActionKind {
    fn from(arg: ActionKindArg) -> Self {
        match arg {
            ActionKindArg::Payment => Self::Payment,
            ActionKindArg::PlanPurchase => Self::PlanPurchase,
            ActionKindArg::ProfileUpdate => Self::ProfileUpdate,
        }
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: QueueArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = resolve_portal(global)?;
    // Delivery only happens on an explicit `process`.
    config.start_online = false;
    let portal = Portal::new(config)?;
    let queue = portal.queue();

    match args.command {
        QueueCommand::Add {
            kind,
            data,
            from_file,
            process,
        } => {
            let payload = match (data, from_file) {
                (Some(raw), _) => util::parse_json_arg("data", &raw)?,
                (None, Some(path)) => util::read_json_file(&path)?,
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "data".into(),
                        reason: "a payload is required (--data or --from-file)".into(),
                    });
                }
            };

            let action = queue.add(kind.into(), payload)?;
            let color = should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &action,
                |a| {
                    output::success(
                        &format!("Queued {} {} ({} pending)", a.kind, a.id, queue.len()),
                        color,
                    )
                },
                |a| a.id.clone(),
            )?;
            output::print_output(&out, global.quiet);

            if process {
                let report = drain(&portal, global).await;
                print_report(&report, global)?;
            }
            Ok(())
        }

        QueueCommand::List => {
            let snapshot = queue.snapshot();
            let out = output::render_list(
                &global.output,
                &snapshot,
                ActionRow::from_action,
                |a| a.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        QueueCommand::Len => {
            output::print_output(&queue.len().to_string(), global.quiet);
            Ok(())
        }

        QueueCommand::Process => {
            let report = drain(&portal, global).await;
            print_report(&report, global)?;
            if report.halted {
                tracing::warn!(pending = queue.len(), "delivery halted, actions kept for the next run");
            }
            Ok(())
        }

        QueueCommand::Clear => {
            let pending = queue.len();
            if pending == 0 {
                output::print_output("Queue is already empty", global.quiet);
                return Ok(());
            }
            if !util::confirm(
                &format!("Drop {pending} pending action(s)?"),
                "queue clear",
                global.yes,
            )? {
                return Ok(());
            }
            queue.clear()?;
            let color = should_color(&global.color);
            output::print_output(
                &output::success(&format!("Dropped {pending} action(s)"), color),
                global.quiet,
            );
            Ok(())
        }
    }
}

/// Replay the queue with a spinner on interactive terminals.
async fn drain(portal: &Portal, global: &GlobalOpts) -> DrainReport {
    let queue = portal.queue();
    let spinner = if global.quiet || !matches!(global.output, OutputFormat::Table) {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    };
    spinner.set_message(format!("Delivering {} queued action(s)…", queue.len()));

    let mut abandoned = queue.subscribe_abandoned();
    let report = queue.process_queue().await;
    spinner.finish_and_clear();

    while let Ok(action) = abandoned.try_recv() {
        tracing::warn!(
            action_id = %action.id,
            kind = %action.kind,
            retries = action.retry_count,
            "action abandoned after repeated failures"
        );
    }
    report
}

fn print_report(report: &DrainReport, global: &GlobalOpts) -> Result<(), CliError> {
    let color = should_color(&global.color);
    let out = output::render_single(
        &global.output,
        report,
        |r| {
            [
                detail_line("delivered", &r.delivered.to_string(), color),
                detail_line("abandoned", &r.abandoned.to_string(), color),
                detail_line("halted", if r.halted { "yes" } else { "no" }, color),
            ]
            .join("\n")
        },
        |r| r.delivered.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
