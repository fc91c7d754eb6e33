//! Prints migration reports.

use std::io::{self, Write};

use nbctl_migrate::{MigrationTask, Outcome, Report, TaskState};
use serde::Serialize;

const CLEANUP_REMINDER: &str = "Cleanup: peers are never deleted automatically. Once each device shows up in the destination, run its cleanup command against the source account.";

#[derive(Serialize)]
struct ReportView<'a> {
    outcome: &'static str,
    succeeded: usize,
    failed: usize,
    dry_run: bool,
    created_groups: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pending_groups: &'a [String],
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleanup_reminder: Option<&'static str>,
    peers: Vec<PeerView<'a>>,
}

#[derive(Serialize)]
struct PeerView<'a> {
    id: &'a str,
    name: &'a str,
    hostname: &'a str,
    status: &'static str,
    group_ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_key_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleanup_command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

const fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Completed => "completed",
        Outcome::PartialFailure => "partial_failure",
        Outcome::Failed => "failed",
        Outcome::DryRun => "dry_run",
    }
}

const fn status(task: &MigrationTask) -> &'static str {
    match task.state {
        TaskState::Pending => "pending",
        TaskState::GroupsResolved => "planned",
        TaskState::CredentialIssued(_) => "key_issued",
        TaskState::Emitted { .. } => "migrated",
        TaskState::Failed(_) => "failed",
    }
}

impl<'a> PeerView<'a> {
    fn new(task: &'a MigrationTask) -> Self {
        let credential = task.credential();
        let instructions = task.instructions();
        let failure = task.failure();

        Self {
            id: &task.peer.id,
            name: &task.peer.name,
            hostname: task.peer.display_hostname(),
            status: status(task),
            group_ids: &task.resolved_group_ids,
            setup_key: credential.map(|c| c.key.expose()),
            setup_key_name: credential.map(|c| c.name.as_str()),
            command: instructions.map(|i| i.command.as_str()),
            notes: instructions.map(|i| i.notes.as_slice()),
            cleanup_command: instructions.map(|i| i.cleanup_command.as_str()),
            phase: failure.map(|f| f.phase.to_string()),
            error: failure.map(|f| f.to_string()),
        }
    }
}

fn wants_cleanup_reminder(report: &Report, cleanup: bool) -> bool {
    cleanup && report.succeeded() > 0
}

/// Writes the report as one JSON document.
pub fn json(out: &mut impl Write, report: &Report, cleanup: bool) -> serde_json::Result<()> {
    let view = ReportView {
        outcome: outcome_name(report.outcome()),
        succeeded: report.succeeded(),
        failed: report.failed(),
        dry_run: report.dry_run,
        created_groups: &report.created_groups,
        pending_groups: &report.pending_groups,
        warnings: report.warnings.iter().map(ToString::to_string).collect(),
        cleanup_reminder: wants_cleanup_reminder(report, cleanup).then_some(CLEANUP_REMINDER),
        peers: report.tasks.iter().map(PeerView::new).collect(),
    };

    serde_json::to_writer_pretty(&mut *out, &view)?;
    writeln!(out).map_err(serde_json::Error::io)
}

/// Writes per-peer instruction blocks followed by a summary.
pub fn text(out: &mut impl Write, report: &Report, cleanup: bool) -> io::Result<()> {
    for task in &report.tasks {
        writeln!(out, "== {} ({}) ==", task.peer.name, task.peer.id)?;

        match &task.state {
            TaskState::Emitted { instructions, .. } => writeln!(out, "{instructions}")?,
            TaskState::Failed(failure) => writeln!(out, "FAILED: {failure}")?,
            TaskState::GroupsResolved if report.dry_run => writeln!(
                out,
                "Would issue a single-use setup key scoped to {} group(s).",
                task.resolved_group_ids.len()
            )?,
            TaskState::Pending | TaskState::GroupsResolved | TaskState::CredentialIssued(_) => {
                writeln!(out, "Incomplete: {}", status(task))?;
            }
        }
        writeln!(out)?;
    }

    let outcome = report.outcome();
    if report.dry_run {
        writeln!(out, "Dry run: nothing was created.")?;
        if !report.pending_groups.is_empty() {
            writeln!(
                out,
                "Groups to create in destination: {}",
                report.pending_groups.join(", ")
            )?;
        }
    } else {
        writeln!(
            out,
            "Summary: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        )?;
    }
    if !report.created_groups.is_empty() {
        writeln!(
            out,
            "Created groups in destination: {}",
            report.created_groups.join(", ")
        )?;
    }
    if outcome == Outcome::PartialFailure {
        writeln!(
            out,
            "Some peers failed. Re-running reuses the groups already created; migrated peers stay migrated."
        )?;
    }
    if wants_cleanup_reminder(report, cleanup) {
        writeln!(out, "{CLEANUP_REMINDER}")?;
    }

    Ok(())
}
