//! Drives planned tasks through group resolution, key issuance and emission.

use std::mem;

use chrono::NaiveDate;
use nbctl_api::{ManagementApi, Namespace};
use tracing::{debug, info};

use crate::emit::emit;
use crate::plan::MigrationUnit;
use crate::provision::{credential_name, provision};
use crate::reconcile::reconcile;
use crate::report::{Failure, MigrationTask, Report, TaskState, Warning};
use crate::{Error, Phase, Result};

/// How failures are treated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// One peer; a key issuance failure aborts the run.
    Single,

    /// A group of peers; failures are isolated per peer.
    Batch,
}

impl From<&MigrationUnit> for Mode {
    fn from(unit: &MigrationUnit) -> Self {
        match unit {
            MigrationUnit::Peer(_) => Self::Single,
            MigrationUnit::Group(_) => Self::Batch,
        }
    }
}

/// Knobs for a run.
#[derive(Clone, Debug)]
pub struct Options {
    /// Failure handling.
    pub mode: Mode,

    /// Create destination groups that do not exist yet.
    pub create_groups: bool,

    /// Setup key lifetime.
    pub expires_in_seconds: u64,

    /// Date used in setup key names.
    pub date: NaiveDate,

    /// Stop after group lookup without writing anything.
    pub dry_run: bool,
}

/// Runs `tasks` against `destination`.
///
/// The destination is probed with `GET /peers` before anything is written.
/// Group names from every task are reconciled in one pass, then each task is
/// given a key independently, in order. In batch mode a failing task is marked
/// `Failed` and the run continues. Instructions are emitted once every key has
/// been issued.
///
/// # Errors
///
/// Fails if the probe or the group listing fails, and in single mode if the
/// key cannot be issued. Batch mode never fails because of one task.
pub fn execute<A>(
    mut tasks: Vec<MigrationTask>,
    source: &Namespace,
    destination: &A,
    options: &Options,
) -> Result<Report>
where
    A: ManagementApi + ?Sized,
{
    let dest_ns = destination.namespace();
    if source.shares_endpoint_with(dest_ns) {
        info!(endpoint = %dest_ns.endpoint(), "source and destination share an endpoint");
    }

    destination
        .list_peers()
        .map_err(|e| Error::api(Phase::Probe, dest_ns.endpoint().as_str(), e))?;

    let mut names: Vec<String> = Vec::new();
    for task in &tasks {
        for name in task.group_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let create = options.create_groups && !options.dry_run;
    let groups = reconcile(destination, &names, create)?;

    let mut report = Report {
        created_groups: groups.created.clone(),
        warnings: groups.warnings.clone(),
        dry_run: options.dry_run,
        ..Report::default()
    };
    if options.dry_run && options.create_groups {
        report.pending_groups.clone_from(&groups.missing);
        report
            .warnings
            .retain(|w| !matches!(w, Warning::GroupMissing { .. }));
    }

    for task in &mut tasks {
        let wanted = task.group_names();
        task.resolved_group_ids = groups.ids_for(&wanted);

        let failed_groups = groups.failed_among(&wanted);
        if options.mode == Mode::Batch && !failed_groups.is_empty() {
            let error = Error::UnresolvedGroups(failed_groups);
            fail(task, &mut report, Phase::GroupResolution, error);
            continue;
        }
        task.state = TaskState::GroupsResolved;

        if options.dry_run {
            continue;
        }

        let name = credential_name(&task.peer.name, options.date);
        match provision(
            destination,
            &name,
            &task.resolved_group_ids,
            options.expires_in_seconds,
        ) {
            Ok(credential) => task.state = TaskState::CredentialIssued(credential),
            Err(e) => {
                let error = Error::api(Phase::CredentialIssuance, task.peer.name.clone(), e);
                if options.mode == Mode::Single {
                    return Err(error);
                }
                fail(task, &mut report, Phase::CredentialIssuance, error);
            }
        }
    }

    emit_issued(&mut tasks, source, dest_ns);

    report.tasks = tasks;
    Ok(report)
}

/// Moves every task holding a fresh credential to `Emitted`.
fn emit_issued(tasks: &mut [MigrationTask], source: &Namespace, destination: &Namespace) {
    for task in tasks {
        let state = mem::replace(&mut task.state, TaskState::Pending);
        task.state = match state {
            TaskState::CredentialIssued(credential) => {
                let instructions = emit(&task.peer, &credential, source, destination);
                TaskState::Emitted {
                    credential,
                    instructions,
                }
            }
            other => other,
        };
    }
}

fn fail(task: &mut MigrationTask, report: &mut Report, phase: Phase, error: Error) {
    let failure = Failure { phase, error };
    debug!(peer = %task.peer.name, id = %task.peer.id, "{}", failure);

    report.warnings.push(Warning::PeerFailed {
        peer_id: task.peer.id.clone(),
        peer_name: task.peer.name.clone(),
        failure: failure.clone(),
    });
    task.state = TaskState::Failed(failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistrationCredential;
    use assert_matches::assert_matches;
    use nbctl_api::{SetupKeyKind, SetupKeySecret};
    use nbctl_api_mock::peer;
    use url::Url;

    fn namespace(endpoint: &str) -> Namespace {
        Namespace::new(Url::parse(endpoint).unwrap(), "token")
    }

    #[test]
    fn test_emit_issued_only_touches_issued_tasks() {
        let mut issued = MigrationTask::new(peer("p1", "host-1", &[]));
        issued.state = TaskState::CredentialIssued(RegistrationCredential {
            id: "key-1".to_string(),
            key: SetupKeySecret::new("KEY-ONE"),
            name: "migrate-host-1-2026-10-19".to_string(),
            kind: SetupKeyKind::OneOff,
            expires_in_seconds: 3600,
            scoped_group_ids: Vec::new(),
            usage_limit: 1,
        });
        let planned = {
            let mut task = MigrationTask::new(peer("p2", "host-2", &[]));
            task.state = TaskState::GroupsResolved;
            task
        };
        let mut tasks = vec![issued, planned];

        emit_issued(
            &mut tasks,
            &namespace("https://source.example.com/api"),
            &namespace("https://dest.example.com/api"),
        );

        assert_matches!(
            &tasks[0].state,
            TaskState::Emitted { instructions, .. }
                if instructions.command.contains("--setup-key KEY-ONE")
        );
        assert_eq!(tasks[1].state, TaskState::GroupsResolved);
    }
}
