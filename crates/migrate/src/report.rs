//! Per-peer task state and the aggregate outcome of a run.

use std::fmt;

use nbctl_api::Peer;

use crate::emit::Instructions;
use crate::provision::RegistrationCredential;
use crate::{Error, Phase};

/// A non-fatal problem worth telling the operator about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    /// A destination group could not be created.
    GroupCreateFailed {
        /// Group name.
        name: String,

        /// Why creation failed.
        error: nbctl_api::Error,
    },

    /// A destination group does not exist and creation was disabled.
    GroupMissing {
        /// Group name.
        name: String,
    },

    /// A peer in a batch failed and was skipped.
    PeerFailed {
        /// Source peer ID.
        peer_id: String,

        /// Peer display name.
        peer_name: String,

        /// Why it failed.
        failure: Failure,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupCreateFailed { name, error } => {
                write!(f, "could not create group '{name}' in destination: {error}")
            }
            Self::GroupMissing { name } => write!(
                f,
                "group '{name}' does not exist in destination and group creation is disabled"
            ),
            Self::PeerFailed {
                peer_id,
                peer_name,
                failure,
            } => write!(f, "peer '{peer_name}' ({peer_id}) skipped: {failure}"),
        }
    }
}

/// Why a task failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Failure {
    /// Transition at which the task failed.
    pub phase: Phase,

    /// Underlying error.
    pub error: Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Error::Api { source, .. } => write!(f, "{} failed: {source}", self.phase),
            error => write!(f, "{} failed: {error}", self.phase),
        }
    }
}

/// Where a task is in `Pending → GroupsResolved → CredentialIssued → Emitted`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// Nothing done yet.
    Pending,

    /// Destination group IDs are known.
    GroupsResolved,

    /// A setup key was created.
    CredentialIssued(RegistrationCredential),

    /// Device instructions were rendered.
    Emitted {
        /// The issued key.
        credential: RegistrationCredential,

        /// Command and notes for the operator.
        instructions: Instructions,
    },

    /// The task stopped.
    Failed(Failure),
}

/// Migration of one peer. Lives only for the duration of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MigrationTask {
    /// The source peer.
    pub peer: Peer,

    /// Destination group IDs the key is scoped to.
    pub resolved_group_ids: Vec<String>,

    /// Current state.
    pub state: TaskState,
}

impl MigrationTask {
    /// A pending task for `peer`.
    #[must_use]
    pub const fn new(peer: Peer) -> Self {
        Self {
            peer,
            resolved_group_ids: Vec::new(),
            state: TaskState::Pending,
        }
    }

    /// The peer's group names that are carried over.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.peer
            .groups
            .iter()
            .map(|g| g.name.clone())
            .filter(|name| name != crate::IMPLICIT_GROUP)
            .collect()
    }

    /// The issued key, if the task got that far.
    #[must_use]
    pub const fn credential(&self) -> Option<&RegistrationCredential> {
        match &self.state {
            TaskState::CredentialIssued(credential) | TaskState::Emitted { credential, .. } => {
                Some(credential)
            }
            _ => None,
        }
    }

    /// The rendered instructions, if any.
    #[must_use]
    pub const fn instructions(&self) -> Option<&Instructions> {
        match &self.state {
            TaskState::Emitted { instructions, .. } => Some(instructions),
            _ => None,
        }
    }

    /// The failure, if the task failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match &self.state {
            TaskState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Aggregate result of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Every peer succeeded.
    Completed,

    /// Some peers failed, others succeeded.
    PartialFailure,

    /// No peer succeeded.
    Failed,

    /// Nothing was written.
    DryRun,
}

/// Everything a run produced.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    /// One task per planned peer, in source order.
    pub tasks: Vec<MigrationTask>,

    /// Groups created in the destination.
    pub created_groups: Vec<String>,

    /// Groups a real run would create (dry run only).
    pub pending_groups: Vec<String>,

    /// Non-fatal problems, in the order they happened.
    pub warnings: Vec<Warning>,

    /// Whether the run was a dry run.
    pub dry_run: bool,
}

impl Report {
    /// Number of peers that reached `Emitted`.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Emitted { .. }))
            .count()
    }

    /// Number of peers that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Failed(_)))
            .count()
    }

    /// Classifies the run.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.dry_run {
            Outcome::DryRun
        } else if self.failed() == 0 {
            Outcome::Completed
        } else if self.succeeded() > 0 {
            Outcome::PartialFailure
        } else {
            Outcome::Failed
        }
    }
}
