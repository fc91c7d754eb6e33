use std::fmt;

use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of a migration run an error belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Resolving the peer or group to migrate in the source account.
    Planning,

    /// Checking the destination account is reachable.
    Probe,

    /// Mapping group names onto destination group IDs.
    GroupResolution,

    /// Creating the setup key in the destination account.
    CredentialIssuance,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Probe => write!(f, "destination probe"),
            Self::GroupResolution => write!(f, "group resolution"),
            Self::CredentialIssuance => write!(f, "credential issuance"),
        }
    }
}

/// Errors that can occur while migrating peers.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Bad input, detected before any request is made.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A peer or group identifier resolved to nothing in the source account.
    #[error("{kind} '{identifier}' not found in source account")]
    NotFound {
        /// `"peer"` or `"group"`.
        kind: &'static str,

        /// The identifier as given.
        identifier: String,
    },

    /// The source group exists but has no members.
    #[error("group '{0}' has no peers to migrate")]
    EmptyGroup(String),

    /// Some of a peer's groups could not be created in the destination.
    #[error("groups could not be created in destination: {}", .0.join(", "))]
    UnresolvedGroups(Vec<String>),

    /// A request failed.
    #[error("{phase} failed for '{subject}': {source}")]
    Api {
        /// Where in the run the failure happened.
        phase: Phase,

        /// The peer, group or endpoint being worked on.
        subject: String,

        /// The underlying API error.
        source: nbctl_api::Error,
    },
}

impl Error {
    pub(crate) fn api(phase: Phase, subject: impl Into<String>, source: nbctl_api::Error) -> Self {
        Self::Api {
            phase,
            subject: subject.into(),
            source,
        }
    }

    /// The phase this error belongs to.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Validation(_) | Self::NotFound { .. } | Self::EmptyGroup(_) => Phase::Planning,
            Self::UnresolvedGroups(_) => Phase::GroupResolution,
            Self::Api { phase, .. } => *phase,
        }
    }
}
