//! Moves peer registrations from one account to another.
//!
//! A run plans the peers to move from the source account ([`plan`]), resolves
//! their group names against the destination ([`reconcile`]), issues one
//! single-use setup key per peer ([`provision`]) and renders the command the
//! device has to run ([`emit`]). [`execute`] ties those steps together and
//! returns a [`Report`]. The source account is only ever read, and nothing is
//! deleted.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod duration;
pub mod emit;
mod error;
pub mod execute;
pub mod plan;
pub mod provision;
pub mod reconcile;
pub mod report;

pub use emit::{Instructions, emit};
pub use error::{Error, Phase, Result};
pub use execute::{Mode, Options, execute};
pub use plan::{MigrationUnit, plan};
pub use provision::{RegistrationCredential, provision};
pub use reconcile::{Reconciliation, reconcile};
pub use report::{Failure, MigrationTask, Outcome, Report, TaskState, Warning};

/// Group every peer belongs to in every account. Never migrated.
pub const IMPLICIT_GROUP: &str = "All";
