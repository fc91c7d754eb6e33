//! Renders device re-registration commands and operator notes.

use std::fmt;

use nbctl_api::{Namespace, Peer};

use crate::duration;
use crate::provision::RegistrationCredential;

/// Agent binary on the device.
pub const AGENT_BIN: &str = "netbird";

/// Environment variable the cleanup command expects the source token in.
pub const SOURCE_TOKEN_ENV: &str = "NBCTL_SOURCE_TOKEN";

/// What the operator has to do for one migrated peer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instructions {
    /// Command to run on the device.
    pub command: String,

    /// Things the operator should know.
    pub notes: Vec<String>,

    /// Command that removes the stale peer from the source account. Not run
    /// by this tool.
    pub cleanup_command: String,
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run on the device:")?;
        writeln!(f, "  {}", self.command)?;
        writeln!(f)?;
        writeln!(f, "Notes:")?;
        for note in &self.notes {
            writeln!(f, "  - {note}")?;
        }
        writeln!(f)?;
        writeln!(f, "Afterwards, remove the old peer from the source account:")?;
        write!(f, "  {}", self.cleanup_command)
    }
}

/// Builds the instructions for moving `peer` with `credential`.
#[must_use]
pub fn emit(
    peer: &Peer,
    credential: &RegistrationCredential,
    source: &Namespace,
    destination: &Namespace,
) -> Instructions {
    let mut command = format!(
        "{AGENT_BIN} down && {AGENT_BIN} up --setup-key {} --hostname {}",
        quote(credential.key.expose()),
        quote(peer.display_hostname())
    );
    if !destination.is_default_endpoint() {
        command.push_str(" --management-url ");
        command.push_str(&quote(&destination.management_url()));
    }

    let mut notes = Vec::new();
    if peer.ip.is_empty() {
        notes.push(
            "The device joins the destination as a new peer with a new IP address and identity."
                .to_string(),
        );
    } else {
        notes.push(format!(
            "The device joins the destination as a new peer; its address {} and peer identity do not carry over.",
            peer.ip
        ));
    }
    notes.push(format!(
        "Setup key '{}' is single-use and expires in {}.",
        credential.name,
        duration::format(credential.expires_in_seconds)
    ));
    if credential.scoped_group_ids.is_empty() {
        notes.push("The key is not scoped to any group.".to_string());
    }

    Instructions {
        command,
        notes,
        cleanup_command: cleanup_command(&peer.id, source),
    }
}

/// The request that deletes peer `peer_id` from `source`.
#[must_use]
pub fn cleanup_command(peer_id: &str, source: &Namespace) -> String {
    format!(
        "curl -X DELETE -H \"Authorization: Token ${SOURCE_TOKEN_ENV}\" {}",
        quote(&source.url_for(&format!("/peers/{peer_id}")))
    )
}

/// Single-quotes `value` for a POSIX shell unless it is already safe.
fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:/@=+%,".contains(c));

    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
