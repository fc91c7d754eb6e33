//! Resolves what to migrate into a list of source peers.

use nbctl_api::{Group, ManagementApi, Peer};
use tracing::{debug, info};

use crate::{Error, Phase, Result};

/// The thing being migrated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MigrationUnit {
    /// One peer, by ID.
    Peer(String),

    /// Every member of a group, by ID or name.
    Group(String),
}

/// Finds a group by exact ID, falling back to a case-insensitive name match.
/// The first group in listing order wins.
#[must_use]
pub fn find_group<'a>(groups: &'a [Group], identifier: &str) -> Option<&'a Group> {
    let wanted = identifier.to_lowercase();

    groups
        .iter()
        .find(|g| g.id == identifier)
        .or_else(|| groups.iter().find(|g| g.name.to_lowercase() == wanted))
}

/// Lists the source peers covered by `unit`, in source order.
///
/// Only reads from `source`.
///
/// # Errors
///
/// `Error::NotFound` if the identifier does not resolve, `Error::EmptyGroup`
/// for a group without members, `Error::Api` for any other request failure.
pub fn plan<A>(source: &A, unit: &MigrationUnit) -> Result<Vec<Peer>>
where
    A: ManagementApi + ?Sized,
{
    match unit {
        MigrationUnit::Peer(id) => Ok(vec![fetch_peer(source, id)?]),
        MigrationUnit::Group(identifier) => {
            let groups = source
                .list_groups()
                .map_err(|e| Error::api(Phase::Planning, identifier.clone(), e))?;

            let group_id = find_group(&groups, identifier)
                .map(|g| g.id.clone())
                .ok_or_else(|| Error::NotFound {
                    kind: "group",
                    identifier: identifier.clone(),
                })?;

            let group = source.get_group(&group_id).map_err(|e| {
                if e.is_not_found() {
                    Error::NotFound {
                        kind: "group",
                        identifier: identifier.clone(),
                    }
                } else {
                    Error::api(Phase::Planning, identifier.clone(), e)
                }
            })?;

            if group.peers.is_empty() {
                return Err(Error::EmptyGroup(group.name));
            }

            info!(group = %group.name, peers = group.peers.len(), "resolved source group");

            group
                .peers
                .iter()
                .map(|peer_id| fetch_peer(source, peer_id))
                .collect()
        }
    }
}

fn fetch_peer<A>(source: &A, id: &str) -> Result<Peer>
where
    A: ManagementApi + ?Sized,
{
    debug!(peer = %id, "fetching source peer");

    source.get_peer(id).map_err(|e| {
        if e.is_not_found() {
            Error::NotFound {
                kind: "peer",
                identifier: id.to_string(),
            }
        } else {
            Error::api(Phase::Planning, id, e)
        }
    })
}
