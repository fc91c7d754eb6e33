//! Maps group names onto destination group IDs, creating missing groups.

use std::collections::HashMap;

use nbctl_api::ManagementApi;
use tracing::{debug, info};

use crate::report::Warning;
use crate::{Error, Phase, Result};

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Requested name → destination group ID.
    pub ids: HashMap<String, String>,

    /// Names that were created by this pass, in request order.
    pub created: Vec<String>,

    /// Names absent from the destination and left uncreated.
    pub missing: Vec<String>,

    /// Names whose creation was attempted and failed.
    pub failed: Vec<String>,

    /// Non-fatal problems encountered.
    pub warnings: Vec<Warning>,
}

impl Reconciliation {
    /// Destination IDs for `names`, in order, skipping names that did not
    /// resolve.
    #[must_use]
    pub fn ids_for(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|name| self.ids.get(name).cloned())
            .collect()
    }

    /// The subset of `names` whose creation failed.
    #[must_use]
    pub fn failed_among(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|name| self.failed.contains(name))
            .cloned()
            .collect()
    }
}

/// Resolves `names` against the groups of `client`'s namespace.
///
/// Groups are listed once per call. Matching is case-insensitive and the first
/// group in listing order wins when several share a name. A name without a
/// match is created when `create_missing` is set; a failed creation is
/// recorded as a warning and the name is left out of the mapping. Without
/// `create_missing` it is listed in `missing` once per case-insensitive name.
///
/// # Errors
///
/// Fails only if the group listing itself fails.
pub fn reconcile<A>(client: &A, names: &[String], create_missing: bool) -> Result<Reconciliation>
where
    A: ManagementApi + ?Sized,
{
    let existing = client.list_groups().map_err(|e| {
        Error::api(
            Phase::GroupResolution,
            client.namespace().endpoint().as_str(),
            e,
        )
    })?;

    let mut lookup: HashMap<String, String> = HashMap::new();
    for group in existing {
        lookup.entry(group.name.to_lowercase()).or_insert(group.id);
    }

    let mut result = Reconciliation::default();

    for name in names {
        if result.ids.contains_key(name) || result.failed.contains(name) {
            continue;
        }

        let key = name.to_lowercase();
        if let Some(id) = lookup.get(&key) {
            debug!(group = %name, %id, "group exists in destination");
            result.ids.insert(name.clone(), id.clone());
            continue;
        }

        if !create_missing {
            if !result.missing.iter().any(|m| m.to_lowercase() == key) {
                result.missing.push(name.clone());
                result.warnings.push(Warning::GroupMissing { name: name.clone() });
            }
            continue;
        }

        match client.create_group(name) {
            Ok(group) => {
                info!(group = %name, id = %group.id, "created group in destination");
                lookup.insert(key, group.id.clone());
                result.ids.insert(name.clone(), group.id);
                result.created.push(name.clone());
            }
            Err(error) => {
                debug!(group = %name, %error, "failed to create group in destination");
                result.failed.push(name.clone());
                result.warnings.push(Warning::GroupCreateFailed {
                    name: name.clone(),
                    error,
                });
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use nbctl_api_mock::MockApi;
    use pretty_assertions::assert_eq;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_maps_existing_and_creates_missing() {
        let dest = MockApi::new("https://dest.example.com/api").with_group("d-ops", "ops");

        let result = reconcile(&dest, &names(&["eng", "ops"]), true).unwrap();

        assert_eq!(result.created, vec!["eng"]);
        assert_eq!(result.ids["ops"], "d-ops");
        assert!(result.ids.contains_key("eng"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_case_insensitive_first_match_wins() {
        let dest = MockApi::new("https://dest.example.com/api")
            .with_group("d-1", "Engineering")
            .with_group("d-2", "ENGINEERING");

        let result = reconcile(&dest, &names(&["engineering"]), true).unwrap();

        assert_eq!(result.ids["engineering"], "d-1");
        assert!(result.created.is_empty());
    }

    #[test]
    fn test_idempotent_second_pass() {
        let dest = MockApi::new("https://dest.example.com/api").with_group("d-ops", "ops");
        let requested = names(&["eng", "ops", "db"]);

        let first = reconcile(&dest, &requested, true).unwrap();
        let second = reconcile(&dest, &requested, true).unwrap();

        assert_eq!(first.ids, second.ids);
        assert_eq!(first.created, vec!["eng", "db"]);
        assert!(second.created.is_empty());
    }

    #[test]
    fn test_lists_groups_once() {
        let dest = MockApi::new("https://dest.example.com/api");

        reconcile(&dest, &names(&["a", "b", "c", "A"]), true).unwrap();

        let listings = dest
            .calls()
            .iter()
            .filter(|call| call.path == "/groups" && !call.is_write())
            .count();
        assert_eq!(listings, 1);
        // "A" reuses the group created for "a"
        assert_eq!(dest.groups().len(), 3);
    }

    #[test]
    fn test_creation_failure_is_a_warning() {
        let dest = MockApi::new("https://dest.example.com/api").with_group("d-ops", "ops");
        dest.fail_group_creation("eng");

        let result = reconcile(&dest, &names(&["eng", "ops"]), true).unwrap();

        assert!(!result.ids.contains_key("eng"));
        assert_eq!(result.failed, vec!["eng"]);
        assert_eq!(result.ids_for(&names(&["eng", "ops"])), vec!["d-ops"]);
        assert_matches!(
            result.warnings.as_slice(),
            [Warning::GroupCreateFailed { name, .. }] if name == "eng"
        );
    }

    #[test]
    fn test_lookup_only_mode_writes_nothing() {
        let dest = MockApi::new("https://dest.example.com/api").with_group("d-ops", "ops");

        let result = reconcile(&dest, &names(&["eng", "ops"]), false).unwrap();

        assert_eq!(result.missing, vec!["eng"]);
        assert!(dest.writes().is_empty());
    }

    #[test]
    fn test_missing_names_differing_in_case_are_listed_once() {
        let dest = MockApi::new("https://dest.example.com/api");

        let result = reconcile(&dest, &names(&["Eng", "ops", "eng", "ENG"]), false).unwrap();

        assert_eq!(result.missing, vec!["Eng", "ops"]);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let dest = MockApi::new("https://dest.example.com/api");
        dest.set_offline(true);

        let err = reconcile(&dest, &names(&["eng"]), true).unwrap_err();

        assert_eq!(err.phase(), Phase::GroupResolution);
    }
}
