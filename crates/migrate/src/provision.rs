//! Issues single-use setup keys in the destination account.

use chrono::NaiveDate;
use nbctl_api::{CreateSetupKeyRequest, ManagementApi, SetupKeyKind, SetupKeySecret};
use tracing::info;

/// A setup key issued for one migrating peer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistrationCredential {
    /// Key ID in the destination account.
    pub id: String,

    /// Plaintext key. Shown to the operator once, never logged.
    pub key: SetupKeySecret,

    /// Key name.
    pub name: String,

    /// Always `SetupKeyKind::OneOff`.
    pub kind: SetupKeyKind,

    /// Lifetime requested at creation.
    pub expires_in_seconds: u64,

    /// Destination groups the registering peer joins.
    pub scoped_group_ids: Vec<String>,

    /// Always 1.
    pub usage_limit: u32,
}

/// Name for the key issued to a peer on `date`: `migrate-<peer>-<YYYY-MM-DD>`.
#[must_use]
pub fn credential_name(peer_name: &str, date: NaiveDate) -> String {
    let peer: String = peer_name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    format!("migrate-{peer}-{}", date.format("%Y-%m-%d"))
}

/// Creates a single-use key scoped to `scoped_group_ids`.
///
/// An empty scope is valid and yields an unscoped key.
///
/// # Errors
///
/// Returns the API error if the destination rejects the request.
pub fn provision<A>(
    client: &A,
    name: &str,
    scoped_group_ids: &[String],
    expires_in_seconds: u64,
) -> nbctl_api::Result<RegistrationCredential>
where
    A: ManagementApi + ?Sized,
{
    let request = CreateSetupKeyRequest::single_use(
        name.to_string(),
        expires_in_seconds,
        scoped_group_ids.to_vec(),
    );

    let key = client.create_setup_key(&request)?;
    info!(
        name = %request.name,
        id = %key.id,
        groups = request.auto_groups.len(),
        "issued setup key"
    );

    Ok(RegistrationCredential {
        id: key.id,
        key: key.key,
        name: request.name,
        kind: request.kind,
        expires_in_seconds: request.expires_in,
        scoped_group_ids: request.auto_groups,
        usage_limit: request.usage_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbctl_api_mock::MockApi;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_credential_name() {
        assert_eq!(credential_name("host-a", date()), "migrate-host-a-2026-10-19");
        assert_eq!(
            credential_name(" Dev Laptop ", date()),
            "migrate-Dev-Laptop-2026-10-19"
        );
    }

    #[test]
    fn test_always_single_use() {
        let dest = MockApi::new("https://dest.example.com/api").with_group("d-ops", "ops");

        for scope in [Vec::new(), vec!["d-ops".to_string()]] {
            let credential = provision(&dest, "migrate-host-a", &scope, 86_400).unwrap();

            assert_eq!(credential.kind, SetupKeyKind::OneOff);
            assert_eq!(credential.usage_limit, 1);
            assert_eq!(credential.scoped_group_ids, scope);
        }

        for request in dest.setup_keys() {
            assert_eq!(request.kind, SetupKeyKind::OneOff);
            assert_eq!(request.usage_limit, 1);
            assert!(!request.ephemeral);
        }
    }

    #[test]
    fn test_rejection_propagates() {
        let dest = MockApi::new("https://dest.example.com/api");

        let err = provision(&dest, "k", &["ghost".to_string()], 3_600).unwrap_err();

        assert!(matches!(err, nbctl_api::Error::Api { status: 422, .. }));
    }
}
