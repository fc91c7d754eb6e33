use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Lightweight group reference attached to a peer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Namespace-local group ID.
    pub id: String,

    /// Group name.
    pub name: String,
}

/// A registered device.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    /// Namespace-local peer ID.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Hostname reported by the agent.
    #[serde(default)]
    pub hostname: String,

    /// Overlay IP address.
    #[serde(default)]
    pub ip: String,

    /// Groups the peer belongs to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<GroupRef>,

    /// Operating system.
    #[serde(default)]
    pub os: String,

    /// Agent version.
    #[serde(default)]
    pub version: String,
}

impl Peer {
    /// The hostname, falling back to the display name when the agent never
    /// reported one.
    #[must_use]
    pub fn display_hostname(&self) -> &str {
        if self.hostname.is_empty() {
            &self.name
        } else {
            &self.hostname
        }
    }
}

/// A full group as returned by `GET /groups` and `GET /groups/{id}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Namespace-local group ID.
    pub id: String,

    /// Group name.
    pub name: String,

    /// IDs of member peers.
    #[serde(default, deserialize_with = "member_ids")]
    pub peers: Vec<String>,

    /// Attached network resources, passed through untouched.
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<serde_json::Value>,
}

/// Body of `POST /groups`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    /// Name of the new group.
    pub name: String,

    /// Initial members.
    pub peers: Vec<String>,
}

/// Setup key usage model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SetupKeyKind {
    /// Valid for a limited number of registrations.
    #[serde(rename = "one-off")]
    OneOff,

    /// Valid until it expires or is revoked.
    #[serde(rename = "reusable")]
    Reusable,
}

impl fmt::Display for SetupKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOff => write!(f, "one-off"),
            Self::Reusable => write!(f, "reusable"),
        }
    }
}

/// Body of `POST /setup-keys`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreateSetupKeyRequest {
    /// Operator-facing key name.
    pub name: String,

    /// Usage model.
    #[serde(rename = "type")]
    pub kind: SetupKeyKind,

    /// Lifetime in seconds.
    pub expires_in: u64,

    /// Groups a peer registered with this key is placed in.
    pub auto_groups: Vec<String>,

    /// Maximum number of registrations; `0` means unlimited.
    pub usage_limit: u32,

    /// Whether peers registered with this key are removed when offline.
    pub ephemeral: bool,
}

impl CreateSetupKeyRequest {
    /// A key that registers exactly one non-ephemeral peer.
    #[must_use]
    pub const fn single_use(name: String, expires_in: u64, auto_groups: Vec<String>) -> Self {
        Self {
            name,
            kind: SetupKeyKind::OneOff,
            expires_in,
            auto_groups,
            usage_limit: 1,
            ephemeral: false,
        }
    }
}

/// Plaintext setup key. Only returned once, at creation.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetupKeySecret(String);

impl SetupKeySecret {
    /// Wraps a plaintext key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The plaintext key, for handing to the operator.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SetupKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetupKeySecret([redacted])")
    }
}

/// Response of `POST /setup-keys`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetupKey {
    /// Key ID.
    pub id: String,

    /// Plaintext key.
    pub key: SetupKeySecret,

    /// Key name.
    pub name: String,

    /// Usage model.
    #[serde(rename = "type")]
    pub kind: SetupKeyKind,

    /// Expiry timestamp as reported by the service.
    #[serde(default)]
    pub expires: Option<String>,

    /// Groups attached to registered peers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub auto_groups: Vec<String>,

    /// Maximum number of registrations.
    #[serde(default)]
    pub usage_limit: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Group members arrive either as bare IDs or as `{id, name}` objects.
fn member_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Member {
        Id(String),
        Minimal { id: String },
    }

    let members: Option<Vec<Member>> = Option::deserialize(deserializer)?;

    Ok(members
        .unwrap_or_default()
        .into_iter()
        .map(|member| match member {
            Member::Id(id) | Member::Minimal { id } => id,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_accepts_both_member_shapes() {
        let ids: Group = serde_json::from_value(json!({
            "id": "g1",
            "name": "eng",
            "peers": ["p1", "p2"],
        }))
        .unwrap();

        let objects: Group = serde_json::from_value(json!({
            "id": "g1",
            "name": "eng",
            "peers": [{"id": "p1", "name": "laptop"}, {"id": "p2", "name": "desktop"}],
            "resources": null,
        }))
        .unwrap();

        assert_eq!(ids.peers, vec!["p1", "p2"]);
        assert_eq!(objects.peers, ids.peers);
        assert!(objects.resources.is_empty());
    }

    #[test]
    fn test_peer_tolerates_missing_fields() {
        let peer: Peer = serde_json::from_value(json!({
            "id": "p1",
            "name": "laptop",
            "groups": null,
        }))
        .unwrap();

        assert!(peer.groups.is_empty());
        assert_eq!(peer.display_hostname(), "laptop");
    }

    #[test]
    fn test_single_use_request_wire_shape() {
        let request =
            CreateSetupKeyRequest::single_use("migrate-laptop".to_string(), 86400, vec![
                "g1".to_string(),
            ]);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "migrate-laptop",
                "type": "one-off",
                "expires_in": 86400,
                "auto_groups": ["g1"],
                "usage_limit": 1,
                "ephemeral": false,
            })
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SetupKeySecret::new("A1B2-C3D4");
        assert!(!format!("{secret:?}").contains("A1B2"));
        assert_eq!(secret.expose(), "A1B2-C3D4");
    }
}
