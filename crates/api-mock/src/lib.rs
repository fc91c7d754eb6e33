//! In-memory implementation of the management API for testing purposes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::HashSet;
use std::sync::Arc;

use nbctl_api::{
    CreateGroupRequest, CreateSetupKeyRequest, Error, Group, GroupRef, ManagementApi, Method,
    Namespace, Peer, Result, SetupKey, SetupKeySecret,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;

/// A request observed by the mock.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// HTTP method.
    pub method: Method,

    /// Request path, e.g. `/groups`.
    pub path: String,

    /// JSON body, if any.
    pub body: Option<Value>,
}

impl Call {
    /// Returns `true` for anything other than a `GET`.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.method != Method::GET
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    dropped_key_fragments: Vec<String>,
    failing_group_names: HashSet<String>,
    failing_key_fragments: Vec<String>,
    groups: Vec<Group>,
    next_id: u64,
    offline: bool,
    peers: Vec<Peer>,
    setup_keys: Vec<CreateSetupKeyRequest>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Mock account with peers, groups and setup keys held in memory.
///
/// Clones share state, so a test can keep a handle for inspection while the
/// code under test owns another.
#[derive(Clone, Debug)]
pub struct MockApi {
    namespace: Namespace,
    state: Arc<Mutex<State>>,
}

impl MockApi {
    /// Creates an empty account reachable at `endpoint`.
    ///
    /// # Panics
    ///
    /// Panics if `endpoint` is not a valid URL.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        let endpoint = Url::parse(endpoint).expect("mock endpoint must be a valid URL");

        Self {
            namespace: Namespace::new(endpoint, "mock-token"),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Adds a group with a fixed ID.
    #[must_use]
    pub fn with_group(self, id: &str, name: &str) -> Self {
        self.state.lock().groups.push(Group {
            id: id.to_string(),
            name: name.to_string(),
            ..Group::default()
        });
        self
    }

    /// Adds a peer and registers it as a member of each of its groups,
    /// creating any group not yet present.
    #[must_use]
    pub fn with_peer(self, peer: Peer) -> Self {
        {
            let mut state = self.state.lock();
            for group_ref in &peer.groups {
                match state.groups.iter_mut().find(|g| g.id == group_ref.id) {
                    Some(group) => group.peers.push(peer.id.clone()),
                    None => state.groups.push(Group {
                        id: group_ref.id.clone(),
                        name: group_ref.name.clone(),
                        peers: vec![peer.id.clone()],
                        resources: Vec::new(),
                    }),
                }
            }
            state.peers.push(peer);
        }
        self
    }

    /// Makes `POST /groups` fail for `name`.
    pub fn fail_group_creation(&self, name: &str) {
        self.state.lock().failing_group_names.insert(name.to_string());
    }

    /// Makes `POST /setup-keys` fail for any key whose name contains `fragment`.
    pub fn fail_setup_keys_containing(&self, fragment: &str) {
        self.state
            .lock()
            .failing_key_fragments
            .push(fragment.to_string());
    }

    /// Makes `POST /setup-keys` fail with a transport error for any key whose
    /// name contains `fragment`. Other requests are unaffected.
    pub fn drop_setup_keys_containing(&self, fragment: &str) {
        self.state
            .lock()
            .dropped_key_fragments
            .push(fragment.to_string());
    }

    /// Makes every request fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Every request seen so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Every non-`GET` request seen so far.
    #[must_use]
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Current groups.
    #[must_use]
    pub fn groups(&self) -> Vec<Group> {
        self.state.lock().groups.clone()
    }

    /// Bodies of every setup key created.
    #[must_use]
    pub fn setup_keys(&self) -> Vec<CreateSetupKeyRequest> {
        self.state.lock().setup_keys.clone()
    }

    fn route(state: &mut State, method: &Method, path: &str, body: Option<Value>) -> Result<Value> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["peers"]) => Ok(json!(state.peers)),
            ("GET", ["peers", id]) => state
                .peers
                .iter()
                .find(|p| p.id == *id)
                .map(|p| json!(p))
                .ok_or_else(|| not_found("peer", id)),
            ("GET", ["groups"]) => Ok(json!(state.groups)),
            ("GET", ["groups", id]) => state
                .groups
                .iter()
                .find(|g| g.id == *id)
                .map(|g| json!(g))
                .ok_or_else(|| not_found("group", id)),
            ("POST", ["groups"]) => {
                let request: CreateGroupRequest = parse_body(body)?;
                if state.failing_group_names.contains(&request.name) {
                    return Err(Error::Api {
                        status: 500,
                        message: format!("failed to create group {}", request.name),
                    });
                }

                let group = Group {
                    id: state.next_id("grp"),
                    name: request.name,
                    peers: request.peers,
                    resources: Vec::new(),
                };
                state.groups.push(group.clone());
                Ok(json!(group))
            }
            ("POST", ["setup-keys"]) => {
                let request: CreateSetupKeyRequest = parse_body(body)?;
                if state
                    .failing_key_fragments
                    .iter()
                    .any(|fragment| request.name.contains(fragment.as_str()))
                {
                    return Err(Error::Api {
                        status: 422,
                        message: format!("setup key {} rejected", request.name),
                    });
                }
                if let Some(unknown) = request
                    .auto_groups
                    .iter()
                    .find(|id| !state.groups.iter().any(|g| &g.id == *id))
                {
                    return Err(Error::Api {
                        status: 422,
                        message: format!("group {unknown} does not exist"),
                    });
                }

                let id = state.next_id("key");
                let key = SetupKey {
                    key: SetupKeySecret::new(format!("SECRET-{id}")),
                    id,
                    name: request.name.clone(),
                    kind: request.kind,
                    expires: None,
                    auto_groups: request.auto_groups.clone(),
                    usage_limit: request.usage_limit,
                };
                state.setup_keys.push(request);
                Ok(serde_json::to_value(key)?)
            }
            _ => Err(Error::Api {
                status: 404,
                message: format!("no route for {method} {path}"),
            }),
        }
    }
}

impl ManagementApi for MockApi {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut state = self.state.lock();

        state.calls.push(Call {
            method: method.clone(),
            path: path.to_string(),
            body: body.clone(),
        });

        if state.offline {
            return Err(Error::Transport(format!(
                "connection refused: {}",
                self.namespace.url_for(path)
            )));
        }

        let key_name = body
            .as_ref()
            .filter(|_| method == Method::POST && path == "/setup-keys")
            .and_then(|body| body.get("name"))
            .and_then(Value::as_str);
        if let Some(name) = key_name {
            if state
                .dropped_key_fragments
                .iter()
                .any(|fragment| name.contains(fragment.as_str()))
            {
                return Err(Error::Transport(format!(
                    "connection reset: {}",
                    self.namespace.url_for(path)
                )));
            }
        }

        Self::route(&mut state, &method, path, body)
    }
}

/// Builds a peer with the given `(id, name)` group references.
#[must_use]
pub fn peer(id: &str, hostname: &str, groups: &[(&str, &str)]) -> Peer {
    Peer {
        id: id.to_string(),
        name: hostname.to_string(),
        hostname: hostname.to_string(),
        ip: "100.64.0.1".to_string(),
        groups: groups
            .iter()
            .map(|(id, name)| GroupRef {
                id: (*id).to_string(),
                name: (*name).to_string(),
            })
            .collect(),
        os: "linux".to_string(),
        version: "0.36.0".to_string(),
    }
}

fn not_found(kind: &str, id: &str) -> Error {
    Error::Api {
        status: 404,
        message: format!("{kind} {id} not found"),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Option<Value>) -> Result<T> {
    serde_json::from_value(body.unwrap_or(Value::Null)).map_err(|e| Error::Api {
        status: 400,
        message: format!("invalid request body: {e}"),
    })
}
