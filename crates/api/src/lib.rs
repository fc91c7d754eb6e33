//! Abstract interface to a network-management REST API scoped to a single account.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod namespace;
mod types;

pub use error::{Error, Result};
pub use namespace::{DEFAULT_API_URL, Namespace};
pub use types::*;

pub use http::Method;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Authenticated accessor bound to one namespace.
///
/// Implementors only provide [`ManagementApi::request`]; the typed helpers
/// issue exactly one request each.
pub trait ManagementApi {
    /// The namespace this client is bound to.
    fn namespace(&self) -> &Namespace;

    /// Issues one request and returns the decoded JSON body (`Value::Null` for
    /// an empty body).
    ///
    /// # Errors
    ///
    /// `Error::Transport` if no response was received, `Error::Api` for a
    /// non-2xx status, `Error::Decode` if the body is not JSON.
    fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;

    /// `GET /peers`
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    fn list_peers(&self) -> Result<Vec<Peer>> {
        decode(self.request(Method::GET, "/peers", None)?)
    }

    /// `GET /peers/{id}`
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures; a missing peer is an
    /// `Error::Api` with status 404.
    fn get_peer(&self, id: &str) -> Result<Peer> {
        decode(self.request(Method::GET, &format!("/peers/{id}"), None)?)
    }

    /// `GET /groups`
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    fn list_groups(&self) -> Result<Vec<Group>> {
        decode(self.request(Method::GET, "/groups", None)?)
    }

    /// `GET /groups/{id}`
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    fn get_group(&self, id: &str) -> Result<Group> {
        decode(self.request(Method::GET, &format!("/groups/{id}"), None)?)
    }

    /// `POST /groups` with no initial members.
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    fn create_group(&self, name: &str) -> Result<Group> {
        let body = serde_json::to_value(CreateGroupRequest {
            name: name.to_string(),
            peers: Vec::new(),
        })?;
        decode(self.request(Method::POST, "/groups", Some(body))?)
    }

    /// `POST /setup-keys`
    ///
    /// # Errors
    ///
    /// Propagates request and decode failures.
    fn create_setup_key(&self, request: &CreateSetupKeyRequest) -> Result<SetupKey> {
        let body = serde_json::to_value(request)?;
        decode(self.request(Method::POST, "/setup-keys", Some(body))?)
    }
}

impl<T: ManagementApi + ?Sized> ManagementApi for &T {
    fn namespace(&self) -> &Namespace {
        (**self).namespace()
    }

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        (**self).request(method, path, body)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(Error::from)
}
