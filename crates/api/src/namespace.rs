use std::fmt;

use url::Url;

/// Base URL of the public management service.
pub const DEFAULT_API_URL: &str = "https://api.netbird.io/api";

/// An independently administered account: a REST endpoint and the token that
/// authenticates against it.
///
/// Identifiers returned by one namespace mean nothing in another.
#[derive(Clone, Eq, PartialEq)]
pub struct Namespace {
    endpoint: Url,
    token: String,
}

impl Namespace {
    /// Creates a namespace bound to `endpoint` and authenticated with `token`.
    #[must_use]
    pub fn new(endpoint: Url, token: impl Into<String>) -> Self {
        Self {
            endpoint,
            token: token.into(),
        }
    }

    /// The REST base endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The bearer token. Never log this.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute URL for an API path such as `/groups`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns `true` when the endpoint is the public service.
    #[must_use]
    pub fn is_default_endpoint(&self) -> bool {
        self.endpoint.as_str().trim_end_matches('/') == DEFAULT_API_URL
    }

    /// The address an agent connects to, derived from the REST endpoint by
    /// dropping a trailing `/api` segment.
    #[must_use]
    pub fn management_url(&self) -> String {
        let base = self.endpoint.as_str().trim_end_matches('/');
        base.strip_suffix("/api").unwrap_or(base).to_string()
    }

    /// Returns `true` if both namespaces point at the same endpoint.
    #[must_use]
    pub fn shares_endpoint_with(&self, other: &Self) -> bool {
        let base = |ns: &Self| ns.endpoint.as_str().trim_end_matches('/').to_owned();
        base(self) == base(other)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace(url: &str) -> Namespace {
        Namespace::new(Url::parse(url).unwrap(), "nbp_secret")
    }

    #[test]
    fn test_url_for_joins_paths() {
        let ns = namespace("https://mgmt.example.com/api/");
        assert_eq!(ns.url_for("/groups"), "https://mgmt.example.com/api/groups");
        assert_eq!(ns.url_for("peers/p1"), "https://mgmt.example.com/api/peers/p1");
    }

    #[test]
    fn test_default_endpoint_detection() {
        assert!(namespace(DEFAULT_API_URL).is_default_endpoint());
        assert!(namespace("https://api.netbird.io/api/").is_default_endpoint());
        assert!(!namespace("https://mgmt.example.com/api").is_default_endpoint());
    }

    #[test]
    fn test_management_url_strips_api_segment() {
        assert_eq!(
            namespace("https://mgmt.example.com:33073/api").management_url(),
            "https://mgmt.example.com:33073"
        );
        assert_eq!(
            namespace("https://mgmt.example.com/").management_url(),
            "https://mgmt.example.com"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", namespace("https://mgmt.example.com/api"));
        assert!(!rendered.contains("nbp_secret"));
        assert!(rendered.contains("redacted"));
    }
}
