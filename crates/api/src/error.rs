use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a `ManagementApi` implementation.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,

        /// Message reported by the service, or the raw body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl Error {
    /// Returns `true` if the service reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Extracts a human-readable message from an error response body.
    ///
    /// The service answers errors with `{"message": "...", "code": N}`; anything
    /// else is passed through trimmed.
    #[must_use]
    pub fn message_from_body(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return "no response body".to_string();
        }

        serde_json::from_str::<serde_json::Value>(trimmed)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| trimmed.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
