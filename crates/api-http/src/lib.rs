//! Blocking HTTP implementation of the management API.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::time::Duration;

use nbctl_api::{Error, ManagementApi, Method, Namespace, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Management API client bound to one namespace.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    namespace: Namespace,
}

impl HttpClient {
    /// Creates a client for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the TLS backend cannot be initialised.
    pub fn new(namespace: Namespace) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("nbctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { client, namespace })
    }
}

impl ManagementApi for HttpClient {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.namespace.url_for(path);
        debug!(%method, %url, "sending request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Token {}", self.namespace.token()))
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .map_err(|e| Error::Transport(format!("{method} {url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Transport(format!("{method} {url}: {e}")))?;

        if !status.is_success() {
            let message = Error::message_from_body(&text);
            debug!(%method, %url, status = status.as_u16(), "request rejected: {}", message);

            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use url::Url;

    /// Serves one canned response and hands back the raw request.
    fn serve_once(status_line: &str, body: &str) -> (Url, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut content_length = 0;

            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }

            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8_lossy(&body));

            let mut stream = stream;
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(request).unwrap();
        });

        (Url::parse(&format!("http://127.0.0.1:{port}/api")).unwrap(), rx)
    }

    fn client(endpoint: Url) -> HttpClient {
        HttpClient::new(Namespace::new(endpoint, "nbp_test_token")).unwrap()
    }

    #[test]
    fn test_sends_token_and_decodes_body() {
        let (endpoint, rx) = serve_once("200 OK", r#"[{"id":"g1","name":"eng","peers":[]}]"#);

        let groups = client(endpoint).list_groups().unwrap();
        let request = rx.recv().unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "eng");
        assert!(request.starts_with("GET /api/groups HTTP/1.1"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: token nbp_test_token")
        );
    }

    #[test]
    fn test_posts_json_body() {
        let (endpoint, rx) = serve_once("200 OK", r#"{"id":"g9","name":"ops","peers":[]}"#);

        let group = client(endpoint).create_group("ops").unwrap();
        let request = rx.recv().unwrap();

        assert_eq!(group.id, "g9");
        assert!(request.starts_with("POST /api/groups HTTP/1.1"));
        assert!(request.contains(r#"{"name":"ops","peers":[]}"#));
    }

    #[test]
    fn test_non_success_maps_to_api_error() {
        let (endpoint, _rx) =
            serve_once("404 Not Found", r#"{"message":"peer not found","code":404}"#);

        let err = client(endpoint).get_peer("missing").unwrap_err();

        assert_matches!(
            err,
            Error::Api { status: 404, ref message } if message == "peer not found"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = Url::parse(&format!("http://127.0.0.1:{port}/api")).unwrap();

        let err = client(endpoint).list_peers().unwrap_err();

        assert_matches!(err, Error::Transport(_));
    }

    #[test]
    fn test_empty_body_is_null() {
        let (endpoint, _rx) = serve_once("200 OK", "");

        let value = client(endpoint)
            .request(Method::DELETE, "/peers/p1", None)
            .unwrap();

        assert_eq!(value, Value::Null);
    }
}
