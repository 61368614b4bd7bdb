// file: src/endpoint.rs
// description: node endpoint parsing and REST/websocket URL derivation

use crate::error::{ListenerError, Result};
use std::fmt;
use url::Url;

/// A node's HTTP API endpoint.
///
/// The text the endpoint was created from is kept as-is so that the
/// websocket URL is a pure scheme substitution: path and query are never
/// normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    url: Url,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim().to_string();
        let url = Url::parse(&raw)?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ListenerError::UnsupportedScheme(other.to_string())),
        }

        // socket_url() rewrites the raw text, so it must spell out the authority
        if !raw
            .get(url.scheme().len()..)
            .is_some_and(|rest| rest.starts_with("://"))
        {
            return Err(ListenerError::InvalidEndpoint(raw));
        }

        Ok(Self { raw, url })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// `http(s)://host:port` becomes `ws(s)://host:port`.
    pub fn socket_url(&self) -> String {
        let (scheme, socket_scheme) = if self.is_secure() {
            ("https", "wss")
        } else {
            ("http", "ws")
        };
        // scheme() is lowercase but the raw text may not be
        format!("{}{}", socket_scheme, &self.raw[scheme.len()..])
    }

    /// Joins a REST path (e.g. `block/1`) onto the endpoint.
    pub fn rest_url(&self, path: &str) -> Result<Url> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
