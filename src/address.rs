//! Store addresses
//!
//! Parses `<scheme>://<host>[:<port>]/<database>` URIs and performs the
//! optional local-host substitution.

use std::fmt;

use url::Url;

use crate::error::{DocKvError, Result};

/// Default port used when substituting the local host
pub const DEFAULT_PORT: u16 = 27017;

/// Scheme assumed when a bare database name is rewritten
pub const DEFAULT_SCHEME: &str = "dockv";

/// A parsed backing-store address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddress {
    /// Backend selector (`memory`, `dockv`, ...)
    pub scheme: String,

    /// Host name, `localhost` when the URI leaves it empty
    pub host: String,

    /// Explicit port, if any
    pub port: Option<u16>,

    /// Database segment (path without surrounding separators)
    pub database: String,
}

impl StoreAddress {
    /// Parse a store URI
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| DocKvError::Config(format!("Invalid store URI '{}': {}", uri, e)))?;

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => "localhost".to_string(),
        };

        let database = url.path().trim_matches('/').to_string();
        if database.is_empty() {
            return Err(DocKvError::Config(format!(
                "Store URI '{}' has no database segment",
                uri
            )));
        }
        if database.contains('/') {
            return Err(DocKvError::Config(format!(
                "Store URI '{}' has a nested database path",
                uri
            )));
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            database,
        })
    }

    /// True if the host names this machine
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1" | "[::1]")
            || self.host.eq_ignore_ascii_case(&local_hostname())
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}/{}", self.scheme, self.host, port, self.database),
            None => write!(f, "{}://{}/{}", self.scheme, self.host, self.database),
        }
    }
}

/// Rewrite `uri` to target `hostname` on [`DEFAULT_PORT`]
///
/// Strips the existing `scheme://host/` prefix and trailing separators and
/// keeps the database segment. A bare database name (no scheme) gets
/// [`DEFAULT_SCHEME`].
pub fn substitute_local_host(uri: &str, hostname: &str) -> String {
    let (scheme, rest) = match uri.split_once("://") {
        Some((scheme, rest)) => {
            // Drop the host portion
            let path = rest.split_once('/').map(|(_, path)| path).unwrap_or("");
            (scheme, path)
        }
        None => (DEFAULT_SCHEME, uri),
    };

    let database = rest.trim_matches('/');
    format!("{}://{}:{}/{}", scheme, hostname, DEFAULT_PORT, database)
}

/// Resolve the current machine's hostname
///
/// Falls back to `localhost` when the system cannot report one.
pub fn local_hostname() -> String {
    system_hostname()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => Some(name.to_string_lossy().into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "gethostname failed");
            None
        }
    }
}

#[cfg(windows)]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(not(any(unix, windows)))]
fn system_hostname() -> Option<String> {
    None
}
