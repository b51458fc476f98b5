use std::env;

use playground_proto::TERMINAL_PATH;
use thiserror::Error;
use url::Url;

pub const SERVER_ENV: &str = "PLAYGROUND_SERVER";
pub const DEFAULT_SERVER: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server address '{server}': {source}")]
    InvalidServer {
        server: String,
        source: url::ParseError,
    },
    #[error("unsupported scheme '{0}' (expected ws, wss, http or https)")]
    UnsupportedScheme(String),
}

/// Playground client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Execution server address; a bare `host:port` or a ws/wss/http/https URL.
    pub server: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let server = lookup(SERVER_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        Self::with_server(server)
    }

    pub fn with_server(server: impl Into<String>) -> Self {
        Self {
            server: normalize_localhost(server.into().trim()),
        }
    }

    /// Websocket URL of the execution endpoint.
    ///
    /// A URL that already names a path keeps it; otherwise the standard
    /// terminal path is appended.
    pub fn terminal_url(&self) -> Result<Url, ConfigError> {
        let scheme = match split_scheme(&self.server) {
            (Some("ws"), _) | (Some("http"), _) => "ws",
            (Some("wss"), _) | (Some("https"), _) => "wss",
            (Some(other), _) => return Err(ConfigError::UnsupportedScheme(other.to_string())),
            (None, rest) if is_loopback(rest) => "ws",
            (None, _) => "wss",
        };
        let mut url = self.parse_with_scheme(scheme)?;
        if url.path().is_empty() || url.path() == "/" {
            url.set_path(TERMINAL_PATH);
        }
        Ok(url)
    }

    /// Base URL for the HTTP collaborators on the same server.
    pub fn http_base(&self) -> Result<Url, ConfigError> {
        let scheme = match split_scheme(&self.server) {
            (Some("ws"), _) | (Some("http"), _) => "http",
            (Some("wss"), _) | (Some("https"), _) => "https",
            (Some(other), _) => return Err(ConfigError::UnsupportedScheme(other.to_string())),
            (None, rest) if is_loopback(rest) => "http",
            (None, _) => "https",
        };
        let mut url = self.parse_with_scheme(scheme)?;
        url.set_path("/");
        url.set_query(None);
        Ok(url)
    }

    fn parse_with_scheme(&self, scheme: &str) -> Result<Url, ConfigError> {
        let (_, rest) = split_scheme(&self.server);
        Url::parse(&format!("{scheme}://{rest}")).map_err(|source| ConfigError::InvalidServer {
            server: self.server.clone(),
            source,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_server(DEFAULT_SERVER)
    }
}

fn split_scheme(server: &str) -> (Option<&str>, &str) {
    match server.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, server),
    }
}

fn is_loopback(authority: &str) -> bool {
    let host = authority.split('/').next().unwrap_or(authority);
    host.starts_with("127.0.0.1") || host.starts_with("localhost") || host.starts_with("[::1]")
}

// Prefer IPv4 so a server bound to 127.0.0.1 is reachable when `localhost`
// resolves to ::1 first.
fn normalize_localhost(server: &str) -> String {
    let (scheme, rest) = split_scheme(server);
    let rest = match rest.strip_prefix("localhost") {
        Some(tail) if tail.is_empty() || tail.starts_with(':') || tail.starts_with('/') => {
            format!("127.0.0.1{tail}")
        }
        _ => rest.to_string(),
    };
    match scheme {
        Some(scheme) => format!("{scheme}://{rest}"),
        None => rest,
    }
}
