//! Settings sections of the configuration file

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind (default: 127.0.0.1)
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on (default: 8640)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Worker threads handling requests in parallel (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest accepted request body; larger requests get 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8640
}

fn default_workers() -> usize {
    4
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl ServerSettings {
    /// `host:port` the server listens on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            workers: default_workers(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Ledger database settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; defaults to `~/.points-ledger/ledger.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Gateway authentication settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Shared secret the gateway sends as `X-Points-Token`.
    ///
    /// If empty, the server accepts requests without it (local development only).
    #[serde(default)]
    pub gateway_token: String,
}

/// Reference calendar for sign-in days and monthly statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Fixed UTC offset such as "+08:00" (default: "+00:00")
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}
