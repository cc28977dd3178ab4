//! Configuration loading and management
//!
//! The configuration is an explicit value passed to constructors; nothing
//! reads it from global state.

mod io;
mod settings;
mod token;

pub use io::{ConfigSource, DEFAULT_CONFIG, default_config_with_token};
pub use settings::{AuthSettings, CalendarSettings, DatabaseSettings, ServerSettings};
pub use token::generate_gateway_token;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::progression::Calendar;

/// Deployment mode selecting `config/config.<mode>.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    #[default]
    Dev,
    Prod,
    Docker,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Dev => "dev",
            RunMode::Prod => "prod",
            RunMode::Docker => "docker",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub calendar: CalendarSettings,
}

impl Config {
    /// Database file, falling back to `~/.points-ledger/ledger.db`
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("ledger.db"))
    }

    /// Reference calendar built from `[calendar].utc_offset`
    pub fn calendar(&self) -> Result<Calendar> {
        let raw = self.calendar.utc_offset.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("utc") || raw == "Z" {
            return Ok(Calendar::utc());
        }
        let offset: FixedOffset = raw
            .parse()
            .with_context(|| format!("Invalid calendar.utc_offset: {raw:?} (expected e.g. \"+08:00\")"))?;
        Ok(Calendar::new(offset))
    }
}
