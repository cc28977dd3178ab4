//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use tracing::debug;

use super::token::generate_gateway_token;
use super::{Config, RunMode};

/// Commented default configuration written by `points-ledger init`.
///
/// `{gateway_token}` is replaced with a fresh token.
pub const DEFAULT_CONFIG: &str = r#"# points-ledger configuration
# ==========================

# HTTP server
[server]
bind = "127.0.0.1"
port = 8640
# Parallel request handlers
workers = 4
# Requests with larger bodies are rejected with 413
max_body_bytes = 65536

# Ledger database (SQLite)
[database]
# Defaults to ~/.points-ledger/ledger.db
# path = "/var/lib/points-ledger/ledger.db"

# Upstream gateway authentication
[auth]
# Shared secret the gateway sends as `X-Points-Token`.
# Leave empty to disable the check (local development only).
gateway_token = "{gateway_token}"

# Calendar used for sign-in days and monthly statistics
[calendar]
utc_offset = "+00:00"
"#;

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Default configuration text with a freshly generated gateway token
pub fn default_config_with_token() -> Result<String> {
    let token = generate_gateway_token()?;
    Ok(DEFAULT_CONFIG.replace("{gateway_token}", &token))
}

impl Config {
    /// Get the global config directory path (~/.points-ledger/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".points-ledger")
    }

    /// Get the global config file path (~/.points-ledger/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Per-mode config file under `base_dir` (`config/config.<mode>.toml`)
    pub fn mode_config_path(base_dir: &Path, mode: RunMode) -> PathBuf {
        base_dir.join("config").join(format!("config.{mode}.toml"))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Fail at load time rather than on the first sign-in
        config.calendar()?;

        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// Lookup order:
    /// 1. `explicit` (must exist)
    /// 2. `<base_dir>/config/config.<mode>.toml`
    /// 3. `~/.points-ledger/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit: Option<&Path>, mode: RunMode, base_dir: &Path) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf())));
        }

        let candidates = [Self::mode_config_path(base_dir, mode), Self::global_config_path()];
        for path in candidates {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                let config = Self::from_file(&path)?;
                return Ok((config, ConfigSource::File(path)));
            }
        }

        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Write `content` to `path` atomically.
    ///
    /// An exclusive lock on a sibling lock file serializes concurrent writers,
    /// and the temp file + rename keeps readers from seeing a partial file.
    /// Refuses to replace an existing file unless `force` is set.
    pub fn write_atomic(path: &Path, content: &str, force: bool) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        // Lock file is separate from the config so the rename cannot drop it
        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;
        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock")?;

        // Re-check under the lock: another process may have written it
        if path.exists() && !force {
            bail!(
                "Configuration already exists: {}\nUse --force to overwrite.",
                path.display()
            );
        }

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        temp_file
            .write_all(content.as_bytes())
            .with_context(|| "Failed to write config content")?;
        temp_file
            .sync_all()
            .with_context(|| "Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

        Ok(())
    }
}
