//! Init command implementation

use std::path::PathBuf;

use anyhow::Result;

use points_ledger::config::{Config, default_config_with_token};

/// Write a commented default configuration with a fresh gateway token.
///
/// Defaults to `~/.points-ledger/config.toml`; `--config` picks another path.
pub fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Config::global_config_path);

    let content = default_config_with_token()?;
    Config::write_atomic(&config_path, &content, force)?;

    println!("Created: {}", config_path.display());
    println!("Gateway token written to [auth].gateway_token; share it with the gateway only.");
    Ok(())
}
