//! Gateway token generation

use anyhow::{Result, anyhow};

const TOKEN_BYTES: usize = 32;

/// Random shared secret for the gateway, hex encoded for `config.toml`
pub fn generate_gateway_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow!("OS random source unavailable: {e}"))?;
    Ok(to_hex(&bytes))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
