//! Oracle configuration

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{eyre, Result};

use crate::completion::DEFAULT_MAX_CONCURRENT_QUERIES;

/// Reserved address of the bridging contract on the side chain
pub const DEFAULT_BRIDGE_ADDRESS: &str = "0x0000000000000000000000000000000000000064";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 20632;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone)]
pub struct Config {
    /// Side-chain node JSON-RPC endpoint
    pub sidechain_rpc_url: String,
    /// Bridging contract address
    pub bridge_address: Address,
    /// Signer for `Recharge` and `refundWithdraw`. Without it those
    /// submissions fail; everything else still works.
    pub private_key: Option<String>,

    pub bind_address: String,
    pub port: u16,

    /// Per-call transport timeout of the chain client
    pub rpc_timeout_ms: u64,
    /// Fan-out bound for batch completion queries
    pub max_concurrent_queries: usize,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sidechain_rpc_url", &self.sidechain_rpc_url)
            .field("bridge_address", &self.bridge_address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("rpc_timeout_ms", &self.rpc_timeout_ms)
            .field("max_concurrent_queries", &self.max_concurrent_queries)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment, reading `.env` first if present
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    /// Build from process environment only
    pub fn from_env() -> Result<Self> {
        let sidechain_rpc_url = env::var("SIDECHAIN_RPC_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| eyre!("SIDECHAIN_RPC_URL required"))?;

        let bridge_address = env::var("BRIDGE_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_BRIDGE_ADDRESS.to_string());
        let bridge_address = Address::from_str(bridge_address.trim())
            .map_err(|e| eyre!("Invalid BRIDGE_ADDRESS {}: {}", bridge_address, e))?;

        let private_key = env::var("ORACLE_PRIVATE_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let max_concurrent_queries: usize =
            parse_var("MAX_CONCURRENT_QUERIES", DEFAULT_MAX_CONCURRENT_QUERIES)?;
        if max_concurrent_queries == 0 {
            return Err(eyre!("Invalid MAX_CONCURRENT_QUERIES: must be at least 1"));
        }

        let rpc_timeout_ms: u64 = parse_var("RPC_TIMEOUT_MS", DEFAULT_RPC_TIMEOUT_MS)?;
        if rpc_timeout_ms == 0 {
            return Err(eyre!("Invalid RPC_TIMEOUT_MS: must be positive"));
        }

        Ok(Self {
            sidechain_rpc_url,
            bridge_address,
            private_key,
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            port: parse_var("ORACLE_PORT", DEFAULT_PORT)?,
            rpc_timeout_ms,
            max_concurrent_queries,
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

/// Optional variable with a default; present but unparseable is an error
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid {} {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
