//! Process configuration, read once at start.

use std::env;
use std::net::{AddrParseError, SocketAddr};

use qsleads_generation::GenerationConfig;
use qsleads_remote_store::RemoteStoreConfig;

pub const LISTEN_ADDR_ENV: &str = "QSLEADS_LISTEN_ADDR";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8088";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// `None` keeps every entity in memory for the session.
    pub store: Option<RemoteStoreConfig>,
    /// `None` disables the generation routes.
    pub generation: Option<GenerationConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AddrParseError> {
        let listen_addr = env::var(LISTEN_ADDR_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()?;
        Ok(Self {
            listen_addr,
            store: RemoteStoreConfig::from_env(),
            generation: GenerationConfig::from_env(),
        })
    }
}
