//! Configuration
//!
//! [`StoreConfig`] sizes the storage engine; [`ServerConfig`] is the full
//! command-line configuration of the HTTP server.

use crate::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REPLICAS, DEFAULT_SHARDS, DEFAULT_TTL_SECS};
use clap::Parser;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Construction parameters for a [`ShardedStore`](crate::storage::ShardedStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of shards, fixed for the store's lifetime
    pub shards: usize,
    /// Replica count; recorded only, no replication is performed
    pub replicas: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            replicas: DEFAULT_REPLICAS,
        }
    }
}

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "shardkv",
    version,
    about = "shardkv: sharded in-memory key-value store over HTTP"
)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of storage shards
    #[arg(long, default_value_t = DEFAULT_SHARDS, value_parser = parse_positive::<usize>)]
    pub shards: usize,

    /// Replica count (accepted, currently has no effect)
    #[arg(long, default_value_t = DEFAULT_REPLICAS)]
    pub replicas: usize,

    /// TTL in seconds applied when a /set request carries none
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TTL_SECS, value_parser = parse_positive::<u64>)]
    pub default_ttl: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS,
            replicas: DEFAULT_REPLICAS,
            default_ttl: DEFAULT_TTL_SECS,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            shards: self.shards,
            replicas: self.replicas,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

fn parse_positive<T>(s: &str) -> Result<T, String>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    match s.parse::<T>() {
        Ok(n) if n == T::default() => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid number '{s}': {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["shardkv"]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.store_config(), StoreConfig { shards: 4, replicas: 2 });
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::try_parse_from([
            "shardkv",
            "--host",
            "127.0.0.1",
            "-p",
            "9000",
            "--shards",
            "6",
            "--replicas",
            "0",
            "--default-ttl",
            "30",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.shards, 6);
        assert_eq!(config.replicas, 0);
        assert_eq!(config.default_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_shards_rejected() {
        assert!(ServerConfig::try_parse_from(["shardkv", "--shards", "0"]).is_err());
        assert!(ServerConfig::try_parse_from(["shardkv", "--default-ttl", "0"]).is_err());
        assert!(ServerConfig::try_parse_from(["shardkv", "--shards", "many"]).is_err());
    }

    #[test]
    fn test_default_ttl_beyond_u32_seconds() {
        let config =
            ServerConfig::try_parse_from(["shardkv", "--default-ttl", "5000000000"]).unwrap();
        assert_eq!(config.default_ttl(), Duration::from_secs(5_000_000_000));
        assert_eq!(parse_positive::<u64>("5000000000"), Ok(5_000_000_000));
        assert!(parse_positive::<u64>("0").is_err());
    }
}
