//! Helpers shared by the govchain binaries

use crate::config::{load_config, Config};
use crate::error::ChainError;
use crate::node::Node;
use crate::persistence::Database;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open the SQLite store named in `config`, creating its directory first.
pub fn open_database(config: &Config) -> Result<Database, ChainError> {
    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Database::open(&config.database.path)
}

/// Open an existing SQLite store without creating it or its directory.
/// Used by offline tools, which must not leave an empty store behind.
pub fn open_existing_database(config: &Config) -> Result<Database, ChainError> {
    let db_path = Path::new(&config.database.path);
    if !db_path.is_file() {
        return Err(ChainError::ConfigError(format!(
            "database not found: {}",
            db_path.display()
        )));
    }
    Database::open(&config.database.path)
}

pub fn open_node(config: &Config) -> Result<Node, ChainError> {
    let db = open_database(config)?;
    Node::open(Arc::new(db))
}

/// Load `config.toml` and open the node it describes.
pub fn load_node_from_config() -> Result<(Config, Node), ChainError> {
    let config = load_config()?;
    let node = open_node(&config)?;
    Ok((config, node))
}

/// Abbreviate a hex digest for table output.
pub fn short_hash(hash_hex: &str) -> String {
    if hash_hex.len() > 16 {
        format!("{}…{}", &hash_hex[..8], &hash_hex[hash_hex.len() - 8..])
    } else {
        hash_hex.to_string()
    }
}

/// Render a millisecond timestamp as RFC 3339.
pub fn format_timestamp(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
