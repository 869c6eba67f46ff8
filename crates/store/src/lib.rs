//! Key-value backend implementations for slotboard.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileKv;
pub use in_memory::InMemoryKv;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKv;

use std::sync::Arc;

use slotboard_config::StoreConfig;
use slotboard_core::{Error, KvBackend, Result};
use tracing::info;

/// Build the configured backend.
pub async fn build_from_config(config: &StoreConfig) -> Result<Arc<dyn KvBackend>> {
    let backend: Arc<dyn KvBackend> = match config.backend.as_str() {
        // A memory map is private to its instance, so it is its own store
        "memory" => Arc::new(InMemoryKv::new()),
        "file" => Arc::new(FileKv::new(config.resolved_path(), &config.store_name)),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Config {
                    message: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
            let url = format!("sqlite://{}", path.display());
            Arc::new(SqliteKv::new(&url, &config.store_name).await?)
        }
        other => {
            return Err(Error::Config {
                message: format!("unsupported store backend '{other}'"),
            });
        }
    };

    info!(backend = backend.name(), store = %config.store_name, "Key-value backend ready");
    Ok(backend)
}
