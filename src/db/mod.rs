pub mod accounts;
pub mod history;
pub mod tables;

use redb::{Database, Error as RedbError};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

pub use history::{HistoryStore, RedbHistory};

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> std::result::Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                RedbError::Io(e)
            })?;
        }
    }

    let db = Database::create(path)?;

    // Initialize tables on first run
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::USERS)?;
        let _ = write_txn.open_table(tables::USERS_BY_EMAIL)?;
        let _ = write_txn.open_table(tables::SESSIONS)?;
        let _ = write_txn.open_table(tables::USAGE)?;
        let _ = write_txn.open_table(tables::ANALYSES)?;
        let _ = write_txn.open_table(tables::USER_ANALYSES)?;
        let _ = write_txn.open_table(tables::STRIPE_CUSTOMERS)?;
    }
    write_txn.commit()?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Serialize a record for storage
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?)
}

/// Deserialize a stored record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(value)
}
