use redb::{ReadableDatabase, ReadableTable};

use super::{Db, decode, encode, tables};
use crate::error::Result;
use crate::models::AnalysisRecord;

/// Append-only store of completed analyses
///
/// Implementations are blocking; callers run them on `spawn_blocking`.
pub trait HistoryStore: Send + Sync {
    /// Persist one record
    fn append(&self, record: &AnalysisRecord) -> Result<()>;

    /// Most recent records for a user, newest first
    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<AnalysisRecord>>;
}

/// History stored in the application's redb database
#[derive(Clone)]
pub struct RedbHistory {
    db: Db,
}

impl RedbHistory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl HistoryStore for RedbHistory {
    fn append(&self, record: &AnalysisRecord) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut analyses = write_txn.open_table(tables::ANALYSES)?;
            let bytes = encode(record)?;
            analyses.insert(record.id.as_str(), bytes.as_slice())?;
            drop(analyses);

            // Anonymous analyses are stored but not indexed
            if let Some(user_id) = record.user_id.as_deref() {
                let mut user_analyses = write_txn.open_table(tables::USER_ANALYSES)?;
                let mut ids: Vec<String> = match user_analyses.get(user_id)? {
                    Some(bytes) => decode(bytes.value())?,
                    None => Vec::new(),
                };
                ids.push(record.id.clone());
                let ids_bytes = encode(&ids)?;
                user_analyses.insert(user_id, ids_bytes.as_slice())?;
            }
        }
        write_txn.commit()?;

        Ok(())
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let read_txn = self.db.begin_read()?;
        let user_analyses = read_txn.open_table(tables::USER_ANALYSES)?;
        let ids: Vec<String> = match user_analyses.get(user_id)? {
            Some(bytes) => decode(bytes.value())?,
            None => return Ok(Vec::new()),
        };

        let analyses = read_txn.open_table(tables::ANALYSES)?;
        let mut records = Vec::with_capacity(limit.min(ids.len()));
        for id in ids.iter().rev().take(limit) {
            match analyses.get(id.as_str())? {
                Some(bytes) => records.push(decode(bytes.value())?),
                None => tracing::warn!("History index points at missing analysis {}", id),
            }
        }

        Ok(records)
    }
}
