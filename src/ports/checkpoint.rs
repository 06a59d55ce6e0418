//! Checkpoint store port.
//!
//! Persists the record tree between runs so a rerun can skip tables that
//! already completed. Any implementation satisfying this contract works:
//! a flat file, an embedded KV store, a relational table.

use crate::domain::errors::Result;
use crate::domain::records::DatabaseRecord;

pub trait CheckpointStore: Send + Sync {
    fn save(&self, run_key: &str, records: &[DatabaseRecord]) -> Result<()>;

    fn load(&self, run_key: &str) -> Result<Option<Vec<DatabaseRecord>>>;
}
