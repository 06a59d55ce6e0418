// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! File-backed checkpoint store.

use std::fs::File;
use std::path::PathBuf;

use crate::domain::errors::{MigrateError, Result};
use crate::domain::records::DatabaseRecord;
use crate::ports::checkpoint::CheckpointStore;

/// Persists the record tree as one JSON file per run key under a base
/// directory.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, run_key: &str) -> PathBuf {
        // Run keys may carry characters a filesystem dislikes.
        let safe: String = run_key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("checkpoint_{}.json", safe))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, run_key: &str, records: &[DatabaseRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let file = File::create(self.path_for(run_key))?;
        serde_json::to_writer_pretty(file, records)
            .map_err(|e| MigrateError::Checkpoint(e.to_string()))
    }

    fn load(&self, run_key: &str) -> Result<Option<Vec<DatabaseRecord>>> {
        let path = self.path_for(run_key);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let records = serde_json::from_reader(file)
            .map_err(|e| MigrateError::Checkpoint(e.to_string()))?;
        Ok(Some(records))
    }
}
