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

//! The migration record model.
//!
//! `DatabaseRecord` owns its `TableRecord`s by value; each `TableRecord`
//! owns one `EnvironmentView` per logical side. Views identify themselves
//! through (table, side) keys rather than back-pointers, so the whole tree
//! serializes cleanly for checkpoints and reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::phase::PhaseState;
use crate::domain::side::Side;
use crate::domain::strategy::StrategyKind;

/// Sentinel used as a partition map value when only partition *names* were
/// retrievable (the faster metadata path). Never present after a successful
/// location-bearing partition load.
pub const NOT_SET: &str = "NOT_SET";

/// Filesystem statistics for one table on one side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableStats {
    pub files: u64,
    pub dirs: u64,
    pub data_size: u64,
    pub avg_file_size: f64,
    pub empty: bool,
    /// False until a stats collection actually succeeded.
    pub loaded: bool,
}

impl TableStats {
    pub fn from_counts(dirs: u64, files: u64, data_size: u64) -> Self {
        let avg_file_size = if files > 0 {
            data_size as f64 / files as f64
        } else {
            0.0
        };
        Self {
            files,
            dirs,
            data_size,
            avg_file_size,
            empty: files == 0,
            loaded: true,
        }
    }
}

/// One generated SQL statement with a human-readable description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlPair {
    pub description: String,
    pub statement: String,
}

impl SqlPair {
    pub fn new(description: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            statement: statement.into(),
        }
    }
}

/// One entry in a table's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub at: String,
    pub name: String,
    pub action: String,
}

/// Everything known about one table on one logical side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentView {
    pub exists: bool,
    pub ddl: Vec<String>,
    pub owner: Option<String>,
    /// Base storage location, parsed out of the DDL.
    pub location: Option<String>,
    /// Partition spec string -> location string. Values are `NOT_SET` when
    /// only names could be fetched.
    pub partitions: BTreeMap<String, String>,
    pub stats: TableStats,
    pub sql: Vec<SqlPair>,
    pub cleanup_sql: Vec<SqlPair>,
    pub issues: Vec<String>,
    pub errors: Vec<String>,
}

impl EnvironmentView {
    pub fn add_sql(&mut self, description: impl Into<String>, statement: impl Into<String>) {
        self.sql.push(SqlPair::new(description, statement));
    }

    pub fn add_cleanup_sql(&mut self, description: impl Into<String>, statement: impl Into<String>) {
        self.cleanup_sql.push(SqlPair::new(description, statement));
    }

    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record partition names from the fast path; locations stay `NOT_SET`.
    pub fn set_partition_names(&mut self, names: Vec<String>) {
        self.partitions = names
            .into_iter()
            .map(|n| (n, NOT_SET.to_string()))
            .collect();
    }

    /// Record full partition spec -> location pairs from the direct
    /// metastore path.
    pub fn set_partition_locations(&mut self, locations: BTreeMap<String, String>) {
        self.partitions = locations;
    }
}

/// One table being migrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    pub name: String,
    pub strategy: Option<StrategyKind>,
    pub phase: PhaseState,
    pub steps: Vec<Step>,
    /// Excluded tables are flagged, never deleted from the record.
    pub removed: bool,
    pub remove_reason: Option<String>,
    /// Location was rewritten by a non-identity rule.
    pub remapped: bool,
    /// Automatic execution was disabled (e.g. partition limit exceeded);
    /// the generated SQL must be run by the operator.
    pub manual_only: bool,
    pub duration_secs: f64,
    pub environments: BTreeMap<Side, EnvironmentView>,
}

impl TableRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(Side::Left, EnvironmentView::default());
        environments.insert(Side::Right, EnvironmentView::default());
        Self {
            name: name.into(),
            strategy: None,
            phase: PhaseState::Init,
            steps: Vec::new(),
            removed: false,
            remove_reason: None,
            remapped: false,
            manual_only: false,
            duration_secs: 0.0,
            environments,
        }
    }

    pub fn env(&self, side: Side) -> Option<&EnvironmentView> {
        self.environments.get(&side)
    }

    pub fn env_mut(&mut self, side: Side) -> &mut EnvironmentView {
        self.environments.entry(side).or_default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, action: impl Into<String>) {
        self.steps.push(Step {
            at: chrono::Local::now().to_rfc3339(),
            name: name.into(),
            action: action.into(),
        });
    }

    /// Flag the table out of processing with a human-readable reason. The
    /// record stays visible in reports.
    pub fn mark_removed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.removed = true;
        self.remove_reason = Some(reason.clone());
        self.add_step("filter", reason);
    }

    /// Advance the phase if the transition is legal; returns whether it
    /// happened. Only the orchestrator calls this.
    pub fn advance(&mut self, next: PhaseState) -> bool {
        if self.phase.can_advance(next) {
            self.phase = next;
            true
        } else {
            false
        }
    }

    /// Whether the table is transactional (ACID), judged from the LEFT DDL.
    pub fn is_transactional(&self) -> bool {
        self.env(Side::Left)
            .map(|e| {
                e.ddl.iter().any(|line| {
                    let l = line.replace(' ', "").to_lowercase();
                    l.contains("'transactional'='true'")
                })
            })
            .unwrap_or(false)
    }

    /// Whether the table is external, judged from the LEFT DDL header.
    pub fn is_external(&self) -> bool {
        self.env(Side::Left)
            .map(|e| {
                e.ddl
                    .iter()
                    .any(|line| line.to_uppercase().contains("CREATE EXTERNAL TABLE"))
            })
            .unwrap_or(false)
    }

    pub fn partition_count(&self) -> usize {
        self.env(Side::Left).map(|e| e.partitions.len()).unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.environments.values().any(|e| !e.errors.is_empty())
    }

    pub fn has_issues(&self) -> bool {
        self.environments.values().any(|e| !e.issues.is_empty())
    }
}

/// One database being migrated, with per-side definition maps and the
/// tables discovered under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub name: String,
    pub definitions: BTreeMap<Side, BTreeMap<String, String>>,
    pub tables: BTreeMap<String, TableRecord>,
    pub issues: BTreeMap<Side, Vec<String>>,
    /// Database-level DDL (CREATE DATABASE ...) per side.
    pub sql: BTreeMap<Side, Vec<SqlPair>>,
}

impl DatabaseRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: BTreeMap::new(),
            tables: BTreeMap::new(),
            issues: BTreeMap::new(),
            sql: BTreeMap::new(),
        }
    }

    pub fn add_sql(
        &mut self,
        side: Side,
        description: impl Into<String>,
        statement: impl Into<String>,
    ) {
        self.sql
            .entry(side)
            .or_default()
            .push(SqlPair::new(description, statement));
    }

    pub fn set_definition(&mut self, side: Side, definition: BTreeMap<String, String>) {
        self.definitions.insert(side, definition);
    }

    pub fn definition(&self, side: Side) -> Option<&BTreeMap<String, String>> {
        self.definitions.get(&side)
    }

    /// Fetch-or-create a table record.
    pub fn table_mut(&mut self, name: &str) -> &mut TableRecord {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| TableRecord::new(name))
    }

    pub fn add_issue(&mut self, side: Side, issue: impl Into<String>) {
        self.issues.entry(side).or_default().push(issue.into());
    }

    pub fn tables_in_phase(&self, phase: PhaseState) -> usize {
        self.tables.values().filter(|t| t.phase == phase).count()
    }

    /// Tables eligible for the transfer phase.
    pub fn active_tables(&self) -> impl Iterator<Item = &TableRecord> {
        self.tables
            .values()
            .filter(|t| !t.removed && !t.phase.is_terminal())
    }
}
