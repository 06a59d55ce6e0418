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

//! # Cluster Port
//!
//! This port defines what it means to "talk to a cluster". It doesn't care
//! whether the other end is a live metastore, a recorded fixture, or a mock
//! for testing; anything implementing these traits can drive a run.

use std::collections::BTreeMap;

use crate::domain::errors::Result;
use crate::domain::side::Side;

/// One entry from a table enumeration.
#[derive(Debug, Clone)]
pub struct TableListing {
    pub name: String,
    pub is_view: bool,
}

/// A borrowed connection to one cluster.
pub trait ClusterConnection: Send {
    /// Returns the database definition (location, managed-location,
    /// properties...) or `None` when the database does not exist.
    fn fetch_database(&mut self, name: &str) -> Result<Option<BTreeMap<String, String>>>;

    /// Lists native tables and views in a database.
    fn list_tables(&mut self, database: &str) -> Result<Vec<TableListing>>;

    /// Returns the table DDL as lines, or `None` when the table is absent.
    fn fetch_ddl(&mut self, database: &str, table: &str) -> Result<Option<Vec<String>>>;

    fn fetch_owner(&mut self, database: &str, table: &str) -> Result<Option<String>>;

    /// The slower `SHOW PARTITIONS` path; names only, no locations.
    fn show_partitions(&mut self, database: &str, table: &str) -> Result<Vec<String>>;

    /// Runs an arbitrary query and returns rows of string cells. Used for
    /// the direct-metastore partition-location path.
    fn run_query(&mut self, sql: &str) -> Result<Vec<Vec<String>>>;

    /// Executes a statement for side effect.
    fn execute(&mut self, sql: &str) -> Result<()>;
}

/// Hands out connections per side.
///
/// `borrow` returning `Ok(None)` signals disconnected/dry-run mode, which
/// callers must tolerate unless live execution was explicitly required.
/// Borrowed connections are always released, including on error paths.
pub trait ClusterProvider: Send + Sync {
    fn borrow(&self, side: Side) -> Result<Option<Box<dyn ClusterConnection>>>;

    fn release(&self, side: Side, conn: Box<dyn ClusterConnection>);
}
