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

//! Core error definitions for the migration engine.
//!
//! This module provides a centralized `MigrateError` enum and a `Result` type
//! used throughout the application to handle configuration, cluster, and
//! translation errors.

use thiserror::Error;

/// Error types encountered during a migration run.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database '{0}' does not exist on the source cluster")]
    MissingDatabase(String),

    #[error("Location '{location}' is not under the configured source namespace '{namespace}'")]
    NamespaceMismatch { location: String, namespace: String },

    #[error("Metadata fetch failed for {object}: {reason}")]
    Metadata { object: String, reason: String },

    #[error("SQL execution failed on {side}: {reason}")]
    SqlExecution { side: String, reason: String },

    #[error("Cluster connection required but unavailable for {0}")]
    Disconnected(String),

    #[error("Phase '{phase}' failed: {reason}")]
    Phase { phase: String, reason: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Shell command failed: {0}")]
    Shell(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MigrateError {
    fn from(e: serde_json::Error) -> Self {
        MigrateError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for MigrateError {
    fn from(e: serde_yaml::Error) -> Self {
        MigrateError::Serialization(e.to_string())
    }
}

impl From<regex::Error> for MigrateError {
    fn from(e: regex::Error) -> Self {
        MigrateError::Config(format!("invalid filter pattern: {}", e))
    }
}

/// A specialized Result type for the migration engine.
pub type Result<T> = std::result::Result<T, MigrateError>;
