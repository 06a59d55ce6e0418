//! Migration strategies.
//!
//! The original class-per-strategy design is collapsed into a closed enum
//! dispatched through a single `execute` entry point (see
//! `application::strategies`), so strategies cannot share hidden mutable
//! state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::MigrateError;

/// The fixed set of migration strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    SchemaOnly,
    Dump,
    Linked,
    ConvertLinked,
    Sql,
    Common,
    ExportImport,
    Acid,
    Hybrid,
    StorageMigration,
}

impl StrategyKind {
    /// Strategies that intentionally share storage between clusters; the
    /// translator returns locations for these unchanged.
    pub fn is_identity(&self) -> bool {
        matches!(self, StrategyKind::Linked | StrategyKind::Common)
    }

    /// Strategies whose planning depends on filesystem statistics.
    pub fn needs_stats(&self) -> bool {
        matches!(
            self,
            StrategyKind::Sql
                | StrategyKind::ExportImport
                | StrategyKind::Acid
                | StrategyKind::Hybrid
                | StrategyKind::StorageMigration
        )
    }

    /// Strategies that move data (as opposed to schema/location only).
    pub fn moves_data(&self) -> bool {
        matches!(
            self,
            StrategyKind::Sql
                | StrategyKind::ExportImport
                | StrategyKind::Acid
                | StrategyKind::Hybrid
                | StrategyKind::StorageMigration
        )
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::SchemaOnly => "SCHEMA_ONLY",
            StrategyKind::Dump => "DUMP",
            StrategyKind::Linked => "LINKED",
            StrategyKind::ConvertLinked => "CONVERT_LINKED",
            StrategyKind::Sql => "SQL",
            StrategyKind::Common => "COMMON",
            StrategyKind::ExportImport => "EXPORT_IMPORT",
            StrategyKind::Acid => "ACID",
            StrategyKind::Hybrid => "HYBRID",
            StrategyKind::StorageMigration => "STORAGE_MIGRATION",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for StrategyKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SCHEMA_ONLY" => Ok(StrategyKind::SchemaOnly),
            "DUMP" => Ok(StrategyKind::Dump),
            "LINKED" => Ok(StrategyKind::Linked),
            "CONVERT_LINKED" => Ok(StrategyKind::ConvertLinked),
            "SQL" => Ok(StrategyKind::Sql),
            "COMMON" => Ok(StrategyKind::Common),
            "EXPORT_IMPORT" => Ok(StrategyKind::ExportImport),
            "ACID" => Ok(StrategyKind::Acid),
            "HYBRID" => Ok(StrategyKind::Hybrid),
            "STORAGE_MIGRATION" => Ok(StrategyKind::StorageMigration),
            other => Err(MigrateError::Config(format!(
                "unknown strategy '{}'",
                other
            ))),
        }
    }
}

/// Resolves HYBRID to a concrete strategy for one table.
///
/// Transactional tables with in-place downgrade requested go through the
/// ACID path; otherwise the partition count decides between EXPORT_IMPORT
/// (small) and SQL (large).
pub fn resolve_hybrid(
    transactional: bool,
    downgrade_in_place: bool,
    partition_count: usize,
    export_import_limit: usize,
) -> StrategyKind {
    if transactional && downgrade_in_place {
        StrategyKind::Acid
    } else if partition_count <= export_import_limit {
        StrategyKind::ExportImport
    } else {
        StrategyKind::Sql
    }
}
