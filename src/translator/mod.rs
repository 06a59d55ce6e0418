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

//! Location translation.
//!
//! Computes, for every table and partition, the target storage location
//! under the new namespace/warehouse layout: ordered prefix remaps first,
//! then warehouse-directory policy, then the per-strategy default. Every
//! non-SQL translation is recorded into the location history when bulk-copy
//! planning is enabled, so copy plans can be consolidated later.

pub mod copy_plan;
pub mod history;

use std::collections::BTreeMap;

use crate::config::{AppConfig, DataFlow};
use crate::domain::errors::{MigrateError, Result};
use crate::domain::records::NOT_SET;
use crate::domain::side::Side;
use crate::domain::strategy::StrategyKind;
use crate::translator::history::{LocationHistory, LocationHistoryEntry};

/// Result of translating one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub location: String,
    /// True when an ordered global-location-map rule rewrote the path.
    pub remapped: bool,
}

/// Outcome of translating a table's full partition set.
#[derive(Debug, Clone, Default)]
pub struct PartitionTranslation {
    /// Partition spec -> translated location.
    pub locations: BTreeMap<String, String>,
    pub issues: Vec<String>,
    /// Partitions whose recorded location could not be translated; feeds
    /// drift accounting.
    pub untranslated: usize,
    pub any_remapped: bool,
}

/// Pure decision logic over the configuration snapshot plus per-table
/// location strings. Does not mutate records; callers apply the returned
/// issues themselves.
pub struct Translator {
    config: AppConfig,
    history: LocationHistory,
}

impl Translator {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            history: LocationHistory::new(),
        }
    }

    pub fn history(&self) -> &LocationHistory {
        &self.history
    }

    /// Which side's copy plan a history entry belongs to: the side that
    /// will actually run the bulk-copy job.
    pub fn history_side(&self) -> Side {
        if self.config.transfer.intermediate_storage.is_some() {
            Side::Left
        } else if self.config.transfer.common_storage.is_some() {
            Side::Right
        } else {
            match self.config.transfer.data_flow {
                DataFlow::Pull => Side::Right,
                DataFlow::Push => Side::Left,
            }
        }
    }

    /// Applies the ordered global-location-map to a relative directory.
    ///
    /// The FIRST matching prefix wins and only its leading occurrence is
    /// replaced. A later, more specific prefix can never win if an earlier,
    /// shorter prefix also matches; that ordering dependency is observed
    /// behavior and is kept as-is.
    pub fn map_global_location(&self, relative_dir: &str) -> String {
        for rule in &self.config.options.global_location_map {
            if relative_dir.starts_with(rule.from.as_str()) {
                return relative_dir.replacen(rule.from.as_str(), rule.to.as_str(), 1);
            }
        }
        relative_dir.to_string()
    }

    /// Translates one location for a table (or one of its partitions when
    /// `partition_spec` is set).
    pub fn translate(
        &self,
        database: &str,
        table: &str,
        original: &str,
        consolidation_level: usize,
        partition_spec: Option<&str>,
    ) -> Result<Translated> {
        let left_ns = self.config.left.namespace.as_str();
        let right_ns = self.config.right.namespace.as_str();
        let strategy = self.config.strategy;

        // A location outside the known source namespace cannot be trusted.
        if !original.starts_with(left_ns) {
            return Err(MigrateError::NamespaceMismatch {
                location: original.to_string(),
                namespace: left_ns.to_string(),
            });
        }

        let relative_dir = &original[left_ns.len()..];
        let mapped_dir = self.map_global_location(relative_dir);
        let remapped = mapped_dir != relative_dir;

        // Storage migration inside a single namespace with no remap rule
        // and no reset would silently change nothing; fail loudly instead.
        if !remapped
            && strategy == StrategyKind::StorageMigration
            && right_ns == left_ns
            && !self.config.warehouse.reset_to_default_location
        {
            return Err(MigrateError::Config(format!(
                "location '{}' was not remapped and the target namespace equals the source; \
                 add a global location map rule or request reset-to-default-location",
                original
            )));
        }

        let base = self
            .config
            .transfer
            .common_storage
            .as_deref()
            .unwrap_or(right_ns);

        let new_location = if remapped {
            format!("{}{}", base, mapped_dir)
        } else if self.config.warehouse.reset_to_default_location
            && self.config.warehouse.external_dir_for(database).is_some()
        {
            let dir = self
                .config
                .warehouse
                .external_dir_for(database)
                .unwrap_or_default();
            let mut loc = format!("{}{}/{}.db/{}", base, dir, database, table);
            if let Some(spec) = partition_spec {
                loc.push('/');
                loc.push_str(spec);
            }
            loc
        } else if strategy.is_identity() {
            // LINKED / COMMON intentionally share storage.
            original.to_string()
        } else {
            format!("{}{}", right_ns, relative_dir)
        };

        if self.config.transfer.distcp && strategy != StrategyKind::Sql {
            self.history.record(LocationHistoryEntry {
                database: database.to_string(),
                side: self.history_side(),
                original: original.to_string(),
                translated: new_location.clone(),
                level: consolidation_level,
            });
        }

        Ok(Translated {
            location: new_location,
            remapped,
        })
    }

    /// Translates a database-level location (LOCATION / MANAGEDLOCATION in
    /// the database definition). Same namespace and remap rules as table
    /// locations, but no warehouse-reset or history involvement.
    pub fn translate_database_location(&self, original: &str) -> Result<String> {
        let left_ns = self.config.left.namespace.as_str();
        if !original.starts_with(left_ns) {
            return Err(MigrateError::NamespaceMismatch {
                location: original.to_string(),
                namespace: left_ns.to_string(),
            });
        }
        if self.config.strategy.is_identity() {
            return Ok(original.to_string());
        }
        let relative_dir = &original[left_ns.len()..];
        let mapped_dir = self.map_global_location(relative_dir);
        let base = if mapped_dir != relative_dir {
            self.config
                .transfer
                .common_storage
                .as_deref()
                .unwrap_or(self.config.right.namespace.as_str())
        } else {
            self.config.right.namespace.as_str()
        };
        Ok(format!("{}{}", base, mapped_dir))
    }

    /// Consolidation level for one partition: the partition path's
    /// directory depth, plus one when no table-name filter is active (the
    /// whole database is assumed to move together).
    pub fn partition_level(&self, partition_spec: &str) -> usize {
        let depth = partition_spec.matches('/').count() + 1;
        if self.config.table_filter_active() {
            depth
        } else {
            depth + 1
        }
    }

    /// Translates every partition location of a table.
    ///
    /// Null/empty/never-loaded locations cannot be translated; each one is
    /// a non-fatal issue that still counts toward drift accounting. When
    /// both warehouse directories are configured, translated locations are
    /// checked against the expected warehouse root for the table's
    /// external/managed classification.
    pub fn translate_partitions(
        &self,
        database: &str,
        table: &str,
        table_is_external: bool,
        partitions: &BTreeMap<String, String>,
    ) -> PartitionTranslation {
        let mut out = PartitionTranslation::default();

        for (spec, location) in partitions {
            if location.is_empty() || location == NOT_SET {
                out.issues.push(format!(
                    "partition '{}' of {}.{} has no recorded location and cannot be translated",
                    spec, database, table
                ));
                out.untranslated += 1;
                continue;
            }

            let level = self.partition_level(spec);
            match self.translate(database, table, location, level, Some(spec)) {
                Ok(translated) => {
                    out.any_remapped |= translated.remapped;
                    self.check_warehouse_policy(
                        database,
                        table,
                        spec,
                        &translated.location,
                        table_is_external,
                        &mut out.issues,
                    );
                    out.locations.insert(spec.clone(), translated.location);
                }
                Err(e) => {
                    out.issues.push(format!(
                        "partition '{}' of {}.{}: {}",
                        spec, database, table, e
                    ));
                    out.untranslated += 1;
                }
            }
        }

        out
    }

    /// Warns (never fails) when a translated location does not land under
    /// the warehouse root its external/managed classification expects. The
    /// migration proceeds; the operator learns the layout will not match
    /// stated policy.
    fn check_warehouse_policy(
        &self,
        database: &str,
        table: &str,
        partition_spec: &str,
        location: &str,
        table_is_external: bool,
        issues: &mut Vec<String>,
    ) {
        let external = self.config.warehouse.external_dir_for(database);
        let managed = self.config.warehouse.managed_directory.as_deref();
        if external.is_none() || managed.is_none() {
            return;
        }

        let expected_dir = if table_is_external {
            external.unwrap_or_default()
        } else {
            managed.unwrap_or_default()
        };
        let expected_root = format!("{}/{}.db", expected_dir, database);
        if !location.contains(&expected_root) {
            issues.push(format!(
                "partition '{}' of {}.{} lands at '{}', outside the expected warehouse root '{}'",
                partition_spec, database, table, location, expected_root
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, ClusterConfig, FilterConfig, LocationMapRule, MigrateOptions, TransferConfig,
        WarehouseConfig,
    };

    fn base_config(strategy: StrategyKind) -> AppConfig {
        AppConfig {
            strategy,
            left: ClusterConfig {
                namespace: "hdfs://left".to_string(),
            },
            right: ClusterConfig {
                namespace: "ofs://OHOME90".to_string(),
            },
            databases: vec!["db".to_string()],
            execute: false,
            output_dir: ".".to_string(),
            transfer: TransferConfig::default(),
            filter: FilterConfig::default(),
            warehouse: WarehouseConfig::default(),
            options: MigrateOptions::default(),
        }
    }

    #[test]
    fn test_translate_is_deterministic() {
        let translator = Translator::new(base_config(StrategyKind::SchemaOnly));
        let a = translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        let b = translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_namespace_replacement_without_remap() {
        let translator = Translator::new(base_config(StrategyKind::SchemaOnly));
        let t = translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        assert_eq!(t.location, "ofs://OHOME90/db/tbl");
        assert!(!t.remapped);
    }

    #[test]
    fn test_rejects_foreign_namespace() {
        let translator = Translator::new(base_config(StrategyKind::SchemaOnly));
        let err = translator
            .translate("db", "tbl", "s3a://elsewhere/db/tbl", 1, None)
            .unwrap_err();
        assert!(matches!(err, MigrateError::NamespaceMismatch { .. }));
    }

    #[test]
    fn test_first_match_wins_in_declared_order() {
        // Order matters: with "/a/b" declared before "/a", input "/a/b/c"
        // takes the "/a/b" rule.
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.options.global_location_map = vec![
            LocationMapRule {
                from: "/a/b".to_string(),
                to: "/x".to_string(),
            },
            LocationMapRule {
                from: "/a".to_string(),
                to: "/y".to_string(),
            },
        ];
        let translator = Translator::new(config);
        assert_eq!(translator.map_global_location("/a/b/c"), "/x/c");

        // Reversed declaration order changes the result: the shorter "/a"
        // now shadows "/a/b" for the same input.
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.options.global_location_map = vec![
            LocationMapRule {
                from: "/a".to_string(),
                to: "/y".to_string(),
            },
            LocationMapRule {
                from: "/a/b".to_string(),
                to: "/x".to_string(),
            },
        ];
        let translator = Translator::new(config);
        assert_eq!(translator.map_global_location("/a/b/c"), "/y/b/c");
    }

    #[test]
    fn test_only_leading_occurrence_replaced() {
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.options.global_location_map = vec![LocationMapRule {
            from: "/data".to_string(),
            to: "/warehouse".to_string(),
        }];
        let translator = Translator::new(config);
        assert_eq!(
            translator.map_global_location("/data/archive/data"),
            "/warehouse/archive/data"
        );
    }

    #[test]
    fn test_identity_strategies_keep_location() {
        for strategy in [StrategyKind::Linked, StrategyKind::Common] {
            let translator = Translator::new(base_config(strategy));
            let t = translator
                .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
                .unwrap();
            assert_eq!(t.location, "hdfs://left/db/tbl");
            assert!(!t.remapped);
        }
    }

    #[test]
    fn test_remap_targets_common_storage_when_configured() {
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.transfer.common_storage = Some("ofs://shared".to_string());
        config.options.global_location_map = vec![LocationMapRule {
            from: "/legacy".to_string(),
            to: "/warehouse".to_string(),
        }];
        let translator = Translator::new(config);
        let t = translator
            .translate("db", "tbl", "hdfs://left/legacy/db/tbl", 1, None)
            .unwrap();
        assert_eq!(t.location, "ofs://shared/warehouse/db/tbl");
        assert!(t.remapped);
    }

    #[test]
    fn test_storage_migration_same_namespace_requires_remap() {
        let mut config = base_config(StrategyKind::StorageMigration);
        config.right.namespace = "hdfs://left".to_string();
        let translator = Translator::new(config);
        assert!(translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .is_err());

        // Reset-to-default makes the same setup legal.
        let mut config = base_config(StrategyKind::StorageMigration);
        config.right.namespace = "hdfs://left".to_string();
        config.warehouse.reset_to_default_location = true;
        config.warehouse.external_directory = Some("/warehouse/external".to_string());
        let translator = Translator::new(config);
        let t = translator
            .translate("db", "tbl", "hdfs://left/old/db/tbl", 1, None)
            .unwrap();
        assert_eq!(t.location, "hdfs://left/warehouse/external/db.db/tbl");
    }

    #[test]
    fn test_reset_to_default_with_partition_spec() {
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.warehouse.reset_to_default_location = true;
        config.warehouse.external_directory = Some("/warehouse/external".to_string());
        let translator = Translator::new(config);
        let t = translator
            .translate("db", "tbl", "hdfs://left/any/db/tbl", 1, Some("dt=2026-01-01"))
            .unwrap();
        assert_eq!(
            t.location,
            "ofs://OHOME90/warehouse/external/db.db/tbl/dt=2026-01-01"
        );
    }

    #[test]
    fn test_history_recorded_only_when_distcp_enabled() {
        let translator = Translator::new(base_config(StrategyKind::SchemaOnly));
        translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        assert!(translator.history().is_empty());

        let mut config = base_config(StrategyKind::SchemaOnly);
        config.transfer.distcp = true;
        let translator = Translator::new(config);
        translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        let entries = translator.history().entries("db", Side::Right);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].translated, "ofs://OHOME90/db/tbl");
    }

    #[test]
    fn test_sql_strategy_records_no_history() {
        let mut config = base_config(StrategyKind::Sql);
        config.transfer.distcp = true;
        let translator = Translator::new(config);
        translator
            .translate("db", "tbl", "hdfs://left/db/tbl", 1, None)
            .unwrap();
        assert!(translator.history().is_empty());
    }

    #[test]
    fn test_history_side_selection() {
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.transfer.intermediate_storage = Some("s3a://hop".to_string());
        assert_eq!(Translator::new(config).history_side(), Side::Left);

        let mut config = base_config(StrategyKind::SchemaOnly);
        config.transfer.common_storage = Some("ofs://shared".to_string());
        assert_eq!(Translator::new(config).history_side(), Side::Right);

        let mut config = base_config(StrategyKind::SchemaOnly);
        config.transfer.data_flow = DataFlow::Push;
        assert_eq!(Translator::new(config).history_side(), Side::Left);

        let config = base_config(StrategyKind::SchemaOnly);
        assert_eq!(Translator::new(config).history_side(), Side::Right);
    }

    #[test]
    fn test_partition_level_depends_on_table_filter() {
        let config = base_config(StrategyKind::SchemaOnly);
        let translator = Translator::new(config);
        // No table filter: whole database moves together, one extra level.
        assert_eq!(translator.partition_level("year=2026/month=01"), 3);

        let mut config = base_config(StrategyKind::SchemaOnly);
        config.filter.table_include = Some("orders.*".to_string());
        let translator = Translator::new(config);
        assert_eq!(translator.partition_level("year=2026/month=01"), 2);
    }

    #[test]
    fn test_partition_translation_counts_untranslatable() {
        let translator = Translator::new(base_config(StrategyKind::SchemaOnly));
        let mut partitions = BTreeMap::new();
        partitions.insert(
            "dt=2026-01-01".to_string(),
            "hdfs://left/db/tbl/dt=2026-01-01".to_string(),
        );
        partitions.insert("dt=2026-01-02".to_string(), NOT_SET.to_string());
        partitions.insert("dt=2026-01-03".to_string(), String::new());

        let out = translator.translate_partitions("db", "tbl", true, &partitions);
        assert_eq!(out.locations.len(), 1);
        assert_eq!(out.untranslated, 2);
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn test_warehouse_policy_mismatch_is_non_fatal() {
        let mut config = base_config(StrategyKind::SchemaOnly);
        config.warehouse.external_directory = Some("/warehouse/external".to_string());
        config.warehouse.managed_directory = Some("/warehouse/managed".to_string());
        let translator = Translator::new(config);

        let mut partitions = BTreeMap::new();
        partitions.insert(
            "dt=2026-01-01".to_string(),
            "hdfs://left/odd/spot/dt=2026-01-01".to_string(),
        );
        let out = translator.translate_partitions("db", "tbl", true, &partitions);
        // Translation still happened; the mismatch is only an issue.
        assert_eq!(out.locations.len(), 1);
        assert_eq!(out.issues.len(), 1);
        assert!(out.issues[0].contains("expected warehouse root"));
    }
}
