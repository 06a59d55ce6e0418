//! Run configuration.
//!
//! Loaded from a YAML or JSON file, optionally overridden by CLI arguments,
//! validated once, then passed around as an immutable snapshot. Nothing in
//! the core reads ambient/global state.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;

use crate::domain::errors::{MigrateError, Result};
use crate::domain::strategy::StrategyKind;

/// Direction the bulk-copy job runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFlow {
    /// The target cluster reaches back and pulls from the source namespace.
    Pull,
    /// The source cluster pushes into the target namespace.
    Push,
}

impl Default for DataFlow {
    fn default() -> Self {
        DataFlow::Pull
    }
}

/// One ordered rule of the global location map. First match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationMapRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Storage namespace, e.g. `hdfs://left` or `ofs://OHOME90`.
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Prefix used for ephemeral transfer tables (and recognized as a
    /// remnant of earlier runs during enumeration).
    #[serde(default = "default_transfer_prefix")]
    pub transfer_prefix: String,

    /// Postfix used by in-cluster storage migration working tables.
    #[serde(default = "default_storage_migration_postfix")]
    pub storage_migration_postfix: String,

    /// Storage hop both clusters can reach; staged transfers go through it.
    pub intermediate_storage: Option<String>,

    /// Storage namespace shared by both clusters.
    pub common_storage: Option<String>,

    #[serde(default)]
    pub data_flow: DataFlow,

    /// Enables bulk-copy planning (consolidated out-of-band file copies).
    #[serde(default)]
    pub distcp: bool,
}

fn default_transfer_prefix() -> String {
    "transfer_".to_string()
}

fn default_storage_migration_postfix() -> String {
    "_storage_migration".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            transfer_prefix: default_transfer_prefix(),
            storage_migration_postfix: default_storage_migration_postfix(),
            intermediate_storage: None,
            common_storage: None,
            data_flow: DataFlow::default(),
            distcp: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Inclusion regex; takes precedence over `table_exclude`.
    pub table_include: Option<String>,
    pub table_exclude: Option<String>,
    /// Advisory partition-count cut-off; tables over it are flagged out.
    pub partition_limit: Option<usize>,
    /// Size cut-off in bytes; tables over it are flagged out.
    pub size_limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehouseConfig {
    /// External warehouse directory on the target, e.g. `/warehouse/external`.
    pub external_directory: Option<String>,
    /// Managed warehouse directory on the target.
    pub managed_directory: Option<String>,
    /// Per-database overrides of the external directory.
    #[serde(default)]
    pub database_directories: std::collections::BTreeMap<String, String>,
    /// Ignore remaps and drop every table at its default warehouse spot.
    #[serde(default)]
    pub reset_to_default_location: bool,
}

impl WarehouseConfig {
    pub fn external_dir_for(&self, database: &str) -> Option<&str> {
        self.database_directories
            .get(database)
            .map(|s| s.as_str())
            .or(self.external_directory.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrateOptions {
    /// Ordered prefix -> replacement rules applied to relative dirs.
    #[serde(default)]
    pub global_location_map: Vec<LocationMapRule>,

    /// Translate every partition location (not just the table base) for
    /// SCHEMA_ONLY runs.
    #[serde(default)]
    pub evaluate_partition_location: bool,

    #[serde(default)]
    pub migrate_views: bool,

    #[serde(default)]
    pub skip_stats_collection: bool,

    /// Downgrade transactional tables in place instead of staging them.
    #[serde(default)]
    pub downgrade_acid_in_place: bool,

    #[serde(default = "default_sql_partition_limit")]
    pub sql_partition_limit: usize,

    #[serde(default = "default_export_partition_limit")]
    pub export_partition_limit: usize,

    #[serde(default = "default_acid_partition_limit")]
    pub acid_partition_limit: usize,

    /// Width of the table-level worker pool. Defaults to the CPU count.
    pub concurrency: Option<usize>,
}

fn default_sql_partition_limit() -> usize {
    500
}

fn default_export_partition_limit() -> usize {
    100
}

fn default_acid_partition_limit() -> usize {
    500
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            global_location_map: Vec::new(),
            evaluate_partition_location: false,
            migrate_views: false,
            skip_stats_collection: false,
            downgrade_acid_in_place: false,
            sql_partition_limit: default_sql_partition_limit(),
            export_partition_limit: default_export_partition_limit(),
            acid_partition_limit: default_acid_partition_limit(),
            concurrency: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategyKind,
    pub left: ClusterConfig,
    pub right: ClusterConfig,
    pub databases: Vec<String>,

    /// False = dry run: full translation and SQL generation, no execution.
    #[serde(default)]
    pub execute: bool,

    /// Directory for the run report and checkpoints.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub options: MigrateOptions,
}

fn default_output_dir() -> String {
    "./migration-out".to_string()
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: String,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub strategy: Option<String>,
    /// Comma-separated database list
    #[arg(short, long)]
    pub databases: Option<String>,
    /// Execute generated SQL instead of the default dry run
    #[arg(long)]
    pub execute: bool,
    /// Enable bulk-copy planning
    #[arg(long)]
    pub distcp: bool,
    #[arg(short, long)]
    pub output: Option<String>,
    #[arg(long)]
    pub table_include: Option<String>,
    #[arg(long)]
    pub table_exclude: Option<String>,
    /// Resume key; defaults to the sorted database list
    #[arg(long)]
    pub run_key: Option<String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) -> Result<()> {
        if let Some(s) = &args.strategy {
            self.strategy = s.parse()?;
        }
        if let Some(dbs) = &args.databases {
            self.databases = dbs
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }
        if args.execute {
            self.execute = true;
        }
        if args.distcp {
            self.transfer.distcp = true;
        }
        if let Some(o) = &args.output {
            self.output_dir = o.clone();
        }
        if let Some(i) = &args.table_include {
            self.filter.table_include = Some(i.clone());
        }
        if let Some(e) = &args.table_exclude {
            self.filter.table_exclude = Some(e.clone());
        }
        Ok(())
    }

    /// Rejects inconsistent setups before any cluster is touched.
    pub fn validate(&self) -> Result<()> {
        if self.databases.is_empty() {
            return Err(MigrateError::Config(
                "at least one database must be requested".to_string(),
            ));
        }
        if self.left.namespace.is_empty() || self.right.namespace.is_empty() {
            return Err(MigrateError::Config(
                "both cluster namespaces must be set".to_string(),
            ));
        }
        if self.left.namespace.ends_with('/') || self.right.namespace.ends_with('/') {
            return Err(MigrateError::Config(
                "namespaces must not carry a trailing '/'".to_string(),
            ));
        }
        if self.transfer.intermediate_storage.is_some() && self.transfer.common_storage.is_some() {
            return Err(MigrateError::Config(
                "intermediate_storage and common_storage are mutually exclusive".to_string(),
            ));
        }
        // Filter regexes must compile; the compiled form is rebuilt where
        // it is used.
        if let Some(p) = &self.filter.table_include {
            regex::Regex::new(p)?;
        }
        if let Some(p) = &self.filter.table_exclude {
            regex::Regex::new(p)?;
        }
        for rule in &self.options.global_location_map {
            if rule.from.is_empty() {
                return Err(MigrateError::Config(
                    "global_location_map entries must have a non-empty 'from' prefix".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// True when no inclusion/exclusion table filter is in play; in that
    /// case the whole database is assumed to move together.
    pub fn table_filter_active(&self) -> bool {
        self.filter.table_include.is_some() || self.filter.table_exclude.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", yaml).unwrap();
        file
    }

    #[test]
    fn test_load_yaml_config() {
        let yaml = r#"
strategy: SCHEMA_ONLY
left:
  namespace: "hdfs://left"
right:
  namespace: "ofs://OHOME90"
databases:
  - sales
  - hr
options:
  global_location_map:
    - from: "/user/legacy"
      to: "/warehouse/external"
  evaluate_partition_location: true
"#;
        let file = write_config(yaml);
        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.strategy, StrategyKind::SchemaOnly);
        assert_eq!(config.databases, vec!["sales", "hr"]);
        assert_eq!(config.options.global_location_map.len(), 1);
        assert!(config.options.evaluate_partition_location);
        assert!(!config.execute);
        assert_eq!(config.transfer.transfer_prefix, "transfer_");
        assert_eq!(config.options.sql_partition_limit, 500);
        config.validate().unwrap();
    }

    #[test]
    fn test_merge_cli_overrides() {
        let yaml = r#"
strategy: SCHEMA_ONLY
left: { namespace: "hdfs://left" }
right: { namespace: "hdfs://right" }
databases: [sales]
"#;
        let file = write_config(yaml);
        let mut config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();

        let args = CliArgs {
            config: "unused".to_string(),
            strategy: Some("storage_migration".to_string()),
            databases: Some("a, b".to_string()),
            execute: true,
            distcp: true,
            output: None,
            table_include: None,
            table_exclude: None,
            run_key: None,
        };
        config.merge_cli(&args).unwrap();

        assert_eq!(config.strategy, StrategyKind::StorageMigration);
        assert_eq!(config.databases, vec!["a", "b"]);
        assert!(config.execute);
        assert!(config.transfer.distcp);
    }

    #[test]
    fn test_validate_rejects_bad_setups() {
        let yaml = r#"
strategy: SQL
left: { namespace: "hdfs://left/" }
right: { namespace: "hdfs://right" }
databases: [sales]
"#;
        let file = write_config(yaml);
        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_intermediate_and_common_storage_exclusive() {
        let yaml = r#"
strategy: SQL
left: { namespace: "hdfs://left" }
right: { namespace: "hdfs://right" }
databases: [sales]
transfer:
  intermediate_storage: "s3a://bucket/hop"
  common_storage: "ofs://shared"
"#;
        let file = write_config(yaml);
        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warehouse_per_database_override() {
        let mut wh = WarehouseConfig {
            external_directory: Some("/warehouse/external".to_string()),
            ..Default::default()
        };
        wh.database_directories
            .insert("sales".to_string(), "/finance/external".to_string());

        assert_eq!(wh.external_dir_for("sales"), Some("/finance/external"));
        assert_eq!(wh.external_dir_for("hr"), Some("/warehouse/external"));
    }
}
