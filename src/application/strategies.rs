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

//! Per-strategy migration planning.
//!
//! One dispatch point over the closed strategy enum. Strategies only ever
//! append SQL/issues/errors to the table's environment views; phase
//! transitions stay with the orchestrator, and nothing here executes SQL.

use log::debug;

use crate::application::sqlgen;
use crate::config::AppConfig;
use crate::domain::codes::{CodeRegistry, MessageCode};
use crate::domain::errors::Result;
use crate::domain::records::TableRecord;
use crate::domain::side::Side;
use crate::domain::strategy::{resolve_hybrid, StrategyKind};
use crate::translator::Translator;

/// Everything one strategy invocation needs, bundled so strategies cannot
/// reach for ambient state.
pub struct StrategyContext<'a> {
    pub config: &'a AppConfig,
    pub translator: &'a Translator,
    pub codes: &'a CodeRegistry,
    pub database: &'a str,
    pub table: &'a mut TableRecord,
}

/// Resolves the table's effective strategy. Only HYBRID needs a per-table
/// decision; everything else is taken as configured.
pub fn effective_strategy(config: &AppConfig, table: &TableRecord) -> StrategyKind {
    match config.strategy {
        StrategyKind::Hybrid => resolve_hybrid(
            table.is_transactional(),
            config.options.downgrade_acid_in_place,
            table.partition_count(),
            config.options.export_partition_limit,
        ),
        other => other,
    }
}

/// Plans the migration of one table under the given strategy.
pub fn execute(kind: StrategyKind, ctx: &mut StrategyContext<'_>) -> Result<()> {
    debug!(
        "planning {}.{} via {}",
        ctx.database, ctx.table.name, kind
    );
    match kind {
        StrategyKind::SchemaOnly => schema_only(ctx),
        StrategyKind::Dump => dump(ctx),
        StrategyKind::Linked => linked(ctx),
        StrategyKind::ConvertLinked => convert_linked(ctx),
        StrategyKind::Common => common(ctx),
        StrategyKind::Sql => sql_transfer(ctx, false),
        StrategyKind::ExportImport => export_import(ctx),
        StrategyKind::Acid => acid(ctx),
        StrategyKind::StorageMigration => storage_migration(ctx),
        StrategyKind::Hybrid => {
            let resolved = effective_strategy(ctx.config, ctx.table);
            ctx.table
                .add_step("strategy", format!("hybrid resolved to {}", resolved));
            execute(resolved, ctx)
        }
    }
}

fn left_location(table: &TableRecord) -> Option<String> {
    table.env(Side::Left).and_then(|e| e.location.clone())
}

fn left_ddl(table: &TableRecord) -> Vec<String> {
    table
        .env(Side::Left)
        .map(|e| e.ddl.clone())
        .unwrap_or_default()
}

/// Translates the table base location and flags the record when a remap
/// rule fired. `None` when the table carries no location (e.g. a view).
fn translate_base(ctx: &mut StrategyContext<'_>) -> Result<Option<String>> {
    let Some(location) = left_location(ctx.table) else {
        return Ok(None);
    };
    let name = ctx.table.name.clone();
    let translated = ctx
        .translator
        .translate(ctx.database, &name, &location, 1, None)?;
    ctx.table.remapped |= translated.remapped;
    Ok(Some(translated.location))
}

/// Appends per-partition translations as ADD PARTITION statements on the
/// RIGHT side. Non-fatal translation misses become issues.
fn plan_partitions(ctx: &mut StrategyContext<'_>) {
    let partitions = ctx
        .table
        .env(Side::Left)
        .map(|e| e.partitions.clone())
        .unwrap_or_default();
    if partitions.is_empty() {
        return;
    }

    let name = ctx.table.name.clone();
    let is_external = ctx.table.is_external();
    let outcome = ctx
        .translator
        .translate_partitions(ctx.database, &name, is_external, &partitions);

    if outcome.untranslated > 0 {
        ctx.codes.raise(MessageCode::UntranslatablePartitionLocation);
    }
    if outcome.issues.len() > outcome.untranslated {
        ctx.codes.raise(MessageCode::WarehousePolicyMismatch);
    }
    ctx.table.remapped |= outcome.any_remapped;

    let database = ctx.database.to_string();
    let right = ctx.table.env_mut(Side::Right);
    for issue in outcome.issues {
        right.add_issue(issue);
    }
    for (spec, location) in outcome.locations {
        right.add_sql(
            format!("Add partition {}", spec),
            sqlgen::add_partition(&database, &name, &spec, &location),
        );
    }
}

fn schema_only(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let ddl = left_ddl(ctx.table);
    let target = translate_base(ctx)?;

    let right_ddl = match &target {
        Some(location) => sqlgen::replace_location(&ddl, location),
        None => ddl,
    };

    let database = ctx.database.to_string();
    let right = ctx.table.env_mut(Side::Right);
    right.add_sql("Use database", sqlgen::use_database(&database));
    right.add_sql("Create schema", right_ddl.join("\n"));
    right.location = target;

    if ctx.config.options.evaluate_partition_location {
        plan_partitions(ctx);
    }
    Ok(())
}

/// Schema playbook of the source side; nothing is targeted at RIGHT.
fn dump(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let ddl = left_ddl(ctx.table);
    let database = ctx.database.to_string();
    let left = ctx.table.env_mut(Side::Left);
    left.add_sql("Use database", sqlgen::use_database(&database));
    left.add_sql("Schema extract", ddl.join("\n"));
    Ok(())
}

/// Table on RIGHT reading LEFT's storage in place.
fn linked(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let ddl = left_ddl(ctx.table);
    // Identity translation: validates the namespace, location unchanged.
    let target = translate_base(ctx)?;

    let mut right_ddl: Vec<String> = ddl;
    if !sqlgen::is_external_ddl(&right_ddl) {
        if let Some(first) = right_ddl.first_mut() {
            *first = first.replacen("CREATE TABLE", "CREATE EXTERNAL TABLE", 1);
        }
    }

    let database = ctx.database.to_string();
    let right = ctx.table.env_mut(Side::Right);
    right.add_sql("Use database", sqlgen::use_database(&database));
    right.add_sql("Create linked schema", right_ddl.join("\n"));
    right.location = target;
    Ok(())
}

/// Converts a previously linked table into one owning its storage on RIGHT.
fn convert_linked(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let Some(location) = left_location(ctx.table) else {
        ctx.table
            .env_mut(Side::Right)
            .add_issue("no base location; nothing to convert");
        return Ok(());
    };
    let name = ctx.table.name.clone();
    let relative = location
        .strip_prefix(ctx.config.left.namespace.as_str())
        .unwrap_or(&location);
    let owned_location = format!("{}{}", ctx.config.right.namespace, relative);

    let database = ctx.database.to_string();
    let right = ctx.table.env_mut(Side::Right);
    right.add_sql(
        "Point table at owned storage",
        sqlgen::alter_table_location(&database, &name, &owned_location),
    );
    right.add_sql(
        "Take ownership of data on drop",
        sqlgen::set_table_property(&database, &name, "external.table.purge", "true"),
    );
    right.location = Some(owned_location);
    Ok(())
}

/// Shared-storage twin of SCHEMA_ONLY: same schema, same location.
fn common(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let ddl = left_ddl(ctx.table);
    let target = translate_base(ctx)?;

    let database = ctx.database.to_string();
    let right = ctx.table.env_mut(Side::Right);
    right.add_sql("Use database", sqlgen::use_database(&database));
    right.add_sql("Create schema on common storage", ddl.join("\n"));
    right.location = target;
    Ok(())
}

fn enforce_partition_limit(
    ctx: &mut StrategyContext<'_>,
    limit: usize,
    code: MessageCode,
    label: &str,
) {
    let count = ctx.table.partition_count();
    if count > limit {
        ctx.codes.raise(code);
        ctx.codes.raise(MessageCode::MustRunManually);
        ctx.table.manual_only = true;
        ctx.table.env_mut(Side::Left).add_issue(format!(
            "{} partitions exceed the {} limit of {}; automatic execution disabled, run the generated SQL manually",
            count, label, limit
        ));
    }
}

/// In-flight SQL data movement, optionally staged through intermediate
/// storage. `downgrade` strips ACID-ness from the target schema.
fn sql_transfer(ctx: &mut StrategyContext<'_>, downgrade: bool) -> Result<()> {
    enforce_partition_limit(
        ctx,
        ctx.config.options.sql_partition_limit,
        MessageCode::SqlPartitionLimitExceeded,
        "SQL strategy",
    );

    let name = ctx.table.name.clone();
    let database = ctx.database.to_string();
    let ddl = left_ddl(ctx.table);
    let partition_cols = sqlgen::partition_columns(&ddl);
    let target = translate_base(ctx)?;

    let target_ddl = {
        let renamed = match &target {
            Some(location) => sqlgen::replace_location(&ddl, location),
            None => ddl.clone(),
        };
        if downgrade {
            sqlgen::downgrade_ddl(&renamed)
        } else {
            renamed
        }
    };

    match ctx.config.transfer.intermediate_storage.clone() {
        Some(hop) => {
            let transfer_name = format!("{}{}", ctx.config.transfer.transfer_prefix, name);
            let hop_location = format!("{}/{}.db/{}", hop, database, name);

            // LEFT: stage the data out to the hop.
            let transfer_ddl = sqlgen::replace_location(
                &sqlgen::rename_in_ddl(&ddl, &database, &name, &transfer_name),
                &hop_location,
            );
            let transfer_ddl = if sqlgen::is_external_ddl(&transfer_ddl) {
                transfer_ddl
            } else {
                sqlgen::downgrade_ddl(&transfer_ddl)
            };
            let transfer_env = ctx.table.env_mut(Side::Transfer);
            transfer_env.exists = true;
            transfer_env.ddl = transfer_ddl.clone();
            transfer_env.location = Some(hop_location.clone());

            let left = ctx.table.env_mut(Side::Left);
            left.add_sql("Create transfer table", transfer_ddl.join("\n"));
            left.add_sql(
                "Stage data to intermediate storage",
                sqlgen::insert_overwrite(&database, &name, &database, &transfer_name, &partition_cols),
            );
            left.add_cleanup_sql(
                "Drop transfer table",
                sqlgen::drop_table(&database, &transfer_name),
            );

            // RIGHT: shadow over the hop, then land the data.
            let shadow_name = format!("{}{}", ctx.config.transfer.transfer_prefix, name);
            let shadow_ddl = sqlgen::replace_location(
                &sqlgen::rename_in_ddl(&ddl, &database, &name, &shadow_name),
                &hop_location,
            );
            let shadow_env = ctx.table.env_mut(Side::Shadow);
            shadow_env.exists = true;
            shadow_env.ddl = shadow_ddl.clone();
            shadow_env.location = Some(hop_location);

            let right = ctx.table.env_mut(Side::Right);
            right.add_sql("Use database", sqlgen::use_database(&database));
            right.add_sql("Create shadow table over intermediate storage", shadow_ddl.join("\n"));
            right.add_sql("Create target schema", target_ddl.join("\n"));
            right.add_sql(
                "Move data from shadow to target",
                sqlgen::insert_overwrite(&database, &shadow_name, &database, &name, &partition_cols),
            );
            right.add_cleanup_sql(
                "Drop shadow table",
                sqlgen::drop_table(&database, &shadow_name),
            );
            right.location = target;
        }
        None => {
            // RIGHT reads LEFT's storage directly through a shadow table.
            let shadow_name = format!("{}{}", ctx.config.transfer.transfer_prefix, name);
            let shadow_ddl = {
                let renamed = sqlgen::rename_in_ddl(&ddl, &database, &name, &shadow_name);
                if sqlgen::is_external_ddl(&renamed) {
                    renamed
                } else {
                    sqlgen::downgrade_ddl(&renamed)
                }
            };
            let source_location = left_location(ctx.table);
            let shadow_env = ctx.table.env_mut(Side::Shadow);
            shadow_env.exists = true;
            shadow_env.ddl = shadow_ddl.clone();
            shadow_env.location = source_location;

            let right = ctx.table.env_mut(Side::Right);
            right.add_sql("Use database", sqlgen::use_database(&database));
            right.add_sql("Create shadow table over source storage", shadow_ddl.join("\n"));
            right.add_sql("Create target schema", target_ddl.join("\n"));
            right.add_sql(
                "Move data from shadow to target",
                sqlgen::insert_overwrite(&database, &shadow_name, &database, &name, &partition_cols),
            );
            right.add_cleanup_sql(
                "Drop shadow table",
                sqlgen::drop_table(&database, &shadow_name),
            );
            right.location = target;
        }
    }
    Ok(())
}

fn export_import(ctx: &mut StrategyContext<'_>) -> Result<()> {
    enforce_partition_limit(
        ctx,
        ctx.config.options.export_partition_limit,
        MessageCode::SqlPartitionLimitExceeded,
        "EXPORT_IMPORT strategy",
    );

    let name = ctx.table.name.clone();
    let database = ctx.database.to_string();
    let is_external = ctx.table.is_external();
    let target = translate_base(ctx)?;

    let staging_base = ctx
        .config
        .transfer
        .intermediate_storage
        .clone()
        .unwrap_or_else(|| format!("{}/tmp", ctx.config.left.namespace));
    let export_path = format!(
        "{}/{}{}/{}",
        staging_base, ctx.config.transfer.transfer_prefix, database, name
    );

    let left = ctx.table.env_mut(Side::Left);
    left.add_sql(
        "Export table to staging",
        sqlgen::export_table(&database, &name, &export_path),
    );

    let right = ctx.table.env_mut(Side::Right);
    right.add_sql("Use database", sqlgen::use_database(&database));
    right.add_sql(
        "Import table from staging",
        sqlgen::import_table(&database, &name, &export_path, is_external),
    );
    if let Some(location) = &target {
        right.add_sql(
            "Relocate imported table",
            sqlgen::alter_table_location(&database, &name, location),
        );
    }
    right.location = target;
    Ok(())
}

fn acid(ctx: &mut StrategyContext<'_>) -> Result<()> {
    enforce_partition_limit(
        ctx,
        ctx.config.options.acid_partition_limit,
        MessageCode::AcidPartitionLimitExceeded,
        "ACID strategy",
    );

    if ctx.config.options.downgrade_acid_in_place {
        let name = ctx.table.name.clone();
        let database = ctx.database.to_string();
        let ddl = left_ddl(ctx.table);
        let partition_cols = sqlgen::partition_columns(&ddl);
        let transfer_name = format!("{}{}", ctx.config.transfer.transfer_prefix, name);

        // The downgraded copy lands at the default warehouse location;
        // the original's ACID directory layout is not reusable.
        let transfer_ddl = sqlgen::downgrade_ddl(&sqlgen::strip_location(
            &sqlgen::rename_in_ddl(&ddl, &database, &name, &transfer_name),
        ));
        let transfer_env = ctx.table.env_mut(Side::Transfer);
        transfer_env.exists = true;
        transfer_env.ddl = transfer_ddl.clone();

        let left = ctx.table.env_mut(Side::Left);
        left.add_sql("Create downgraded transfer table", transfer_ddl.join("\n"));
        left.add_sql(
            "Copy data into downgraded table",
            sqlgen::insert_overwrite(&database, &name, &database, &transfer_name, &partition_cols),
        );
        left.add_sql("Drop transactional original", sqlgen::drop_table(&database, &name));
        left.add_sql(
            "Rename downgraded table into place",
            sqlgen::rename_table(&database, &transfer_name, &name),
        );
        Ok(())
    } else {
        // Cross-cluster ACID migration always lands a downgraded target.
        sql_transfer(ctx, true)
    }
}

fn storage_migration(ctx: &mut StrategyContext<'_>) -> Result<()> {
    let name = ctx.table.name.clone();
    let database = ctx.database.to_string();
    let ddl = left_ddl(ctx.table);

    let Some(target) = translate_base(ctx)? else {
        ctx.table
            .env_mut(Side::Left)
            .add_issue("no base location; storage migration has nothing to move");
        return Ok(());
    };

    if ctx.config.transfer.distcp {
        // Bulk-copy mode: the metadata moves here, the bytes move in the
        // consolidated copy plan.
        let partitions = ctx
            .table
            .env(Side::Left)
            .map(|e| e.partitions.clone())
            .unwrap_or_default();
        let is_external = ctx.table.is_external();
        let outcome =
            ctx.translator
                .translate_partitions(&database, &name, is_external, &partitions);
        if outcome.untranslated > 0 {
            ctx.codes.raise(MessageCode::UntranslatablePartitionLocation);
        }
        ctx.table.remapped |= outcome.any_remapped;

        let left = ctx.table.env_mut(Side::Left);
        left.add_sql(
            "Alter table location",
            sqlgen::alter_table_location(&database, &name, &target),
        );
        for issue in outcome.issues {
            left.add_issue(issue);
        }
        for (spec, location) in outcome.locations {
            left.add_sql(
                format!("Alter location of partition {}", spec),
                sqlgen::alter_partition_location(&database, &name, &spec, &location),
            );
        }
    } else {
        enforce_partition_limit(
            ctx,
            ctx.config.options.sql_partition_limit,
            MessageCode::SqlPartitionLimitExceeded,
            "storage migration",
        );

        let working_name = format!(
            "{}{}",
            name, ctx.config.transfer.storage_migration_postfix
        );
        let partition_cols = sqlgen::partition_columns(&ddl);
        let working_ddl = sqlgen::replace_location(
            &sqlgen::rename_in_ddl(&ddl, &database, &name, &working_name),
            &target,
        );

        let left = ctx.table.env_mut(Side::Left);
        left.add_sql("Create working table at new location", working_ddl.join("\n"));
        left.add_sql(
            "Rewrite data into new location",
            sqlgen::insert_overwrite(&database, &name, &database, &working_name, &partition_cols),
        );
        left.add_sql("Drop original table", sqlgen::drop_table(&database, &name));
        left.add_sql(
            "Rename working table into place",
            sqlgen::rename_table(&database, &working_name, &name),
        );
    }

    ctx.table.env_mut(Side::Left).location = Some(target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ClusterConfig, LocationMapRule};
    use crate::domain::records::NOT_SET;

    fn config(strategy: StrategyKind) -> AppConfig {
        AppConfig {
            strategy,
            left: ClusterConfig {
                namespace: "hdfs://left".to_string(),
            },
            right: ClusterConfig {
                namespace: "ofs://right".to_string(),
            },
            databases: vec!["sales".to_string()],
            execute: false,
            output_dir: ".".to_string(),
            transfer: Default::default(),
            filter: Default::default(),
            warehouse: Default::default(),
            options: Default::default(),
        }
    }

    fn table_with_ddl(partitioned: bool) -> TableRecord {
        let mut t = TableRecord::new("orders");
        let mut ddl = vec![
            "CREATE EXTERNAL TABLE `sales`.`orders` (".to_string(),
            "  `id` bigint)".to_string(),
        ];
        if partitioned {
            ddl.push("PARTITIONED BY (".to_string());
            ddl.push("  `dt` string)".to_string());
        }
        ddl.push("LOCATION".to_string());
        ddl.push("  'hdfs://left/wh/sales.db/orders'".to_string());
        let left = t.env_mut(Side::Left);
        left.exists = true;
        left.ddl = ddl;
        left.location = Some("hdfs://left/wh/sales.db/orders".to_string());
        t
    }

    fn run(kind: StrategyKind, config: &AppConfig, table: &mut TableRecord) {
        let translator = Translator::new(config.clone());
        let codes = CodeRegistry::new();
        let mut ctx = StrategyContext {
            config,
            translator: &translator,
            codes: &codes,
            database: "sales",
            table,
        };
        execute(kind, &mut ctx).unwrap();
    }

    #[test]
    fn test_schema_only_rewrites_location() {
        let cfg = config(StrategyKind::SchemaOnly);
        let mut table = table_with_ddl(false);
        run(StrategyKind::SchemaOnly, &cfg, &mut table);

        let right = table.env(Side::Right).unwrap();
        assert_eq!(right.sql.len(), 2);
        assert!(right.sql[1].statement.contains("'ofs://right/wh/sales.db/orders'"));
        assert_eq!(
            right.location.as_deref(),
            Some("ofs://right/wh/sales.db/orders")
        );
        assert!(!table.remapped);
    }

    #[test]
    fn test_schema_only_remap_flag() {
        let mut cfg = config(StrategyKind::SchemaOnly);
        cfg.options.global_location_map = vec![LocationMapRule {
            from: "/wh".to_string(),
            to: "/warehouse/tablespace".to_string(),
        }];
        let mut table = table_with_ddl(false);
        run(StrategyKind::SchemaOnly, &cfg, &mut table);
        assert!(table.remapped);
    }

    #[test]
    fn test_schema_only_partition_evaluation() {
        let mut cfg = config(StrategyKind::SchemaOnly);
        cfg.options.evaluate_partition_location = true;
        let mut table = table_with_ddl(true);
        let left = table.env_mut(Side::Left);
        left.partitions.insert(
            "dt=2026-01-01".to_string(),
            "hdfs://left/wh/sales.db/orders/dt=2026-01-01".to_string(),
        );
        left.partitions
            .insert("dt=2026-01-02".to_string(), NOT_SET.to_string());

        run(StrategyKind::SchemaOnly, &cfg, &mut table);

        let right = table.env(Side::Right).unwrap();
        let add_partitions: Vec<_> = right
            .sql
            .iter()
            .filter(|p| p.statement.contains("ADD IF NOT EXISTS PARTITION"))
            .collect();
        assert_eq!(add_partitions.len(), 1);
        // The NOT_SET partition surfaced as an issue, not an error.
        assert_eq!(right.issues.len(), 1);
    }

    #[test]
    fn test_linked_keeps_source_location() {
        let cfg = config(StrategyKind::Linked);
        let mut table = table_with_ddl(false);
        run(StrategyKind::Linked, &cfg, &mut table);

        let right = table.env(Side::Right).unwrap();
        assert!(right.sql[1]
            .statement
            .contains("'hdfs://left/wh/sales.db/orders'"));
        assert!(!table.remapped);
    }

    #[test]
    fn test_sql_builds_shadow_and_cleanup() {
        let cfg = config(StrategyKind::Sql);
        let mut table = table_with_ddl(true);
        run(StrategyKind::Sql, &cfg, &mut table);

        let right = table.env(Side::Right).unwrap();
        assert!(right
            .sql
            .iter()
            .any(|p| p.statement.contains("`sales`.`transfer_orders`")));
        assert!(right
            .sql
            .iter()
            .any(|p| p.statement.contains("INSERT OVERWRITE")));
        assert_eq!(right.cleanup_sql.len(), 1);
        assert!(right.cleanup_sql[0].statement.contains("DROP TABLE"));
        assert!(table.env(Side::Shadow).unwrap().exists);
    }

    #[test]
    fn test_sql_partition_limit_disables_execution() {
        let mut cfg = config(StrategyKind::Sql);
        cfg.options.sql_partition_limit = 1;
        let mut table = table_with_ddl(true);
        let left = table.env_mut(Side::Left);
        left.partitions
            .insert("dt=2026-01-01".to_string(), NOT_SET.to_string());
        left.partitions
            .insert("dt=2026-01-02".to_string(), NOT_SET.to_string());

        run(StrategyKind::Sql, &cfg, &mut table);
        assert!(table.manual_only);
        assert!(table
            .env(Side::Left)
            .unwrap()
            .issues
            .iter()
            .any(|i| i.contains("automatic execution disabled")));
    }

    #[test]
    fn test_sql_with_intermediate_storage_stages_both_sides() {
        let mut cfg = config(StrategyKind::Sql);
        cfg.transfer.intermediate_storage = Some("s3a://hop".to_string());
        let mut table = table_with_ddl(false);
        run(StrategyKind::Sql, &cfg, &mut table);

        let left = table.env(Side::Left).unwrap();
        assert!(left
            .sql
            .iter()
            .any(|p| p.statement.contains("s3a://hop/sales.db/orders")));
        assert!(table.env(Side::Transfer).unwrap().exists);
        assert!(table.env(Side::Shadow).unwrap().exists);
        assert_eq!(left.cleanup_sql.len(), 1);
    }

    #[test]
    fn test_acid_in_place_downgrade_stays_left() {
        let mut cfg = config(StrategyKind::Acid);
        cfg.options.downgrade_acid_in_place = true;
        let mut table = table_with_ddl(false);
        // Make it transactional and managed.
        let left = table.env_mut(Side::Left);
        left.ddl = vec![
            "CREATE TABLE `sales`.`orders` (".to_string(),
            "  `id` bigint)".to_string(),
            "TBLPROPERTIES (".to_string(),
            "  'transactional'='true')".to_string(),
        ];
        left.location = Some("hdfs://left/managed/sales.db/orders".to_string());

        run(StrategyKind::Acid, &cfg, &mut table);

        let left = table.env(Side::Left).unwrap();
        assert_eq!(left.sql.len(), 4);
        assert!(left.sql[0].statement.contains("CREATE EXTERNAL TABLE"));
        assert!(left.sql[3].statement.contains("RENAME TO"));
        // Nothing lands on RIGHT for an in-place downgrade.
        assert!(table.env(Side::Right).unwrap().sql.is_empty());
    }

    #[test]
    fn test_storage_migration_bulk_copy_only_alters() {
        let mut cfg = config(StrategyKind::StorageMigration);
        cfg.transfer.distcp = true;
        cfg.options.global_location_map = vec![LocationMapRule {
            from: "/wh".to_string(),
            to: "/warehouse/new".to_string(),
        }];
        let mut table = table_with_ddl(true);
        table.env_mut(Side::Left).partitions.insert(
            "dt=2026-01-01".to_string(),
            "hdfs://left/wh/sales.db/orders/dt=2026-01-01".to_string(),
        );

        let translator = Translator::new(cfg.clone());
        let codes = CodeRegistry::new();
        let mut ctx = StrategyContext {
            config: &cfg,
            translator: &translator,
            codes: &codes,
            database: "sales",
            table: &mut table,
        };
        execute(StrategyKind::StorageMigration, &mut ctx).unwrap();

        let left = table.env(Side::Left).unwrap();
        assert!(left.sql.iter().all(|p| p.statement.contains("ALTER TABLE")));
        assert_eq!(left.sql.len(), 2);
        // Locations were recorded for the copy plan.
        assert!(!translator.history().is_empty());
    }

    #[test]
    fn test_storage_migration_in_cluster_rewrite() {
        let mut cfg = config(StrategyKind::StorageMigration);
        cfg.options.global_location_map = vec![LocationMapRule {
            from: "/wh".to_string(),
            to: "/warehouse/new".to_string(),
        }];
        let mut table = table_with_ddl(true);
        run(StrategyKind::StorageMigration, &cfg, &mut table);

        let left = table.env(Side::Left).unwrap();
        assert!(left
            .sql
            .iter()
            .any(|p| p.statement.contains("orders_storage_migration")));
        assert!(left
            .sql
            .iter()
            .any(|p| p.statement.contains("INSERT OVERWRITE")));
        assert!(left.sql.iter().any(|p| p.statement.contains("RENAME TO")));
    }

    #[test]
    fn test_hybrid_resolution_paths() {
        // Small partitioned external table -> EXPORT_IMPORT.
        let cfg = config(StrategyKind::Hybrid);
        let mut table = table_with_ddl(true);
        run(StrategyKind::Hybrid, &cfg, &mut table);
        assert!(table
            .env(Side::Right)
            .unwrap()
            .sql
            .iter()
            .any(|p| p.statement.contains("IMPORT")));

        // Transactional + in-place downgrade -> ACID on LEFT.
        let mut cfg = config(StrategyKind::Hybrid);
        cfg.options.downgrade_acid_in_place = true;
        let mut table = table_with_ddl(false);
        table.env_mut(Side::Left).ddl = vec![
            "CREATE TABLE `sales`.`orders` (".to_string(),
            "  'transactional'='true')".to_string(),
        ];
        run(StrategyKind::Hybrid, &cfg, &mut table);
        assert!(!table.env(Side::Left).unwrap().sql.is_empty());
    }
}
