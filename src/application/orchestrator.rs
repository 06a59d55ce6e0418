//! The migration orchestrator.
//!
//! Drives the run through four phases, each a full barrier before the
//! next: collect database/table metadata, create databases, fetch table
//! metadata, transfer. Per-table work is isolated; one table's failure
//! never aborts its siblings, while a failure during metadata collection
//! aborts the run before any further cluster contact.

use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::application::filters::{FilterDecision, TableFilter};
use crate::application::pool::WorkerPool;
use crate::application::strategies::{self, StrategyContext};
use crate::application::sqlgen;
use crate::config::AppConfig;
use crate::domain::codes::{CodeRegistry, MessageCode};
use crate::domain::errors::{MigrateError, Result};
use crate::domain::phase::PhaseState;
use crate::domain::records::{DatabaseRecord, TableRecord, TableStats};
use crate::domain::side::Side;
use crate::domain::strategy::StrategyKind;
use crate::ports::checkpoint::CheckpointStore;
use crate::ports::cluster::{ClusterConnection, ClusterProvider};
use crate::ports::queries::{self, MetastoreQueries};
use crate::ports::shell::ShellPool;
use crate::translator::copy_plan::{plan_for, CopyPlan};
use crate::translator::Translator;

/// Database-level pool width; table metadata is the dominant cost and gets
/// the wide pool.
const DB_POOL_WIDTH: usize = 4;

/// Aggregate outcome of one run.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub records: Vec<DatabaseRecord>,
    pub copy_plans: Vec<CopyPlan>,
    pub processed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub removed: usize,
    pub duration_secs: f64,
    pub raised_codes: Vec<MessageCode>,
}

enum TaskStatus {
    Success,
    Fatal,
    Skipped,
}

pub struct Orchestrator {
    config: Arc<AppConfig>,
    clusters: Arc<dyn ClusterProvider>,
    queries: Arc<dyn MetastoreQueries>,
    shell: Arc<dyn ShellPool>,
    checkpoint: Arc<dyn CheckpointStore>,
    translator: Arc<Translator>,
    codes: CodeRegistry,
}

/// Borrow a connection, run `f`, and always release, error paths included.
fn with_connection<T>(
    provider: &dyn ClusterProvider,
    side: Side,
    f: impl FnOnce(Option<&mut dyn ClusterConnection>) -> Result<T>,
) -> Result<T> {
    match provider.borrow(side)? {
        Some(mut conn) => {
            let out = f(Some(conn.as_mut()));
            provider.release(side, conn);
            out
        }
        None => f(None),
    }
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        clusters: Arc<dyn ClusterProvider>,
        queries: Arc<dyn MetastoreQueries>,
        shell: Arc<dyn ShellPool>,
        checkpoint: Arc<dyn CheckpointStore>,
    ) -> Self {
        let translator = Arc::new(Translator::new(config.clone()));
        Self {
            config: Arc::new(config),
            clusters,
            queries,
            shell,
            checkpoint,
            translator,
            codes: CodeRegistry::new(),
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn codes(&self) -> &CodeRegistry {
        &self.codes
    }

    /// Entry point for one full run.
    pub fn run(&self, run_key: &str) -> Result<RunResult> {
        let start = Instant::now();
        info!("Starting migration run '{}'", run_key);

        // Phase 1: collect.
        let mut records = self.collect()?;

        // Rerun shortcut: tables the checkpoint shows as completed are
        // skipped, not re-processed or re-counted.
        self.apply_checkpoint(run_key, &mut records)?;

        // Phase 2: databases must exist before any table-level work.
        self.create_databases(&mut records)?;

        // Phase 3: table metadata; a failure here is fatal to the run.
        self.table_metadata(&mut records)?;

        // Phase 4: transfer; failures isolate to their table.
        self.transfer(&mut records)?;

        let copy_plans: Vec<CopyPlan> = self
            .translator
            .history()
            .keys()
            .into_iter()
            .map(|(db, side)| plan_for(self.translator.history(), &db, side, 1))
            .collect();

        let records: Vec<DatabaseRecord> = records.into_values().collect();
        if let Err(e) = self.checkpoint.save(run_key, &records) {
            warn!("Checkpoint save failed: {}", e);
        }

        let result = RunResult {
            processed: count_phase(&records, PhaseState::Processed),
            errors: count_phase(&records, PhaseState::Error),
            skipped: count_phase(&records, PhaseState::RetrySkippedPastSuccess),
            removed: records
                .iter()
                .flat_map(|d| d.tables.values())
                .filter(|t| t.removed)
                .count(),
            duration_secs: start.elapsed().as_secs_f64(),
            raised_codes: self.codes.raised(),
            records,
            copy_plans,
        };

        self.write_report(&result)?;
        info!(
            "Run finished: {} processed, {} errors, {} skipped, {} removed in {:.1}s",
            result.processed, result.errors, result.skipped, result.removed, result.duration_secs
        );
        Ok(result)
    }

    /// Phase 1: fetch database definitions on both sides, then enumerate
    /// tables with one concurrent task per database. Any task error fails
    /// the phase; the run aborts before touching either cluster further.
    fn collect(&self) -> Result<BTreeMap<String, DatabaseRecord>> {
        info!("Phase 1: collecting metadata for {} database(s)", self.config.databases.len());
        let filter = TableFilter::from_config(&self.config)?;
        let mut records: BTreeMap<String, DatabaseRecord> = BTreeMap::new();
        let mut enumerable: Vec<String> = Vec::new();

        for db in &self.config.databases {
            let mut record = DatabaseRecord::new(db.clone());

            let (left_connected, left_def) =
                with_connection(self.clusters.as_ref(), Side::Left, |conn| match conn {
                    Some(c) => Ok((true, c.fetch_database(db)?)),
                    None => {
                        if self.config.execute {
                            Err(MigrateError::Disconnected("LEFT".to_string()))
                        } else {
                            Ok((false, None))
                        }
                    }
                })?;

            match left_def {
                Some(def) => {
                    record.set_definition(Side::Left, def);
                    enumerable.push(db.clone());
                }
                None if left_connected => {
                    self.codes.raise(MessageCode::DatabaseMissing);
                    record.add_issue(
                        Side::Left,
                        format!("database '{}' does not exist on the source cluster", db),
                    );
                    error!("Database '{}' does not exist on LEFT; skipping it", db);
                }
                None => {
                    record.add_issue(Side::Left, "source cluster disconnected; dry run only");
                }
            }

            with_connection(self.clusters.as_ref(), Side::Right, |conn| {
                match conn {
                    Some(c) => {
                        if let Some(def) = c.fetch_database(db)? {
                            record.set_definition(Side::Right, def);
                        }
                    }
                    None => self.codes.raise(MessageCode::RightDisconnected),
                }
                Ok(())
            })?;

            records.insert(db.clone(), record);
        }

        // Enumeration fan-out, one task per database.
        let pool = WorkerPool::new(DB_POOL_WIDTH.min(enumerable.len().max(1)));
        let clusters = self.clusters.clone();
        let migrate_views = self.config.options.migrate_views;
        let outcomes = pool.run(enumerable, move |db: String| {
            let listings = with_connection(clusters.as_ref(), Side::Left, |conn| match conn {
                Some(c) => c.list_tables(&db),
                None => Ok(Vec::new()),
            });
            (db, listings)
        });

        let mut phase_failed = false;
        for (db, listings) in outcomes {
            match listings {
                Ok(listings) => {
                    let record = records
                        .entry(db.clone())
                        .or_insert_with(|| DatabaseRecord::new(db.clone()));
                    for listing in listings {
                        if listing.is_view && !migrate_views {
                            continue;
                        }
                        let table = record.table_mut(&listing.name);
                        if let FilterDecision::Remove(reason) = filter.name_decision(&listing.name)
                        {
                            if reason.contains("previous run") {
                                self.codes.raise(MessageCode::RemnantTable);
                            }
                            table.mark_removed(reason);
                        } else {
                            table.add_step("collect", "enumerated");
                        }
                    }
                }
                Err(e) => {
                    error!("Table enumeration failed for '{}': {}", db, e);
                    phase_failed = true;
                }
            }
        }

        if phase_failed {
            return Err(MigrateError::Phase {
                phase: "collect".to_string(),
                reason: "one or more table enumeration tasks failed".to_string(),
            });
        }
        Ok(records)
    }

    /// Marks tables already completed in a previous run so they are not
    /// re-processed.
    fn apply_checkpoint(
        &self,
        run_key: &str,
        records: &mut BTreeMap<String, DatabaseRecord>,
    ) -> Result<()> {
        let Some(previous) = self.checkpoint.load(run_key)? else {
            return Ok(());
        };
        let mut skipped = 0usize;
        for prev_db in previous {
            let Some(record) = records.get_mut(&prev_db.name) else {
                continue;
            };
            for (name, prev_table) in prev_db.tables {
                if prev_table.phase != PhaseState::Processed {
                    continue;
                }
                if let Some(table) = record.tables.get_mut(&name) {
                    if table.advance(PhaseState::RetrySkippedPastSuccess) {
                        table.add_step("retry", "completed in a previous run; skipping");
                        skipped += 1;
                    }
                }
            }
        }
        if skipped > 0 {
            info!("Retry: skipping {} table(s) already completed", skipped);
        }
        Ok(())
    }

    /// Phase 2: every database must exist on both sides before any table
    /// transfer may run.
    fn create_databases(&self, records: &mut BTreeMap<String, DatabaseRecord>) -> Result<()> {
        info!("Phase 2: creating databases");
        for record in records.values_mut() {
            if record.definition(Side::Left).is_none() {
                continue;
            }
            let name = record.name.clone();

            record.add_sql(
                Side::Left,
                "Ensure database exists",
                sqlgen::create_database(&name, None, None, &BTreeMap::new()),
            );

            let def = record.definition(Side::Left).cloned().unwrap_or_default();
            let location = match def.get("location") {
                Some(loc) => match self.translator.translate_database_location(loc) {
                    Ok(translated) => Some(translated),
                    Err(e) => {
                        record.add_issue(Side::Right, e.to_string());
                        self.codes.raise(MessageCode::NamespaceMismatch);
                        None
                    }
                },
                None => None,
            };
            let managed = match def.get("managedlocation") {
                Some(loc) => self.translator.translate_database_location(loc).ok(),
                None => None,
            };
            record.add_sql(
                Side::Right,
                "Create database",
                sqlgen::create_database(
                    &name,
                    location.as_deref(),
                    managed.as_deref(),
                    &BTreeMap::new(),
                ),
            );

            if self.config.execute {
                for side in [Side::Left, Side::Right] {
                    let statements: Vec<String> = record
                        .sql
                        .get(&side)
                        .map(|pairs| pairs.iter().map(|p| p.statement.clone()).collect())
                        .unwrap_or_default();
                    let outcome =
                        with_connection(self.clusters.as_ref(), side, |conn| match conn {
                            Some(c) => {
                                for statement in &statements {
                                    c.execute(statement)?;
                                }
                                Ok(())
                            }
                            None => {
                                if side == Side::Right {
                                    self.codes.raise(MessageCode::RightDisconnected);
                                    Ok(())
                                } else {
                                    Err(MigrateError::Disconnected(side.to_string()))
                                }
                            }
                        });
                    if let Err(e) = outcome {
                        return Err(MigrateError::Phase {
                            phase: "create-databases".to_string(),
                            reason: format!("database '{}' on {}: {}", name, side, e),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Phase 3: one concurrent task per table on the wide pool. Any task
    /// error is fatal: metadata is a prerequisite for every later step.
    fn table_metadata(&self, records: &mut BTreeMap<String, DatabaseRecord>) -> Result<()> {
        let filter = Arc::new(TableFilter::from_config(&self.config)?);
        let mut jobs: Vec<(String, TableRecord)> = Vec::new();
        for record in records.values_mut() {
            let tables = std::mem::take(&mut record.tables);
            for (_, table) in tables {
                jobs.push((record.name.clone(), table));
            }
        }
        info!("Phase 3: fetching metadata for {} table(s)", jobs.len());

        let pool = WorkerPool::sized_for(jobs.len(), self.config.options.concurrency);
        let clusters = self.clusters.clone();
        let queries_port = self.queries.clone();
        let shell = self.shell.clone();
        let config = self.config.clone();
        let codes = self.codes.clone();

        let outcomes = pool.run(jobs, move |(db, mut table): (String, TableRecord)| {
            if table.removed || table.phase.is_terminal() {
                return (db, table, None);
            }
            let fatal = fetch_table_metadata(
                &config,
                clusters.as_ref(),
                queries_port.as_ref(),
                shell.as_ref(),
                &codes,
                &filter,
                &db,
                &mut table,
            )
            .err()
            .map(|e| e.to_string());
            (db, table, fatal)
        });

        let mut fatal: Option<String> = None;
        for (db, table, failure) in outcomes {
            if let Some(reason) = failure {
                error!("Metadata fetch failed for {}.{}: {}", db, table.name, reason);
                self.codes.raise(MessageCode::MetadataFetchFailure);
                fatal = Some(format!("{}.{}: {}", db, table.name, reason));
            }
            if let Some(record) = records.get_mut(&db) {
                record.tables.insert(table.name.clone(), table);
            }
        }

        match fatal {
            Some(reason) => Err(MigrateError::Phase {
                phase: "table-metadata".to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Phase 4: dispatch each eligible table to its strategy. Fatal errors
    /// isolate to the table; siblings keep running.
    fn transfer(&self, records: &mut BTreeMap<String, DatabaseRecord>) -> Result<()> {
        let mut jobs: Vec<(String, TableRecord)> = Vec::new();
        for record in records.values_mut() {
            let tables = std::mem::take(&mut record.tables);
            for (_, table) in tables {
                jobs.push((record.name.clone(), table));
            }
        }
        info!("Phase 4: transferring {} table(s)", jobs.len());

        let pool = WorkerPool::sized_for(jobs.len(), self.config.options.concurrency);
        let clusters = self.clusters.clone();
        let config = self.config.clone();
        let translator = self.translator.clone();
        let codes = self.codes.clone();

        let outcomes = pool.run(jobs, move |(db, mut table): (String, TableRecord)| {
            let status = transfer_table(
                &config,
                clusters.as_ref(),
                &translator,
                &codes,
                &db,
                &mut table,
            );
            (db, table, status)
        });

        let mut errors = 0usize;
        for (db, table, status) in outcomes {
            if matches!(status, TaskStatus::Fatal) {
                errors += 1;
            }
            if let Some(record) = records.get_mut(&db) {
                record.tables.insert(table.name.clone(), table);
            }
        }
        if errors > 0 {
            warn!("{} table(s) finished in ERROR; see the run report", errors);
        }
        Ok(())
    }

    fn write_report(&self, result: &RunResult) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = format!("{}/report_{}.json", self.config.output_dir, timestamp);
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, result)?;
        info!("Report written to {}", path);
        Ok(())
    }
}

fn count_phase(records: &[DatabaseRecord], phase: PhaseState) -> usize {
    records
        .iter()
        .flat_map(|d| d.tables.values())
        .filter(|t| t.phase == phase)
        .count()
}

/// Metadata fetch for one table: DDL both sides, partition metadata (fast
/// direct path when available and wanted, `SHOW PARTITIONS` otherwise),
/// filesystem stats, then the non-destructive filters.
#[allow(clippy::too_many_arguments)]
fn fetch_table_metadata(
    config: &AppConfig,
    clusters: &dyn ClusterProvider,
    queries_port: &dyn MetastoreQueries,
    shell: &dyn ShellPool,
    codes: &CodeRegistry,
    filter: &TableFilter,
    db: &str,
    table: &mut TableRecord,
) -> Result<()> {
    let name = table.name.clone();

    // DDL on both sides.
    for side in [Side::Left, Side::Right] {
        with_connection(clusters, side, |conn| {
            let Some(c) = conn else {
                return Ok(());
            };
            match c.fetch_ddl(db, &name)? {
                Some(ddl) => {
                    let location = sqlgen::extract_location(&ddl);
                    let owner = c.fetch_owner(db, &name)?;
                    let env = table.env_mut(side);
                    env.exists = true;
                    env.location = location;
                    env.owner = owner;
                    env.ddl = ddl;
                }
                None => {
                    table.env_mut(side).exists = false;
                }
            }
            Ok(())
        })?;
    }
    table.add_step("metadata", "ddl fetched");

    // Partition metadata, only for partitioned tables.
    let ddl = table.env(Side::Left).map(|e| e.ddl.clone()).unwrap_or_default();
    if !sqlgen::partition_columns(&ddl).is_empty() {
        let want_direct = config.options.evaluate_partition_location
            || (config.transfer.distcp && config.strategy == StrategyKind::StorageMigration);
        let template = queries_port.template(Side::Left, queries::PART_LOCATIONS);
        with_connection(clusters, Side::Left, |conn| {
            let Some(c) = conn else {
                return Ok(());
            };
            match (want_direct, template) {
                (true, Some(template)) => {
                    let sql = queries::bind_template(&template, db, &name);
                    let rows = c.run_query(&sql)?;
                    let locations: BTreeMap<String, String> = rows
                        .into_iter()
                        .filter_map(|row| {
                            let mut cells = row.into_iter();
                            Some((cells.next()?, cells.next()?))
                        })
                        .collect();
                    table.env_mut(Side::Left).set_partition_locations(locations);
                    table.add_step("metadata", "partition locations fetched (direct)");
                }
                _ => {
                    let names = c.show_partitions(db, &name)?;
                    table.env_mut(Side::Left).set_partition_names(names);
                    table.add_step("metadata", "partition names fetched");
                }
            }
            Ok(())
        })?;
    }

    // Filesystem stats, unless skipped or the strategy has no use for them.
    if !config.options.skip_stats_collection && config.strategy.needs_stats() {
        let location = table.env(Side::Left).and_then(|e| e.location.clone());
        if let Some(location) = location {
            match shell.borrow()? {
                Some(mut session) => {
                    let output = session.run(&format!("count {}", location));
                    shell.give_back(session);
                    match output {
                        Ok(out) if !out.failed => {
                            if let Some(stats) = parse_count_output(&out.records) {
                                table.env_mut(Side::Left).stats = stats;
                            }
                        }
                        _ => {
                            codes.raise(MessageCode::StatsUnavailable);
                            table
                                .env_mut(Side::Left)
                                .add_issue("file count command failed; stats unavailable");
                        }
                    }
                }
                None => {
                    codes.raise(MessageCode::StatsUnavailable);
                }
            }
        }
    }

    // Non-destructive filters.
    if let FilterDecision::Remove(reason) = filter.partition_decision(table.partition_count()) {
        table.mark_removed(reason);
        return Ok(());
    }
    let stats = table.env(Side::Left).map(|e| e.stats.clone()).unwrap_or_default();
    if stats.loaded {
        if let FilterDecision::Remove(reason) = filter.size_decision(stats.data_size) {
            table.mark_removed(reason);
        }
    }
    Ok(())
}

/// `<dirs> <files> <bytes>` as printed by a filesystem count command.
fn parse_count_output(records: &[String]) -> Option<TableStats> {
    let first = records.first()?;
    let mut fields = first.split_whitespace();
    let dirs: u64 = fields.next()?.parse().ok()?;
    let files: u64 = fields.next()?.parse().ok()?;
    let bytes: u64 = fields.next()?.parse().ok()?;
    Some(TableStats::from_counts(dirs, files, bytes))
}

/// Transfer of one table: phase bookkeeping, strategy dispatch, optional
/// SQL execution, duration. Returns `Fatal` only for this table.
fn transfer_table(
    config: &AppConfig,
    clusters: &dyn ClusterProvider,
    translator: &Translator,
    codes: &CodeRegistry,
    db: &str,
    table: &mut TableRecord,
) -> TaskStatus {
    if table.removed || table.phase.is_terminal() {
        return TaskStatus::Skipped;
    }
    let start = Instant::now();
    table.advance(PhaseState::Started);
    table.add_step("transfer", "started");

    let kind = strategies::effective_strategy(config, table);
    table.strategy = Some(kind);

    let plan_outcome = {
        let mut ctx = StrategyContext {
            config,
            translator,
            codes,
            database: db,
            table,
        };
        strategies::execute(kind, &mut ctx)
    };

    if let Err(e) = plan_outcome {
        match &e {
            MigrateError::NamespaceMismatch { .. } => {
                codes.raise(MessageCode::NamespaceMismatch)
            }
            MigrateError::Config(_) if kind == StrategyKind::StorageMigration => {
                codes.raise(MessageCode::LocationNotRemapped)
            }
            _ => {}
        }
        table.env_mut(Side::Left).add_error(e.to_string());
        table.advance(PhaseState::Error);
        table.duration_secs = start.elapsed().as_secs_f64();
        error!("Transfer failed for {}.{}: {}", db, table.name, e);
        return TaskStatus::Fatal;
    }

    let apply = config.execute && !table.manual_only;
    table.advance(if apply {
        PhaseState::ApplyingSql
    } else {
        PhaseState::CalculatingSql
    });

    if apply {
        for side in [Side::Left, Side::Right] {
            let pairs: Vec<_> = table
                .env(side)
                .map(|e| {
                    e.sql
                        .iter()
                        .chain(e.cleanup_sql.iter())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if pairs.is_empty() {
                continue;
            }
            let executed = with_connection(clusters, side, |conn| match conn {
                Some(c) => {
                    for pair in &pairs {
                        c.execute(&pair.statement).map_err(|e| {
                            MigrateError::SqlExecution {
                                side: side.to_string(),
                                reason: format!("{}: {}", pair.description, e),
                            }
                        })?;
                    }
                    Ok(true)
                }
                None => Ok(false),
            });
            match executed {
                Ok(true) => {}
                Ok(false) => {
                    // Disconnected side: generated SQL becomes homework.
                    codes.raise(MessageCode::MustRunManually);
                    if side == Side::Right {
                        codes.raise(MessageCode::RightDisconnected);
                    }
                    table.env_mut(side).add_issue(
                        "cluster disconnected; generated SQL must be run manually",
                    );
                }
                Err(e) => {
                    codes.raise(MessageCode::SqlExecutionFailure);
                    table.env_mut(side).add_error(e.to_string());
                    table.advance(PhaseState::Error);
                    table.duration_secs = start.elapsed().as_secs_f64();
                    error!("SQL execution failed for {}.{}: {}", db, table.name, e);
                    return TaskStatus::Fatal;
                }
            }
        }
    }

    table.advance(if table.has_issues() {
        PhaseState::CalculatedSqlWarning
    } else {
        PhaseState::CalculatedSql
    });
    table.advance(PhaseState::Processed);

    // Staging views are ephemeral; drop them now that the table completed.
    table.environments.remove(&Side::Transfer);
    table.environments.remove(&Side::Shadow);

    table.duration_secs = start.elapsed().as_secs_f64();
    table.add_step("transfer", "completed");
    TaskStatus::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ClusterConfig};
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use crate::infrastructure::disconnected::{NoMetastoreQueries, NoShellPool};
    use crate::ports::cluster::TableListing;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MockCluster {
        databases: BTreeMap<String, BTreeMap<String, String>>,
        tables: BTreeMap<String, BTreeMap<String, Vec<String>>>,
        slow_database: Option<String>,
    }

    impl MockCluster {
        fn with_database(mut self, db: &str) -> Self {
            let mut def = BTreeMap::new();
            def.insert(
                "location".to_string(),
                format!("hdfs://left/wh/{}.db", db),
            );
            self.databases.insert(db.to_string(), def);
            self
        }

        fn with_table(mut self, db: &str, table: &str, location: &str) -> Self {
            let ddl = vec![
                format!("CREATE EXTERNAL TABLE `{}`.`{}` (", db, table),
                "  `id` bigint)".to_string(),
                "LOCATION".to_string(),
                format!("  '{}'", location),
            ];
            self.tables
                .entry(db.to_string())
                .or_default()
                .insert(table.to_string(), ddl);
            self
        }
    }

    struct MockConn {
        cluster: MockCluster,
        side: Side,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl MockConn {
        fn log(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ClusterConnection for MockConn {
        fn fetch_database(&mut self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
            Ok(self.cluster.databases.get(name).cloned())
        }

        fn list_tables(&mut self, database: &str) -> Result<Vec<TableListing>> {
            if self.cluster.slow_database.as_deref() == Some(database) {
                std::thread::sleep(Duration::from_millis(150));
            }
            self.log(format!("list:{}:{}", self.side, database));
            Ok(self
                .cluster
                .tables
                .get(database)
                .map(|tables| {
                    tables
                        .keys()
                        .map(|name| TableListing {
                            name: name.clone(),
                            is_view: false,
                        })
                        .collect()
                })
                .unwrap_or_default())
        }

        fn fetch_ddl(&mut self, database: &str, table: &str) -> Result<Option<Vec<String>>> {
            Ok(self
                .cluster
                .tables
                .get(database)
                .and_then(|t| t.get(table))
                .cloned())
        }

        fn fetch_owner(&mut self, _database: &str, _table: &str) -> Result<Option<String>> {
            Ok(Some("etl".to_string()))
        }

        fn show_partitions(&mut self, _database: &str, _table: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn run_query(&mut self, _sql: &str) -> Result<Vec<Vec<String>>> {
            Ok(Vec::new())
        }

        fn execute(&mut self, sql: &str) -> Result<()> {
            let head: String = sql.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
            self.log(format!("execute:{}:{}", self.side, head));
            Ok(())
        }
    }

    struct MockProvider {
        left: Option<MockCluster>,
        right: Option<MockCluster>,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl MockProvider {
        fn new(left: Option<MockCluster>, right: Option<MockCluster>) -> Self {
            Self {
                left,
                right,
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ClusterProvider for MockProvider {
        fn borrow(&self, side: Side) -> Result<Option<Box<dyn ClusterConnection>>> {
            let cluster = match side {
                Side::Left => self.left.clone(),
                Side::Right => self.right.clone(),
                _ => None,
            };
            Ok(cluster.map(|cluster| {
                Box::new(MockConn {
                    cluster,
                    side,
                    events: self.events.clone(),
                }) as Box<dyn ClusterConnection>
            }))
        }

        fn release(&self, _side: Side, _conn: Box<dyn ClusterConnection>) {}
    }

    fn config(databases: &[&str], out_dir: &str) -> AppConfig {
        AppConfig {
            strategy: StrategyKind::SchemaOnly,
            left: ClusterConfig {
                namespace: "hdfs://left".to_string(),
            },
            right: ClusterConfig {
                namespace: "ofs://right".to_string(),
            },
            databases: databases.iter().map(|s| s.to_string()).collect(),
            execute: false,
            output_dir: out_dir.to_string(),
            transfer: Default::default(),
            filter: Default::default(),
            warehouse: Default::default(),
            options: Default::default(),
        }
    }

    fn orchestrator_with(
        config: AppConfig,
        provider: MockProvider,
        checkpoint_dir: &std::path::Path,
    ) -> (Orchestrator, Arc<Mutex<Vec<String>>>) {
        let events = provider.events.clone();
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(provider),
            Arc::new(NoMetastoreQueries),
            Arc::new(NoShellPool),
            Arc::new(FileCheckpointStore::new(checkpoint_dir)),
        );
        (orchestrator, events)
    }

    #[test]
    fn test_phase_barrier_no_create_before_all_enumerations() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster::default()
            .with_database("a")
            .with_database("b")
            .with_database("c")
            .with_table("a", "t1", "hdfs://left/wh/a.db/t1")
            .with_table("b", "t2", "hdfs://left/wh/b.db/t2")
            .with_table("c", "t3", "hdfs://left/wh/c.db/t3");
        let mut slow = cluster.clone();
        slow.slow_database = Some("b".to_string());

        let mut cfg = config(&["a", "b", "c"], dir.path().to_str().unwrap());
        cfg.execute = true;

        let provider = MockProvider::new(Some(slow), Some(MockCluster::default()));
        let (orchestrator, events) = orchestrator_with(cfg, provider, dir.path());
        orchestrator.run("barrier").unwrap();

        let events = events.lock().unwrap().clone();
        let last_list = events
            .iter()
            .rposition(|e| e.starts_with("list:"))
            .expect("enumeration events recorded");
        let first_execute = events
            .iter()
            .position(|e| e.starts_with("execute:"))
            .expect("create-database events recorded");
        // One slow enumeration must not let database creation start early.
        assert!(
            last_list < first_execute,
            "expected all enumerations before any DDL execution, got {:?}",
            events
        );
    }

    #[test]
    fn test_partial_failure_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let mut cluster = MockCluster::default().with_database("sales");
        for i in 1..=5 {
            // Table #3 carries a location outside the source namespace;
            // its translation fails hard, for that table only.
            let location = if i == 3 {
                "s3a://elsewhere/t3".to_string()
            } else {
                format!("hdfs://left/wh/sales.db/t{}", i)
            };
            cluster = cluster.with_table("sales", &format!("t{}", i), &location);
        }

        let cfg = config(&["sales"], dir.path().to_str().unwrap());
        let provider = MockProvider::new(Some(cluster), None);
        let (orchestrator, _) = orchestrator_with(cfg, provider, dir.path());
        let result = orchestrator.run("partial").unwrap();

        assert_eq!(result.processed, 4);
        assert_eq!(result.errors, 1);
        let sales = &result.records[0];
        assert_eq!(sales.tables["t3"].phase, PhaseState::Error);
        for name in ["t1", "t2", "t4", "t5"] {
            assert_eq!(sales.tables[name].phase, PhaseState::Processed, "{}", name);
        }
        assert!(result
            .raised_codes
            .contains(&MessageCode::NamespaceMismatch));
    }

    #[test]
    fn test_filter_exclusion_is_non_destructive() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster::default()
            .with_database("sales")
            .with_table("sales", "orders", "hdfs://left/wh/sales.db/orders")
            .with_table(
                "sales",
                "orders_storage_migration",
                "hdfs://left/wh/sales.db/orders_storage_migration",
            );

        let cfg = config(&["sales"], dir.path().to_str().unwrap());
        let provider = MockProvider::new(Some(cluster), None);
        let (orchestrator, _) = orchestrator_with(cfg, provider, dir.path());
        let result = orchestrator.run("filters").unwrap();

        let sales = &result.records[0];
        let remnant = &sales.tables["orders_storage_migration"];
        assert!(remnant.removed);
        assert!(remnant
            .remove_reason
            .as_deref()
            .unwrap()
            .contains("previous run"));
        assert_eq!(remnant.phase, PhaseState::Init);
        assert_eq!(result.removed, 1);
        assert_eq!(result.processed, 1);
        assert!(result.raised_codes.contains(&MessageCode::RemnantTable));
    }

    #[test]
    fn test_retry_skips_previously_processed_tables() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster::default()
            .with_database("sales")
            .with_table("sales", "t1", "hdfs://left/wh/sales.db/t1")
            .with_table("sales", "t2", "hdfs://left/wh/sales.db/t2");

        let cfg = config(&["sales"], dir.path().to_str().unwrap());
        let provider = MockProvider::new(Some(cluster.clone()), None);
        let (orchestrator, _) = orchestrator_with(cfg.clone(), provider, dir.path());
        let first = orchestrator.run("retry").unwrap();
        assert_eq!(first.processed, 2);

        let provider = MockProvider::new(Some(cluster), None);
        let (orchestrator, _) = orchestrator_with(cfg, provider, dir.path());
        let second = orchestrator.run("retry").unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn test_missing_database_is_flagged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster::default()
            .with_database("sales")
            .with_table("sales", "t1", "hdfs://left/wh/sales.db/t1");

        let cfg = config(&["sales", "ghost"], dir.path().to_str().unwrap());
        let provider = MockProvider::new(Some(cluster), None);
        let (orchestrator, _) = orchestrator_with(cfg, provider, dir.path());
        let result = orchestrator.run("missing").unwrap();

        assert!(result.raised_codes.contains(&MessageCode::DatabaseMissing));
        let ghost = result
            .records
            .iter()
            .find(|d| d.name == "ghost")
            .expect("ghost database stays visible");
        assert!(!ghost.issues[&Side::Left].is_empty());
        assert!(ghost.tables.is_empty());
        // The existing database still migrated.
        assert_eq!(result.processed, 1);
    }

    #[test]
    fn test_dry_run_with_disconnected_right_raises_code() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster::default()
            .with_database("sales")
            .with_table("sales", "t1", "hdfs://left/wh/sales.db/t1");

        let cfg = config(&["sales"], dir.path().to_str().unwrap());
        let provider = MockProvider::new(Some(cluster), None);
        let (orchestrator, _) = orchestrator_with(cfg, provider, dir.path());
        let result = orchestrator.run("dry").unwrap();

        assert!(result
            .raised_codes
            .contains(&MessageCode::RightDisconnected));
        // SQL was still fully generated.
        let t1 = &result.records[0].tables["t1"];
        assert!(!t1.env(Side::Right).unwrap().sql.is_empty());
        assert_eq!(t1.phase, PhaseState::Processed);
    }

    #[test]
    fn test_parse_count_output() {
        let stats = parse_count_output(&["   4   120   1048576  hdfs://left/x".to_string()])
            .unwrap();
        assert_eq!(stats.dirs, 4);
        assert_eq!(stats.files, 120);
        assert_eq!(stats.data_size, 1_048_576);
        assert!(parse_count_output(&["garbage".to_string()]).is_none());
    }
}
