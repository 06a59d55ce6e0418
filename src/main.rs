use clap::Parser;
use log::{error, info};
use metamigrate::application::orchestrator::Orchestrator;
use metamigrate::config::{AppConfig, CliArgs};
use metamigrate::infrastructure::checkpoint::FileCheckpointStore;
use metamigrate::infrastructure::disconnected::{
    DisconnectedProvider, NoMetastoreQueries, NoShellPool,
};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match AppConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };

    // Merge CLI overrides
    if let Err(e) = config.merge_cli(&args) {
        error!("Invalid argument: {}", e);
        process::exit(1);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    let run_key = args.run_key.clone().unwrap_or_else(|| {
        let mut dbs = config.databases.clone();
        dbs.sort();
        dbs.join("_")
    });

    // 4. Wire the collaborator ports. Real cluster/shell adapters are
    //    integrations supplied by the embedding deployment; out of the box
    //    the binary runs in disconnected dry-run mode, which still produces
    //    the full translation, SQL plan, and report.
    let checkpoint = Arc::new(FileCheckpointStore::new(config.output_dir.clone()));
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(DisconnectedProvider),
        Arc::new(NoMetastoreQueries),
        Arc::new(NoShellPool),
        checkpoint,
    );

    // 5. Run
    info!("Starting migration...");
    match orchestrator.run(&run_key) {
        Ok(result) => {
            info!(
                "Migration finished. {} processed, {} errors, {} skipped.",
                result.processed, result.errors, result.skipped
            );
            for code in &result.raised_codes {
                info!("{}", code);
            }
            if result.errors > 0 {
                process::exit(2);
            }
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            process::exit(1);
        }
    }
}
