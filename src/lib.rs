//! # metamigrate
//!
//! Plans and executes table/database metadata migrations between two
//! independently-administered metastore clusters (LEFT, the source, and
//! RIGHT, the target), reconciling schema, storage location, partition
//! layout, and ownership across differing namespaces and warehouse
//! conventions.
//!
//! The crate follows a ports-and-adapters layout: the core orchestration
//! and translation logic is written purely against the traits in
//! [`ports`], so cluster drivers, shell access, and checkpoint stores plug
//! in from outside.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod translator;

pub use application::orchestrator::{Orchestrator, RunResult};
pub use config::{AppConfig, CliArgs};
pub use domain::errors::{MigrateError, Result};
pub use domain::strategy::StrategyKind;
