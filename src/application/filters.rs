//! Shared table filtering helpers.
//!
//! Filtering never deletes a record: excluded tables are flagged with a
//! reason and stay visible in reports.

use regex::Regex;

use crate::config::AppConfig;
use crate::domain::errors::Result;

/// Outcome of one filter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Remove(String),
}

impl FilterDecision {
    pub fn is_remove(&self) -> bool {
        matches!(self, FilterDecision::Remove(_))
    }
}

/// Compiled per-run table filters.
pub struct TableFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
    transfer_prefix: String,
    storage_migration_postfix: String,
    partition_limit: Option<usize>,
    size_limit: Option<u64>,
}

impl TableFilter {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let include = config
            .filter
            .table_include
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let exclude = config
            .filter
            .table_exclude
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            include,
            exclude,
            transfer_prefix: config.transfer.transfer_prefix.clone(),
            storage_migration_postfix: config.transfer.storage_migration_postfix.clone(),
            partition_limit: config.filter.partition_limit,
            size_limit: config.filter.size_limit,
        })
    }

    /// Name-level checks applied at enumeration time: remnants of earlier
    /// runs first, then the inclusion/exclusion regex. Inclusion takes
    /// precedence when both patterns are configured.
    pub fn name_decision(&self, table: &str) -> FilterDecision {
        if table.starts_with(&self.transfer_prefix) {
            return FilterDecision::Remove(format!(
                "name carries the transfer prefix '{}'; remnant of a previous run",
                self.transfer_prefix
            ));
        }
        if table.ends_with(&self.storage_migration_postfix) {
            return FilterDecision::Remove(format!(
                "name carries the storage migration postfix '{}'; remnant of a previous run",
                self.storage_migration_postfix
            ));
        }
        if let Some(include) = &self.include {
            if !include.is_match(table) {
                return FilterDecision::Remove(format!(
                    "does not match inclusion filter '{}'",
                    include.as_str()
                ));
            }
            return FilterDecision::Keep;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(table) {
                return FilterDecision::Remove(format!(
                    "matches exclusion filter '{}'",
                    exclude.as_str()
                ));
            }
        }
        FilterDecision::Keep
    }

    pub fn partition_decision(&self, partition_count: usize) -> FilterDecision {
        match self.partition_limit {
            Some(limit) if partition_count > limit => FilterDecision::Remove(format!(
                "partition count {} exceeds the configured limit {}",
                partition_count, limit
            )),
            _ => FilterDecision::Keep,
        }
    }

    pub fn size_decision(&self, data_size: u64) -> FilterDecision {
        match self.size_limit {
            Some(limit) if data_size > limit => FilterDecision::Remove(format!(
                "data size {} exceeds the configured limit {}",
                data_size, limit
            )),
            _ => FilterDecision::Keep,
        }
    }
}
