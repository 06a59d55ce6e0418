//! Named direct-metastore query templates.
//!
//! When a template is available for a side, the orchestrator can pull
//! partition locations straight from the metastore backend instead of the
//! slower per-table `SHOW PARTITIONS` path.

use crate::domain::side::Side;

/// Partition spec -> location lookup. Placeholders: `{db}`, `{table}`.
pub const PART_LOCATIONS: &str = "part_locations";

pub trait MetastoreQueries: Send + Sync {
    /// Returns the query template for a named lookup, or `None` when the
    /// direct path is unavailable on that side.
    fn template(&self, side: Side, name: &str) -> Option<String>;
}

/// Substitutes the `{db}` / `{table}` placeholders.
pub fn bind_template(template: &str, database: &str, table: &str) -> String {
    template.replace("{db}", database).replace("{table}", table)
}
