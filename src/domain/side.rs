//! Logical sides of a migration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical side of the migration.
///
/// `Left` is the source cluster and `Right` the target cluster. `Transfer`
/// and `Shadow` are ephemeral staging views used only by strategies that
/// need an intermediate table; they are never persisted once a table's
/// migration completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Left,
    Right,
    Transfer,
    Shadow,
}

impl Side {
    /// True for the two real clusters, false for staging views.
    pub fn is_cluster(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "LEFT"),
            Side::Right => write!(f, "RIGHT"),
            Side::Transfer => write!(f, "TRANSFER"),
            Side::Shadow => write!(f, "SHADOW"),
        }
    }
}
