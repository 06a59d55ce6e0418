//! Always-disconnected collaborators.
//!
//! Dry runs are a first-class mode: with these providers the orchestrator
//! still performs full translation and SQL generation, surfacing issues
//! without side effects. Also the default wiring when no real cluster
//! adapter has been plugged into the ports.

use crate::domain::errors::Result;
use crate::domain::side::Side;
use crate::ports::cluster::{ClusterConnection, ClusterProvider};
use crate::ports::queries::MetastoreQueries;
use crate::ports::shell::{ShellPool, ShellSession};

/// `borrow` always returns `None`.
pub struct DisconnectedProvider;

impl ClusterProvider for DisconnectedProvider {
    fn borrow(&self, _side: Side) -> Result<Option<Box<dyn ClusterConnection>>> {
        Ok(None)
    }

    fn release(&self, _side: Side, _conn: Box<dyn ClusterConnection>) {}
}

/// No direct-metastore query templates available; callers fall back to the
/// per-table path.
pub struct NoMetastoreQueries;

impl MetastoreQueries for NoMetastoreQueries {
    fn template(&self, _side: Side, _name: &str) -> Option<String> {
        None
    }
}

/// No shell access; stats collection degrades to an issue.
pub struct NoShellPool;

impl ShellPool for NoShellPool {
    fn borrow(&self) -> Result<Option<Box<dyn ShellSession>>> {
        Ok(None)
    }

    fn give_back(&self, _session: Box<dyn ShellSession>) {}
}
