//! Per-table migration lifecycle state machine.
//!
//! A table's phase only moves forward. The orchestrator is the sole writer;
//! strategies and the translator append issues/errors/SQL but never touch
//! the phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of one table within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseState {
    Init,
    Started,
    /// Dry-run branch: SQL is being generated but not executed.
    CalculatingSql,
    /// Live branch: generated SQL is being executed against the clusters.
    ApplyingSql,
    CalculatedSql,
    /// SQL was generated but non-fatal issues were recorded along the way.
    CalculatedSqlWarning,
    Processed,
    Error,
    /// Rerun shortcut: the checkpoint shows this table already completed.
    RetrySkippedPastSuccess,
}

impl PhaseState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhaseState::Processed | PhaseState::Error | PhaseState::RetrySkippedPastSuccess
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// `Error` is reachable from any non-terminal state;
    /// `RetrySkippedPastSuccess` only from `Init`. Everything else follows
    /// the forward chain.
    pub fn can_advance(&self, next: PhaseState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PhaseState::Error => true,
            PhaseState::RetrySkippedPastSuccess => *self == PhaseState::Init,
            PhaseState::Started => *self == PhaseState::Init,
            PhaseState::CalculatingSql | PhaseState::ApplyingSql => *self == PhaseState::Started,
            PhaseState::CalculatedSql | PhaseState::CalculatedSqlWarning => {
                matches!(self, PhaseState::CalculatingSql | PhaseState::ApplyingSql)
            }
            PhaseState::Processed => {
                matches!(
                    self,
                    PhaseState::CalculatedSql | PhaseState::CalculatedSqlWarning
                )
            }
            PhaseState::Init => false,
        }
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        PhaseState::Init
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseState::Init => "INIT",
            PhaseState::Started => "STARTED",
            PhaseState::CalculatingSql => "CALCULATING_SQL",
            PhaseState::ApplyingSql => "APPLYING_SQL",
            PhaseState::CalculatedSql => "CALCULATED_SQL",
            PhaseState::CalculatedSqlWarning => "CALCULATED_SQL_WARNING",
            PhaseState::Processed => "PROCESSED",
            PhaseState::Error => "ERROR",
            PhaseState::RetrySkippedPastSuccess => "RETRY_SKIPPED_PAST_SUCCESS",
        };
        write!(f, "{}", s)
    }
}
