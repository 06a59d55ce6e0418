//! Warning and error codes surfaced in the end-of-run summary.
//!
//! Individual issues live on the table/database records; the registry here
//! only tracks *which* codes were raised anywhere in the run so the summary
//! can print one line per condition instead of thousands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Stable condition codes. Warnings are < 100, errors >= 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCode {
    // Warnings
    RightDisconnected,
    MustRunManually,
    UntranslatablePartitionLocation,
    WarehousePolicyMismatch,
    SqlPartitionLimitExceeded,
    AcidPartitionLimitExceeded,
    RemnantTable,
    StatsUnavailable,
    // Errors
    DatabaseMissing,
    NamespaceMismatch,
    LocationNotRemapped,
    SqlExecutionFailure,
    MetadataFetchFailure,
}

impl MessageCode {
    pub fn code(&self) -> u16 {
        match self {
            MessageCode::RightDisconnected => 10,
            MessageCode::MustRunManually => 11,
            MessageCode::UntranslatablePartitionLocation => 12,
            MessageCode::WarehousePolicyMismatch => 13,
            MessageCode::SqlPartitionLimitExceeded => 14,
            MessageCode::AcidPartitionLimitExceeded => 15,
            MessageCode::RemnantTable => 16,
            MessageCode::StatsUnavailable => 17,
            MessageCode::DatabaseMissing => 100,
            MessageCode::NamespaceMismatch => 101,
            MessageCode::LocationNotRemapped => 102,
            MessageCode::SqlExecutionFailure => 103,
            MessageCode::MetadataFetchFailure => 104,
        }
    }

    pub fn is_error(&self) -> bool {
        self.code() >= 100
    }

    pub fn description(&self) -> &'static str {
        match self {
            MessageCode::RightDisconnected => {
                "The target cluster is not connected; RIGHT statements were generated but must be run manually"
            }
            MessageCode::MustRunManually => {
                "Automatic execution was disabled for at least one table; review the generated SQL"
            }
            MessageCode::UntranslatablePartitionLocation => {
                "One or more partition locations were null, empty, or never loaded and could not be translated"
            }
            MessageCode::WarehousePolicyMismatch => {
                "A translated location does not land under the expected warehouse directory"
            }
            MessageCode::SqlPartitionLimitExceeded => {
                "Partition count exceeds the SQL strategy limit; execution disabled for the table"
            }
            MessageCode::AcidPartitionLimitExceeded => {
                "Partition count exceeds the ACID strategy limit; execution disabled for the table"
            }
            MessageCode::RemnantTable => {
                "A table left behind by a previous run was found and flagged for removal from processing"
            }
            MessageCode::StatsUnavailable => "Filesystem statistics could not be collected",
            MessageCode::DatabaseMissing => "A requested database does not exist on the source cluster",
            MessageCode::NamespaceMismatch => {
                "A location does not start with the configured source namespace"
            }
            MessageCode::LocationNotRemapped => {
                "Storage migration within the same namespace produced no location change"
            }
            MessageCode::SqlExecutionFailure => "A generated SQL statement failed to execute",
            MessageCode::MetadataFetchFailure => "Table metadata could not be fetched",
        }
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:03}] {}", self.code(), self.description())
    }
}

/// Run-wide, thread-safe collector of raised codes.
#[derive(Clone, Default)]
pub struct CodeRegistry {
    raised: Arc<Mutex<BTreeSet<MessageCode>>>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, code: MessageCode) {
        if let Ok(mut set) = self.raised.lock() {
            set.insert(code);
        }
    }

    pub fn raised(&self) -> Vec<MessageCode> {
        self.raised
            .lock()
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has(&self, code: MessageCode) -> bool {
        self.raised
            .lock()
            .map(|set| set.contains(&code))
            .unwrap_or(false)
    }

    pub fn error_count(&self) -> usize {
        self.raised().iter().filter(|c| c.is_error()).count()
    }
}
