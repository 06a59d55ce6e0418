//! Copy-plan consolidation.
//!
//! Turns the translation history for one (database, side) into the fewest
//! bulk-copy instructions: many sources whose translated parents collapse
//! to the same target directory become a single manifest-backed copy.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::side::Side;
use crate::translator::history::LocationHistory;

/// One bulk-copy instruction.
///
/// The split matters: the external copy tool preserves the last path
/// segment of each source when driven by a manifest file, but a direct
/// single-source copy does not, so direct targets carry the source's last
/// segment pre-appended. The two shapes are intentionally not unified.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyInstruction {
    Direct {
        source: String,
        target: String,
    },
    /// Sources are meant to be written to a manifest file consumed by a
    /// copy-with-manifest job.
    Manifest {
        sources: Vec<String>,
        target: String,
    },
}

/// The consolidated copy plan for one database on one side.
#[derive(Debug, Clone, Serialize)]
pub struct CopyPlan {
    pub database: String,
    pub side: Side,
    pub instructions: Vec<CopyInstruction>,
}

/// Strips `level` trailing path segments. Never reduces past the
/// `scheme://authority` root.
pub fn reduce_url_by(url: &str, level: usize) -> String {
    let floor = url.find("://").map(|i| i + 3).unwrap_or(0);
    let mut out = url.to_string();
    for _ in 0..level {
        match out.rfind('/') {
            Some(idx) if idx > floor => out.truncate(idx),
            _ => break,
        }
    }
    out
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Groups history entries by reduced target, collecting the original
/// source locations that land there.
pub fn build_plan(
    history: &LocationHistory,
    database: &str,
    side: Side,
    consolidation_level: usize,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut grouping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in history.entries(database, side) {
        let reduced_target = reduce_url_by(&entry.translated, consolidation_level);
        grouping
            .entry(reduced_target)
            .or_default()
            .insert(entry.original);
    }
    grouping
}

/// Renders a grouping into copy instructions.
pub fn render_instructions(grouping: BTreeMap<String, BTreeSet<String>>) -> Vec<CopyInstruction> {
    let mut instructions = Vec::new();
    for (target, sources) in grouping {
        if sources.len() == 1 {
            let source = sources.into_iter().next().unwrap_or_default();
            let target = if target.ends_with('/') {
                target
            } else {
                format!("{}/{}", target, last_segment(&source))
            };
            instructions.push(CopyInstruction::Direct { source, target });
        } else {
            instructions.push(CopyInstruction::Manifest {
                sources: sources.into_iter().collect(),
                target,
            });
        }
    }
    instructions
}

/// Convenience wrapper: plan for one (database, side).
pub fn plan_for(
    history: &LocationHistory,
    database: &str,
    side: Side,
    consolidation_level: usize,
) -> CopyPlan {
    let grouping = build_plan(history, database, side, consolidation_level);
    CopyPlan {
        database: database.to_string(),
        side,
        instructions: render_instructions(grouping),
    }
}
