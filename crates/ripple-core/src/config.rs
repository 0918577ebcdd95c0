//! Typed analysis configuration.
//!
//! All tunables live here and are passed into components explicitly; there
//! is no module-level state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default blast-radius ceiling: analyses touching this many candidate
/// nodes or more are rejected.
pub const DEFAULT_MAX_CIS_SIZE: usize = 20;

/// Default test-coverage floor over the affected set. Coverage at or below
/// this value fails the gate.
pub const DEFAULT_MIN_TEST_COVERAGE: f64 = 0.80;

/// Default proposer-confidence floor. Confidence below this value fails the
/// gate; the boundary itself passes.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.70;

/// Default bounded traversal depth for impact-set generation.
pub const DEFAULT_TRAVERSAL_DEPTH: i64 = 2;

/// Default per-session change quota.
pub const DEFAULT_MAX_CHANGES_PER_SESSION: usize = 5;

/// Configuration for one analysis session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub max_cis_size: usize,
    pub min_test_coverage: f64,
    pub min_confidence: f64,
    pub traversal_depth: i64,
    pub max_changes_per_session: usize,
    /// Directory receiving timestamped pre-change file backups.
    pub backup_dir: PathBuf,
    /// Location of the serialized graph snapshot.
    pub cache_path: PathBuf,
    /// Location of the durable change ledger.
    pub ledger_path: PathBuf,
    /// Node ids (exact or `*`/`?` glob patterns) considered critical.
    pub critical_nodes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let base = std::env::temp_dir().join("ripple");
        AnalysisConfig {
            max_cis_size: DEFAULT_MAX_CIS_SIZE,
            min_test_coverage: DEFAULT_MIN_TEST_COVERAGE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            traversal_depth: DEFAULT_TRAVERSAL_DEPTH,
            max_changes_per_session: DEFAULT_MAX_CHANGES_PER_SESSION,
            backup_dir: base.join("backups"),
            cache_path: base.join("graph_cache.json"),
            ledger_path: base.join("ledger.db"),
            critical_nodes: Vec::new(),
        }
    }
}
