//! Core data model: graph nodes and edges, proposed change actions,
//! impact analysis results, gate decisions, and ledger records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{RippleError, RippleResult};

// ---------------------------------------------------------------------------
// Graph node / edge types
// ---------------------------------------------------------------------------

/// Node kinds in the dependency graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Module,
    Function,
    Class,
}

/// Edge kinds representing different dependency relationships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Imports,
    Calls,
    Inherits,
}

/// A uniquely addressable code entity (module, function, or class).
///
/// `node_id` is a dotted path: `module`, `module.func`, `module.Class`,
/// or `module.Class.method`. Unique within one graph snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeUnit {
    pub node_id: String,
    pub node_type: NodeType,
    pub file_path: String,
    pub start_line: i64,
    pub end_line: i64,
}

/// A directed "depends on" relation between two nodes in the same snapshot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub line_number: i64,
}

// ---------------------------------------------------------------------------
// Proposed changes
// ---------------------------------------------------------------------------

/// Categories of proposed code changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ModifyPrompt,
    AdjustParameter,
    AddTool,
    CreateAgent,
}

/// A single proposed code change, produced by an external proposer.
///
/// `old_value` and `new_value` are opaque content strings; the core never
/// interprets them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImprovementAction {
    pub action_type: ActionType,
    /// Node id (or symbolic name) of the unit being changed.
    pub target: String,
    pub old_value: String,
    pub new_value: String,
    pub rationale: String,
    /// Proposer confidence in [0, 1].
    pub confidence_score: f64,
}

impl ImprovementAction {
    /// Check the confidence-score invariant: must be a real number in [0, 1].
    pub fn validate(&self) -> RippleResult<()> {
        if !self.confidence_score.is_finite()
            || self.confidence_score < 0.0
            || self.confidence_score > 1.0
        {
            return Err(RippleError::Config(format!(
                "confidence_score {} for target '{}' is outside [0, 1]",
                self.confidence_score, self.target
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Impact analysis
// ---------------------------------------------------------------------------

/// Result of one impact-analysis run. Ephemeral; recomputed per proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// Starting Impact Set: node ids directly targeted by the actions.
    pub sis: BTreeSet<String>,
    /// Candidate Impact Set: nodes reachable from the SIS by bounded
    /// reverse traversal. Disjoint from `sis` by construction.
    pub cis: BTreeSet<String>,
    pub cis_size: usize,
    /// True if any node in SIS ∪ CIS matches the configured critical set.
    pub critical_affected: bool,
    /// Fraction of affected nodes with an associated test; 1.0 when the
    /// affected set is empty.
    pub test_coverage: f64,
    /// Human-readable impact report.
    pub report: String,
}

/// Approve/reject decision over an impact analysis plus a confidence score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityGateApproval {
    pub passed: bool,
    /// Names each failed threshold with the offending value, or carries
    /// warning notes on a pass.
    pub feedback: String,
}

// ---------------------------------------------------------------------------
// Change ledger
// ---------------------------------------------------------------------------

/// Lifecycle of one ledger entry: PENDING → {APPLIED, FAILED},
/// APPLIED → ROLLED_BACK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Pending,
    Applied,
    Failed,
    RolledBack,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Applied => "applied",
            ChangeStatus::Failed => "failed",
            ChangeStatus::RolledBack => "rolled_back",
        }
    }

    pub fn parse(value: &str) -> RippleResult<ChangeStatus> {
        match value {
            "pending" => Ok(ChangeStatus::Pending),
            "applied" => Ok(ChangeStatus::Applied),
            "failed" => Ok(ChangeStatus::Failed),
            "rolled_back" => Ok(ChangeStatus::RolledBack),
            other => Err(RippleError::Ledger(format!(
                "unknown change status: {other}"
            ))),
        }
    }
}

/// One append-only ledger entry. Only `status` ever mutates, and only to
/// `RolledBack`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub change_id: String,
    pub action: ImprovementAction,
    pub status: ChangeStatus,
    /// ISO-8601 creation time.
    pub timestamp: String,
    pub files_modified: Vec<String>,
    /// Set when the change reached APPLIED. Required for rollback.
    pub backup_path: Option<String>,
    pub error_message: Option<String>,
}

/// Aggregate ledger counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_changes: usize,
    pub applied: usize,
    pub failed: usize,
    pub rolled_back: usize,
    /// applied / total, 0.0 when the ledger is empty.
    pub success_rate: f64,
    pub session_count: usize,
    pub session_quota: usize,
    pub quota_remaining: usize,
}
