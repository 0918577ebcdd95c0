//! Ripple core library — change impact analysis over a static dependency
//! graph.
//!
//! The crate indexes a Python source tree into a versioned, cached
//! dependency graph, computes the blast radius of proposed changes by
//! bounded reverse traversal, gates proposals against configurable safety
//! thresholds, and records applied changes in a durable ledger with
//! backup-based rollback.

pub mod config;
pub mod errors;
pub mod graph;
pub mod indexer;
pub mod models;
pub mod query;
pub mod session;
pub mod store;

pub use config::AnalysisConfig;
pub use errors::{RippleError, RippleResult};
pub use graph::{build_graph, DependencyGraph};
pub use models::{
    ActionType, ChangeRecord, ChangeStatus, CodeUnit, DependencyEdge, EdgeType, ImpactAnalysis,
    ImprovementAction, LedgerStats, NodeType, QualityGateApproval,
};
pub use query::coverage::{ConventionCoverage, CoverageProvider, StaticCoverage};
pub use query::gate::QualityGate;
pub use query::impact::ImpactAnalyzer;
pub use session::{ChangeProposer, ImprovementSession};
pub use store::cache::GraphCache;
pub use store::ledger::ChangeLedger;
