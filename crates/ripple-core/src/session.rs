//! Caller-facing analysis session.
//!
//! Wires the cached graph, coverage mapping, impact analyzer, gate, and
//! ledger behind one constructed object. Change proposals come from an
//! external `ChangeProposer`; this crate contains no proposal logic.

use std::path::Path;

use crate::config::AnalysisConfig;
use crate::errors::RippleResult;
use crate::graph::DependencyGraph;
use crate::models::{ImpactAnalysis, ImprovementAction, QualityGateApproval};
use crate::query::coverage::{ConventionCoverage, CoverageProvider};
use crate::query::gate::QualityGate;
use crate::query::impact::ImpactAnalyzer;
use crate::store::cache::GraphCache;
use crate::store::ledger::ChangeLedger;

/// External source of improvement proposals (an LLM-driven improver, a
/// rules engine, a fixture in tests). The session only consumes its
/// output.
pub trait ChangeProposer {
    fn propose(&self, graph: &DependencyGraph) -> Vec<ImprovementAction>;
}

/// One single-threaded analysis session over an immutable graph snapshot.
pub struct ImprovementSession {
    config: AnalysisConfig,
    graph: DependencyGraph,
    coverage: Box<dyn CoverageProvider>,
    gate: QualityGate,
    ledger: ChangeLedger,
}

impl ImprovementSession {
    /// Open a session for the source tree at `root`: load or build the
    /// graph via the cache, scan test coverage by naming convention, and
    /// open the durable ledger.
    pub fn open(root: &Path, config: AnalysisConfig) -> RippleResult<ImprovementSession> {
        let cache = GraphCache::new(&config.cache_path);
        let graph = cache.load_or_build(root)?;
        let coverage = Box::new(ConventionCoverage::scan(root)?);
        let gate = QualityGate::new(&config);
        let ledger = ChangeLedger::open(&config)?;
        Ok(ImprovementSession {
            config,
            graph,
            coverage,
            gate,
            ledger,
        })
    }

    /// Open with an explicit coverage provider instead of the convention
    /// scan.
    pub fn open_with_coverage(
        root: &Path,
        config: AnalysisConfig,
        coverage: Box<dyn CoverageProvider>,
    ) -> RippleResult<ImprovementSession> {
        let cache = GraphCache::new(&config.cache_path);
        let graph = cache.load_or_build(root)?;
        let gate = QualityGate::new(&config);
        let ledger = ChangeLedger::open(&config)?;
        Ok(ImprovementSession {
            config,
            graph,
            coverage,
            gate,
            ledger,
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// Compute the blast radius of a set of proposed actions.
    pub fn analyze(&self, actions: &[ImprovementAction]) -> ImpactAnalysis {
        ImpactAnalyzer::new(&self.graph, &self.config, self.coverage.as_ref()).analyze(actions)
    }

    /// Gate an impact analysis against a proposer confidence score.
    pub fn evaluate(&self, impact: &ImpactAnalysis, confidence: f64) -> QualityGateApproval {
        self.gate.evaluate(impact, confidence)
    }

    /// Analyze and gate in one step, using the least confident action as
    /// the effective confidence. Empty proposals and actions carrying an
    /// invalid confidence score are rejected outright.
    pub fn review(
        &self,
        actions: &[ImprovementAction],
    ) -> (ImpactAnalysis, QualityGateApproval) {
        let impact = self.analyze(actions);
        if actions.is_empty() {
            return (
                impact,
                QualityGateApproval {
                    passed: false,
                    feedback: "No actions proposed".to_string(),
                },
            );
        }
        if let Err(e) = actions.iter().try_for_each(ImprovementAction::validate) {
            return (
                impact,
                QualityGateApproval {
                    passed: false,
                    feedback: e.to_string(),
                },
            );
        }
        let confidence = actions
            .iter()
            .map(|a| a.confidence_score)
            .fold(f64::INFINITY, f64::min);
        let approval = self.evaluate(&impact, confidence);
        (impact, approval)
    }
}
