//! Blast-radius computation for proposed changes.
//!
//! Impact flows to dependents: changing a unit affects the things that
//! call or import it, found by bounded reverse traversal from the
//! Starting Impact Set.

use std::collections::BTreeSet;

use crate::config::AnalysisConfig;
use crate::graph::DependencyGraph;
use crate::indexer::filesystem::glob_match;
use crate::models::{CodeUnit, ImpactAnalysis, ImprovementAction};
use crate::query::coverage::CoverageProvider;

/// Computes `ImpactAnalysis` results over one graph snapshot.
///
/// Pure with respect to its inputs: the same graph, configuration, and
/// actions always produce an identical analysis.
pub struct ImpactAnalyzer<'a> {
    graph: &'a DependencyGraph,
    config: &'a AnalysisConfig,
    coverage: &'a dyn CoverageProvider,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        config: &'a AnalysisConfig,
        coverage: &'a dyn CoverageProvider,
    ) -> ImpactAnalyzer<'a> {
        ImpactAnalyzer {
            graph,
            config,
            coverage,
        }
    }

    /// Compute the impact of a set of proposed actions.
    ///
    /// An action whose target is absent from the graph contributes nothing
    /// to the SIS (logged warning); it never aborts the analysis.
    pub fn analyze(&self, actions: &[ImprovementAction]) -> ImpactAnalysis {
        let mut sis: BTreeSet<String> = BTreeSet::new();
        for action in actions {
            if self.graph.contains(&action.target) {
                sis.insert(action.target.clone());
            } else {
                tracing::warn!(
                    "action target '{}' not present in graph; skipping",
                    action.target
                );
            }
        }

        let mut cis: BTreeSet<String> = BTreeSet::new();
        for node_id in &sis {
            cis.extend(self.graph.get_dependents(node_id, self.config.traversal_depth));
        }
        // CIS never overlaps the SIS.
        for node_id in &sis {
            cis.remove(node_id);
        }

        let affected: Vec<&CodeUnit> = sis
            .iter()
            .chain(cis.iter())
            .filter_map(|id| self.graph.node(id))
            .collect();

        let critical_affected = sis
            .iter()
            .chain(cis.iter())
            .any(|id| self.is_critical(id));

        let test_coverage = if affected.is_empty() {
            // Nothing affected, nothing to break.
            1.0
        } else {
            let covered = affected
                .iter()
                .filter(|unit| self.coverage.has_test(unit))
                .count();
            covered as f64 / affected.len() as f64
        };

        let report = render_report(&sis, &cis, |id| self.is_critical(id));

        ImpactAnalysis {
            cis_size: cis.len(),
            sis,
            cis,
            critical_affected,
            test_coverage,
            report,
        }
    }

    fn is_critical(&self, node_id: &str) -> bool {
        self.config
            .critical_nodes
            .iter()
            .any(|pattern| node_id == pattern || glob_match(node_id, pattern))
    }
}

/// Human-readable impact report: the SIS, then the CIS grouped by
/// criticality, with the standard list truncated at ten entries.
fn render_report(
    sis: &BTreeSet<String>,
    cis: &BTreeSet<String>,
    is_critical: impl Fn(&str) -> bool,
) -> String {
    let mut report = String::from("# Impact Analysis Report\n\n## Starting Impact Set (SIS)\n");
    for node in sis {
        report.push_str(&format!("- {node}\n"));
    }
    report.push_str(&format!(
        "\n## Candidate Impact Set (CIS) - {} nodes\n",
        cis.len()
    ));

    let critical: Vec<&String> = cis.iter().filter(|id| is_critical(id)).collect();
    let standard: Vec<&String> = cis.iter().filter(|id| !is_critical(id)).collect();

    if !critical.is_empty() {
        report.push_str("\n### Critical Components Affected\n");
        for node in &critical {
            report.push_str(&format!("- {node}\n"));
        }
    }
    if !standard.is_empty() {
        report.push_str("\n### Standard Components\n");
        for node in standard.iter().take(10) {
            report.push_str(&format!("- {node}\n"));
        }
        if standard.len() > 10 {
            report.push_str(&format!("- ... and {} more\n", standard.len() - 10));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::models::ActionType;
    use crate::query::coverage::StaticCoverage;

    fn action(target: &str) -> ImprovementAction {
        ImprovementAction {
            action_type: ActionType::AdjustParameter,
            target: target.to_string(),
            old_value: String::new(),
            new_value: String::new(),
            rationale: "test".to_string(),
            confidence_score: 0.9,
        }
    }

    /// a imports b, b imports c: a depends on b depends on c.
    fn chain_graph() -> (tempfile::TempDir, DependencyGraph) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "import b\n").unwrap();
        std::fs::write(dir.path().join("b.py"), "import c\n").unwrap();
        std::fs::write(dir.path().join("c.py"), "x = 1\n").unwrap();
        let graph = build_graph(dir.path(), "fp").unwrap();
        (dir, graph)
    }

    fn config(depth: i64, critical: Vec<String>) -> AnalysisConfig {
        AnalysisConfig {
            traversal_depth: depth,
            critical_nodes: critical,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_impact_flows_to_dependents_not_dependencies() {
        let (_dir, graph) = chain_graph();
        let config = config(2, vec![]);
        let coverage = StaticCoverage::uniform(true);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        // Changing a: nothing imports a, so the CIS is empty even though
        // a depends on b and c.
        let impact = analyzer.analyze(&[action("a")]);
        assert_eq!(impact.sis, BTreeSet::from(["a".to_string()]));
        assert!(impact.cis.is_empty());

        // Changing c: b imports c directly, a reaches it at depth 2.
        let impact = analyzer.analyze(&[action("c")]);
        assert_eq!(
            impact.cis,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(impact.cis_size, 2);
    }

    #[test]
    fn test_cis_disjoint_from_sis() {
        let (_dir, graph) = chain_graph();
        let config = config(3, vec![]);
        let coverage = StaticCoverage::uniform(true);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        let impact = analyzer.analyze(&[action("b"), action("c")]);
        assert!(impact.sis.intersection(&impact.cis).next().is_none());
    }

    #[test]
    fn test_depth_monotonicity() {
        let (_dir, graph) = chain_graph();
        let coverage = StaticCoverage::uniform(true);

        let shallow = config(1, vec![]);
        let deep = config(2, vec![]);
        let cis_shallow = ImpactAnalyzer::new(&graph, &shallow, &coverage)
            .analyze(&[action("c")])
            .cis;
        let cis_deep = ImpactAnalyzer::new(&graph, &deep, &coverage)
            .analyze(&[action("c")])
            .cis;
        assert!(cis_deep.is_superset(&cis_shallow));
    }

    #[test]
    fn test_unknown_target_contributes_nothing() {
        let (_dir, graph) = chain_graph();
        let config = config(2, vec![]);
        let coverage = StaticCoverage::uniform(true);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        let impact = analyzer.analyze(&[action("ghost"), action("c")]);
        assert_eq!(impact.sis, BTreeSet::from(["c".to_string()]));
    }

    #[test]
    fn test_critical_matching_exact_and_glob() {
        let (_dir, graph) = chain_graph();
        let coverage = StaticCoverage::uniform(true);

        let exact = config(2, vec!["b".to_string()]);
        let impact = ImpactAnalyzer::new(&graph, &exact, &coverage).analyze(&[action("c")]);
        assert!(impact.critical_affected);

        let glob = config(2, vec!["a*".to_string()]);
        let impact = ImpactAnalyzer::new(&graph, &glob, &coverage).analyze(&[action("c")]);
        assert!(impact.critical_affected);

        let miss = config(2, vec!["zzz".to_string()]);
        let impact = ImpactAnalyzer::new(&graph, &miss, &coverage).analyze(&[action("c")]);
        assert!(!impact.critical_affected);
    }

    #[test]
    fn test_coverage_fraction_and_vacuous_case() {
        let (_dir, graph) = chain_graph();
        let config = config(2, vec![]);

        let mut map = std::collections::HashMap::new();
        map.insert("b".to_string(), true);
        map.insert("c".to_string(), true);
        let coverage = StaticCoverage::new(map, false);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        // Affected set {c, b, a}: two of three covered.
        let impact = analyzer.analyze(&[action("c")]);
        assert!((impact.test_coverage - 2.0 / 3.0).abs() < 1e-9);

        // Empty affected set is vacuously fully covered.
        let impact = analyzer.analyze(&[action("ghost")]);
        assert_eq!(impact.test_coverage, 1.0);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let (_dir, graph) = chain_graph();
        let config = config(2, vec!["a".to_string()]);
        let coverage = StaticCoverage::uniform(true);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        let actions = [action("c"), action("b")];
        assert_eq!(analyzer.analyze(&actions), analyzer.analyze(&actions));
    }

    #[test]
    fn test_report_lists_sets() {
        let (_dir, graph) = chain_graph();
        let config = config(2, vec!["a".to_string()]);
        let coverage = StaticCoverage::uniform(true);
        let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);

        let impact = analyzer.analyze(&[action("c")]);
        assert!(impact.report.contains("Starting Impact Set"));
        assert!(impact.report.contains("- c\n"));
        assert!(impact.report.contains("Critical Components Affected"));
        assert!(impact.report.contains("- a\n"));
    }
}
