//! Quality gate: the pure approve/reject decision over an impact analysis.

use crate::config::AnalysisConfig;
use crate::models::{ImpactAnalysis, QualityGateApproval};

/// Threshold-based gate. All limits come from configuration; the decision
/// has no side effects and no state.
pub struct QualityGate {
    max_cis_size: usize,
    min_test_coverage: f64,
    min_confidence: f64,
}

impl QualityGate {
    pub fn new(config: &AnalysisConfig) -> QualityGate {
        QualityGate {
            max_cis_size: config.max_cis_size,
            min_test_coverage: config.min_test_coverage,
            min_confidence: config.min_confidence,
        }
    }

    /// Evaluate one impact analysis against the gate thresholds.
    ///
    /// Boundary semantics: `cis_size` at the maximum fails; coverage at
    /// the minimum fails; confidence at the minimum passes. A
    /// critical-component hit alone never blocks, but the feedback carries
    /// an explicit warning.
    pub fn evaluate(&self, impact: &ImpactAnalysis, confidence: f64) -> QualityGateApproval {
        let mut failures: Vec<String> = Vec::new();

        if impact.cis_size >= self.max_cis_size {
            failures.push(format!(
                "CIS size {} is at or above the maximum of {}",
                impact.cis_size, self.max_cis_size
            ));
        }
        if impact.test_coverage <= self.min_test_coverage {
            failures.push(format!(
                "Test coverage {:.2} is at or below the minimum of {:.2}",
                impact.test_coverage, self.min_test_coverage
            ));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            failures.push(format!("Confidence {confidence} is outside [0, 1]"));
        } else if confidence < self.min_confidence {
            failures.push(format!(
                "Confidence {confidence:.2} is below the minimum of {:.2}",
                self.min_confidence
            ));
        }

        if !failures.is_empty() {
            return QualityGateApproval {
                passed: false,
                feedback: failures.join("; "),
            };
        }

        let feedback = if impact.critical_affected {
            "WARNING: critical components are in the impact set; \
             proceed with extra verification"
                .to_string()
        } else {
            "OK".to_string()
        };
        QualityGateApproval {
            passed: true,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn gate() -> QualityGate {
        QualityGate::new(&AnalysisConfig::default())
    }

    fn impact(cis_size: usize, critical_affected: bool, test_coverage: f64) -> ImpactAnalysis {
        ImpactAnalysis {
            sis: BTreeSet::from(["agent1".to_string()]),
            cis: (0..cis_size).map(|i| format!("agent{}", i + 2)).collect(),
            cis_size,
            critical_affected,
            test_coverage,
            report: String::new(),
        }
    }

    #[test]
    fn test_small_impact_passes() {
        let approval = gate().evaluate(&impact(2, false, 0.9), 0.9);
        assert!(approval.passed);
        assert_eq!(approval.feedback, "OK");
    }

    #[test]
    fn test_cis_size_boundary() {
        assert!(gate().evaluate(&impact(19, false, 0.9), 0.9).passed);
        let approval = gate().evaluate(&impact(20, false, 0.9), 0.9);
        assert!(!approval.passed);
        // The wording must match the inclusive boundary.
        assert!(approval.feedback.contains("at or above the maximum"));
    }

    #[test]
    fn test_large_cis_feedback_names_threshold_and_value() {
        let approval = gate().evaluate(&impact(25, false, 0.9), 0.9);
        assert!(!approval.passed);
        assert!(approval.feedback.contains("20"));
        assert!(approval.feedback.contains("25"));
    }

    #[test]
    fn test_coverage_boundary_is_exclusive() {
        // Coverage exactly at the floor fails.
        let approval = gate().evaluate(&impact(2, false, 0.80), 0.9);
        assert!(!approval.passed);
        assert!(approval.feedback.contains("Test coverage"));

        assert!(gate().evaluate(&impact(2, false, 0.81), 0.9).passed);
    }

    #[test]
    fn test_confidence_boundary_is_inclusive() {
        // Confidence exactly at the floor passes.
        assert!(gate().evaluate(&impact(2, false, 0.9), 0.70).passed);
        let approval = gate().evaluate(&impact(2, false, 0.9), 0.69);
        assert!(!approval.passed);
        assert!(approval.feedback.contains("Confidence"));
    }

    #[test]
    fn test_confidence_out_of_range_fails() {
        assert!(!gate().evaluate(&impact(2, false, 0.9), 1.5).passed);
        assert!(!gate().evaluate(&impact(2, false, 0.9), -0.1).passed);
        assert!(!gate().evaluate(&impact(2, false, 0.9), f64::NAN).passed);
    }

    #[test]
    fn test_critical_warns_but_passes() {
        let approval = gate().evaluate(&impact(5, true, 0.9), 0.9);
        assert!(approval.passed);
        assert!(approval.feedback.to_lowercase().contains("critical"));
    }

    #[test]
    fn test_multiple_failures_all_reported() {
        let approval = gate().evaluate(&impact(30, false, 0.5), 0.5);
        assert!(!approval.passed);
        assert!(approval.feedback.contains("CIS size"));
        assert!(approval.feedback.contains("Test coverage"));
        assert!(approval.feedback.contains("Confidence"));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let config = AnalysisConfig {
            max_cis_size: 5,
            min_test_coverage: 0.5,
            min_confidence: 0.9,
            ..AnalysisConfig::default()
        };
        let gate = QualityGate::new(&config);
        assert!(!gate.evaluate(&impact(5, false, 0.9), 0.95).passed);
        assert!(gate.evaluate(&impact(4, false, 0.6), 0.9).passed);
        assert!(!gate.evaluate(&impact(4, false, 0.6), 0.89).passed);
    }
}
