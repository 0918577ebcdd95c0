//! Test-coverage mapping for code units.
//!
//! How "has a test" is determined is deliberately pluggable: the analyzer
//! only consumes the per-unit boolean. The convention provider matches
//! test files by name; the static provider is an explicit mapping.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::RippleResult;
use crate::indexer::filesystem::iter_python_files;
use crate::models::CodeUnit;

/// Pluggable predicate answering "does this unit have an associated test?".
pub trait CoverageProvider {
    fn has_test(&self, unit: &CodeUnit) -> bool;
}

static TEST_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:test_(?P<a>.+)|(?P<b>.+)_test)\.py$").unwrap());

/// Naming-convention coverage: `foo.py` counts as covered when a
/// `test_foo.py` or `foo_test.py` exists anywhere under the scanned root.
/// Explicit per-node overrides win over the convention.
pub struct ConventionCoverage {
    covered_stems: HashSet<String>,
    overrides: HashMap<String, bool>,
}

impl ConventionCoverage {
    /// Scan `root` once and record the stems its test files cover.
    pub fn scan(root: &Path) -> RippleResult<ConventionCoverage> {
        let mut covered_stems = HashSet::new();
        for path in iter_python_files(root)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if let Some(caps) = TEST_FILE_RE.captures(&name) {
                if let Some(stem) = caps.name("a").or_else(|| caps.name("b")) {
                    covered_stems.insert(stem.as_str().to_string());
                }
            }
        }
        tracing::debug!("coverage scan found {} test stems", covered_stems.len());
        Ok(ConventionCoverage {
            covered_stems,
            overrides: HashMap::new(),
        })
    }

    /// Force a per-node answer regardless of the naming convention.
    pub fn with_override(mut self, node_id: impl Into<String>, covered: bool) -> Self {
        self.overrides.insert(node_id.into(), covered);
        self
    }
}

impl CoverageProvider for ConventionCoverage {
    fn has_test(&self, unit: &CodeUnit) -> bool {
        if let Some(&answer) = self.overrides.get(&unit.node_id) {
            return answer;
        }
        let stem = Path::new(&unit.file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.covered_stems.contains(&stem)
    }
}

/// Fixed explicit mapping from node id to coverage, with a default for
/// unmapped units.
pub struct StaticCoverage {
    map: HashMap<String, bool>,
    default: bool,
}

impl StaticCoverage {
    pub fn new(map: HashMap<String, bool>, default: bool) -> StaticCoverage {
        StaticCoverage { map, default }
    }

    /// Every unit covered (or none). Convenient in tests.
    pub fn uniform(covered: bool) -> StaticCoverage {
        StaticCoverage {
            map: HashMap::new(),
            default: covered,
        }
    }
}

impl CoverageProvider for StaticCoverage {
    fn has_test(&self, unit: &CodeUnit) -> bool {
        self.map.get(&unit.node_id).copied().unwrap_or(self.default)
    }
}
