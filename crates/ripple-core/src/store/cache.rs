//! Graph snapshot cache keyed by a source-tree fingerprint.
//!
//! The fingerprint is the current git revision when the root is a work
//! tree, otherwise a content hash over all indexed files. Any cache-read
//! problem (missing file, corrupt JSON, stale fingerprint) is a cache
//! miss that falls back to a rebuild; it never propagates as an error.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::RippleResult;
use crate::graph::{build_graph, DependencyGraph};
use crate::indexer::filesystem::{compute_content_hash, iter_python_files};
use crate::models::{CodeUnit, DependencyEdge};

/// On-disk snapshot format. The exact layout is internal to the cache;
/// version bumps invalidate old files via ordinary deserialization failure.
#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    fingerprint: String,
    nodes: Vec<CodeUnit>,
    edges: Vec<DependencyEdge>,
}

/// Compute a fingerprint for the current state of `root`.
///
/// Prefers `git rev-parse HEAD`; falls back to a SHA-256 over the sorted
/// relative paths and content hashes of every Python file.
pub fn fingerprint(root: &Path) -> RippleResult<String> {
    if let Some(commit) = git_revision(root) {
        return Ok(commit);
    }
    let files = iter_python_files(root)?;
    let mut hasher = Sha256::new();
    for path in files {
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
        if let Ok(hash) = compute_content_hash(&path) {
            hasher.update(hash.as_bytes());
        }
        hasher.update(b"\n");
    }
    Ok(format!("tree-{:x}", hasher.finalize()))
}

fn git_revision(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if revision.is_empty() {
        None
    } else {
        Some(revision)
    }
}

/// File-backed cache for one serialized dependency graph.
pub struct GraphCache {
    cache_path: PathBuf,
}

impl GraphCache {
    pub fn new(cache_path: impl Into<PathBuf>) -> GraphCache {
        GraphCache {
            cache_path: cache_path.into(),
        }
    }

    /// Return the cached graph when its fingerprint matches the current
    /// tree state; otherwise rebuild, persist, and return the fresh graph.
    pub fn load_or_build(&self, root: &Path) -> RippleResult<DependencyGraph> {
        let current = fingerprint(root)?;

        if let Some(graph) = self.try_load(&current) {
            tracing::info!("loaded dependency graph from cache ({current})");
            return Ok(graph);
        }

        tracing::info!("building dependency graph for {}", root.display());
        let graph = build_graph(root, &current)?;
        self.persist(&graph);
        Ok(graph)
    }

    fn try_load(&self, expected_fingerprint: &str) -> Option<DependencyGraph> {
        let data = std::fs::read(&self.cache_path).ok()?;
        let snapshot: GraphSnapshot = match serde_json::from_slice(&data) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("discarding corrupt graph cache: {e}");
                return None;
            }
        };
        if snapshot.fingerprint != expected_fingerprint {
            tracing::debug!(
                "graph cache is stale ({} != {expected_fingerprint})",
                snapshot.fingerprint
            );
            return None;
        }
        Some(DependencyGraph::from_parts(
            snapshot.nodes,
            snapshot.edges,
            snapshot.fingerprint,
        ))
    }

    /// Write one snapshot file, overwriting any stale cache. A write
    /// failure is logged but does not fail the build that produced the
    /// graph.
    fn persist(&self, graph: &DependencyGraph) {
        let snapshot = GraphSnapshot {
            fingerprint: graph.fingerprint().to_string(),
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().to_vec(),
        };
        let result = (|| -> RippleResult<()> {
            if let Some(parent) = self.cache_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let data = serde_json::to_vec(&snapshot)?;
            std::fs::write(&self.cache_path, data)?;
            Ok(())
        })();
        if let Err(e) = result {
            tracing::warn!("failed to persist graph cache: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn write_tree(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    fn node_ids(graph: &DependencyGraph) -> BTreeSet<String> {
        graph.nodes().map(|n| n.node_id.clone()).collect()
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("a.py", "x = 1\n")]);
        let fp1 = fingerprint(dir.path()).unwrap();
        write_tree(dir.path(), &[("a.py", "x = 2\n")]);
        let fp2 = fingerprint(dir.path()).unwrap();
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_cached_graph_matches_direct_build() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("a.py", "import b\n"), ("b.py", "y = 1\n")]);
        let cache_path = dir.path().join("cache.json");
        let cache = GraphCache::new(&cache_path);

        let built = cache.load_or_build(dir.path()).unwrap();
        assert!(cache_path.exists());

        // Second call must hit the cache and return equal content.
        let cached = cache.load_or_build(dir.path()).unwrap();
        assert_eq!(node_ids(&built), node_ids(&cached));
        assert_eq!(built.edges(), cached.edges());

        let direct = build_graph(dir.path(), built.fingerprint()).unwrap();
        assert_eq!(node_ids(&direct), node_ids(&cached));
        assert_eq!(direct.edges(), cached.edges());
    }

    #[test]
    fn test_changed_tree_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("a.py", "x = 1\n")]);
        let cache = GraphCache::new(dir.path().join("cache.json"));

        let first = cache.load_or_build(dir.path()).unwrap();
        assert!(!first.contains("b"));

        write_tree(dir.path(), &[("b.py", "y = 1\n")]);
        let second = cache.load_or_build(dir.path()).unwrap();
        assert!(second.contains("b"));
        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_corrupt_cache_falls_back_to_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("a.py", "x = 1\n")]);
        let cache_path = dir.path().join("cache.json");
        std::fs::write(&cache_path, b"not json at all").unwrap();

        let cache = GraphCache::new(&cache_path);
        let graph = cache.load_or_build(dir.path()).unwrap();
        assert!(graph.contains("a"));
    }
}
