//! Indexing pipeline with Rayon-based per-file fan-out.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::errors::RippleResult;
use crate::indexer::filesystem::{is_test_file, iter_python_files, module_name_for};
use crate::indexer::parser::parse_python;
use crate::indexer::symbols::{extract_python, RawEdge};
use crate::models::CodeUnit;

/// Extraction output for one source file.
pub struct IndexedFile {
    pub module: String,
    pub units: Vec<CodeUnit>,
    pub edges: Vec<RawEdge>,
}

/// Index every non-test Python file under `root`.
///
/// A file that fails to read or parse is skipped with a logged warning;
/// a single bad file never aborts the build. Only a missing root is fatal.
pub fn index_tree(root: &Path) -> RippleResult<Vec<IndexedFile>> {
    let started = Instant::now();
    let files = iter_python_files(root)?;

    let sources: Vec<_> = files
        .into_iter()
        .filter(|f| !is_test_file(f))
        .collect();
    let files_seen = sources.len();

    let mut indexed: Vec<IndexedFile> = sources
        .par_iter()
        .filter_map(|path| {
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("failed to read {}: {e}", path.display());
                    return None;
                }
            };
            let rel = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let tree = match parse_python(&source, &rel) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}", path.display());
                    return None;
                }
            };
            let module = module_name_for(root, path);
            let (units, edges) = extract_python(&tree, &source, &module, &rel);
            Some(IndexedFile {
                module,
                units,
                edges,
            })
        })
        .collect();

    // Parallel collection order is nondeterministic; the graph is a set
    // structure, but sorting keeps snapshots byte-identical across runs.
    indexed.sort_by(|a, b| a.module.cmp(&b.module));

    tracing::info!(
        "indexed {}/{} files in {} ms",
        indexed.len(),
        files_seen,
        started.elapsed().as_millis()
    );
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_tree_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.py"), "def f():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("bad.py"), "def broken(:\n").unwrap();

        let indexed = index_tree(dir.path()).unwrap();
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[0].module, "good");
    }

    #[test]
    fn test_index_tree_skips_test_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("test_app.py"), "x = 1\n").unwrap();

        let indexed = index_tree(dir.path()).unwrap();
        let modules: Vec<&str> = indexed.iter().map(|f| f.module.as_str()).collect();
        assert_eq!(modules, vec!["app"]);
    }

    #[test]
    fn test_index_tree_missing_root_is_fatal() {
        assert!(index_tree(Path::new("/nonexistent/ripple-pipeline")).is_err());
    }
}
