//! Filesystem scanning helpers for indexing passes.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::errors::{RippleError, RippleResult};

/// Collect all Python source files under `root`, honoring `.gitignore`.
///
/// A missing or unreadable root is a configuration error and fails
/// immediately; no useful graph can be built without it.
pub fn iter_python_files(root: &Path) -> RippleResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(RippleError::Index(format!(
            "source root does not exist or is not a directory: {}",
            root.display()
        )));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && path.extension().map(|e| e == "py").unwrap_or(false)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Whether a path is a test file by naming convention: `test_*.py`,
/// `*_test.py`, or anything under a `tests/` directory.
pub fn is_test_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.starts_with("test_") || name.ends_with("_test.py") {
        return true;
    }
    path.components().any(|c| {
        matches!(c, std::path::Component::Normal(os) if os == "tests")
    })
}

/// SHA-256 content hash of a file, as lowercase hex.
pub fn compute_content_hash(path: &Path) -> RippleResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Convert a path relative to the source root into a dotted module name.
///
/// Strips the extension and joins normal path components with dots; an
/// `__init__.py` maps to its package name.
pub fn module_name_for(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = if rel.file_name().map(|n| n == "__init__.py").unwrap_or(false) {
        rel.parent().unwrap_or(Path::new("")).to_path_buf()
    } else {
        rel.with_extension("")
    };
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(".")
}

/// Simple glob match supporting `*` and `?`.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let t_chars: Vec<char> = text.chars().collect();
    let p_chars: Vec<char> = pattern.chars().collect();
    let (tl, pl) = (t_chars.len(), p_chars.len());
    let mut dp = vec![vec![false; pl + 1]; tl + 1];
    dp[0][0] = true;
    for j in 1..=pl {
        if p_chars[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=tl {
        for j in 1..=pl {
            if p_chars[j - 1] == '*' {
                dp[i][j] = dp[i][j - 1] || dp[i - 1][j];
            } else if p_chars[j - 1] == '?' || t_chars[i - 1] == p_chars[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }
    dp[tl][pl]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_python_files_missing_root() {
        let result = iter_python_files(Path::new("/nonexistent/ripple-root"));
        assert!(result.is_err());
    }

    #[test]
    fn test_iter_python_files_finds_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/b.py"), "y = 2\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();

        let files = iter_python_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("test_graph.py")));
        assert!(is_test_file(Path::new("graph_test.py")));
        assert!(is_test_file(Path::new("tests/helpers.py")));
        assert!(!is_test_file(Path::new("graph.py")));
        assert!(!is_test_file(Path::new("contest.py")));
    }

    #[test]
    fn test_module_name_for() {
        let root = Path::new("/repo");
        assert_eq!(
            module_name_for(root, Path::new("/repo/pkg/mod.py")),
            "pkg.mod"
        );
        assert_eq!(
            module_name_for(root, Path::new("/repo/pkg/__init__.py")),
            "pkg"
        );
        assert_eq!(module_name_for(root, Path::new("/repo/main.py")), "main");
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("agents.meta_orchestrator", "agents.*"));
        assert!(glob_match("main", "main"));
        assert!(glob_match("ab", "a?"));
        assert!(!glob_match("agents.helper", "tools.*"));
    }

    #[test]
    fn test_content_hash_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, "x = 1\n").unwrap();
        let h1 = compute_content_hash(&path).unwrap();
        let h2 = compute_content_hash(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
