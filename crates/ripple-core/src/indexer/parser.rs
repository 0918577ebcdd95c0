//! Python parsing wrapper around tree-sitter.

use tree_sitter::{Parser, Tree};

use crate::errors::{RippleError, RippleResult};

/// Parse Python source into a tree-sitter tree.
///
/// A tree whose root contains syntax errors is treated as a parse failure;
/// callers skip the file and continue indexing.
pub fn parse_python(source: &str, file_path: &str) -> RippleResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| RippleError::Index(format!("failed to load Python grammar: {e}")))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| RippleError::Index(format!("failed to parse {file_path}")))?;

    if tree.root_node().has_error() {
        return Err(RippleError::Index(format!(
            "syntax errors in {file_path}"
        )));
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_source() {
        let tree = parse_python("def foo():\n    return 1\n", "ok.py").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_syntax_error_is_rejected() {
        let result = parse_python("def foo(:\n", "bad.py");
        assert!(result.is_err());
    }
}
