//! Symbol and dependency-edge extraction from Python source.
//!
//! Walks the tree-sitter CST and emits code units (module, function, class)
//! together with raw IMPORTS / CALLS / INHERITS edges.  Edge targets are
//! left unresolved here; the graph builder maps them onto indexed node ids
//! and drops anything that points outside the snapshot.

use tree_sitter::{Node, Tree};

use crate::models::{CodeUnit, EdgeType, NodeType};

/// A dependency edge whose target is a raw, possibly-unresolved name:
/// a dotted module path for imports, a callee expression for calls, or a
/// base-class expression for inheritance.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub line_number: i64,
}

/// Extract code units and raw edges from one parsed Python file.
///
/// Node ids follow the original dotted scheme: `module`, `module.func`,
/// `module.Class`, `module.Class.method`.  Call edges are recorded only
/// for calls made inside a function body.
pub fn extract_python(
    tree: &Tree,
    source: &str,
    module: &str,
    file_path: &str,
) -> (Vec<CodeUnit>, Vec<RawEdge>) {
    let root = tree.root_node();
    let mut walker = Walker {
        source: source.as_bytes(),
        module,
        file_path,
        class_stack: Vec::new(),
        function_stack: Vec::new(),
        units: Vec::new(),
        edges: Vec::new(),
    };

    walker.units.push(CodeUnit {
        node_id: module.to_string(),
        node_type: NodeType::Module,
        file_path: file_path.to_string(),
        start_line: 1,
        end_line: root.end_position().row as i64 + 1,
    });

    walker.visit_children(root);
    (walker.units, walker.edges)
}

struct Walker<'a> {
    source: &'a [u8],
    module: &'a str,
    file_path: &'a str,
    class_stack: Vec<String>,
    function_stack: Vec<String>,
    units: Vec<CodeUnit>,
    edges: Vec<RawEdge>,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn line(&self, node: Node<'_>) -> i64 {
        node.start_position().row as i64 + 1
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "function_definition" => self.visit_function(node),
            "class_definition" => self.visit_class(node),
            "call" => {
                self.visit_call(node);
                // Arguments may contain further calls.
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    // import module  /  import module as alias
    fn visit_import(&mut self, node: Node<'_>) {
        let line = self.line(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            let target = match child.kind() {
                "dotted_name" => self.text(child),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default(),
                _ => continue,
            };
            if !target.is_empty() {
                self.edges.push(RawEdge {
                    source: self.module.to_string(),
                    target,
                    edge_type: EdgeType::Imports,
                    line_number: line,
                });
            }
        }
    }

    // from module import name [as alias]
    fn visit_import_from(&mut self, node: Node<'_>) {
        let line = self.line(node);
        let module_node = match node.child_by_field_name("module_name") {
            Some(n) => n,
            None => return,
        };
        let raw_module = self.text(module_node);
        let base = if module_node.kind() == "relative_import" {
            match resolve_relative(self.module, &raw_module) {
                Some(b) => b,
                None => return,
            }
        } else {
            raw_module
        };

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            if child.id() == module_node.id() {
                continue;
            }
            let target = match child.kind() {
                "dotted_name" => format!("{base}.{}", self.text(child)),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| format!("{base}.{}", self.text(n)))
                    .unwrap_or_default(),
                "wildcard_import" => base.clone(),
                _ => continue,
            };
            if !target.is_empty() {
                self.edges.push(RawEdge {
                    source: self.module.to_string(),
                    target,
                    edge_type: EdgeType::Imports,
                    line_number: line,
                });
            }
        }
    }

    fn visit_function(&mut self, node: Node<'_>) {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n),
            None => return,
        };
        // Scope: innermost class if present, else the module.
        let owner = self
            .class_stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.module.to_string());
        let func_id = format!("{owner}.{name}");

        self.units.push(CodeUnit {
            node_id: func_id.clone(),
            node_type: NodeType::Function,
            file_path: self.file_path.to_string(),
            start_line: self.line(node),
            end_line: node.end_position().row as i64 + 1,
        });

        self.function_stack.push(func_id);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.function_stack.pop();
    }

    fn visit_class(&mut self, node: Node<'_>) {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n),
            None => return,
        };
        let class_id = format!("{}.{name}", self.module);
        let line = self.line(node);

        self.units.push(CodeUnit {
            node_id: class_id.clone(),
            node_type: NodeType::Class,
            file_path: self.file_path.to_string(),
            start_line: line,
            end_line: node.end_position().row as i64 + 1,
        });

        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            let bases: Vec<Node<'_>> = superclasses.named_children(&mut cursor).collect();
            for base in bases {
                if matches!(base.kind(), "identifier" | "attribute") {
                    let target = self.text(base);
                    if !target.is_empty() {
                        self.edges.push(RawEdge {
                            source: class_id.clone(),
                            target,
                            edge_type: EdgeType::Inherits,
                            line_number: line,
                        });
                    }
                }
            }
        }

        self.class_stack.push(class_id);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.class_stack.pop();
    }

    fn visit_call(&mut self, node: Node<'_>) {
        let caller = match self.function_stack.last() {
            Some(f) => f.clone(),
            None => return,
        };
        let callee = match node.child_by_field_name("function") {
            Some(f) if matches!(f.kind(), "identifier" | "attribute") => self.text(f),
            _ => return,
        };
        if callee.is_empty() {
            return;
        }
        self.edges.push(RawEdge {
            source: caller,
            target: callee,
            edge_type: EdgeType::Calls,
            line_number: self.line(node),
        });
    }
}

/// Resolve a relative import (`.sib`, `..pkg.mod`) against the importing
/// module's dotted path. Returns `None` when the import escapes the root.
fn resolve_relative(module: &str, relative: &str) -> Option<String> {
    let levels = relative.chars().take_while(|&c| c == '.').count();
    let suffix = &relative[levels..];
    let mut parts: Vec<&str> = module.split('.').filter(|s| !s.is_empty()).collect();
    for _ in 0..levels {
        parts.pop()?;
    }
    if !suffix.is_empty() {
        parts.extend(suffix.split('.'));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}
