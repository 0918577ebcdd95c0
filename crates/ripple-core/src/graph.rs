//! Dependency graph construction and bounded traversal.
//!
//! One `DependencyGraph` is an immutable snapshot of a source tree,
//! identified by a fingerprint. Nodes are deduplicated by id; edge targets
//! are resolved from raw names and anything dangling (external imports,
//! unresolvable calls) is dropped rather than failing the build.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;

use indexmap::IndexMap;

use crate::errors::RippleResult;
use crate::indexer::pipeline::{index_tree, IndexedFile};
use crate::models::{CodeUnit, DependencyEdge, EdgeType};

/// Immutable dependency-graph snapshot for one source-tree state.
pub struct DependencyGraph {
    nodes: IndexMap<String, CodeUnit>,
    edges: Vec<DependencyEdge>,
    fingerprint: String,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl DependencyGraph {
    /// Assemble a graph from deduplicated nodes and resolved edges.
    pub fn from_parts(
        nodes: Vec<CodeUnit>,
        edges: Vec<DependencyEdge>,
        fingerprint: String,
    ) -> DependencyGraph {
        let mut node_map: IndexMap<String, CodeUnit> = IndexMap::new();
        for unit in nodes {
            node_map.entry(unit.node_id.clone()).or_insert(unit);
        }
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.source.clone()).or_default().push(index);
            incoming.entry(edge.target.clone()).or_default().push(index);
        }
        DependencyGraph {
            nodes: node_map,
            edges,
            fingerprint,
            outgoing,
            incoming,
        }
    }

    /// Decompose into `(nodes, edges, fingerprint)` for serialization.
    pub fn into_parts(self) -> (Vec<CodeUnit>, Vec<DependencyEdge>, String) {
        let nodes = self.nodes.into_values().collect();
        (nodes, self.edges, self.fingerprint)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&CodeUnit> {
        self.nodes.get(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CodeUnit> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Nodes that depend on `node_id` (inbound edges), bounded to `depth`
    /// hops. "Who calls / imports this?" The start node is excluded;
    /// an unknown id yields an empty set.
    pub fn get_dependents(&self, node_id: &str, depth: i64) -> BTreeSet<String> {
        self.traverse(node_id, depth, &self.incoming, |edge| &edge.source)
    }

    /// Nodes that `node_id` depends on (outbound edges), bounded to `depth`
    /// hops. "What does this call / import?"
    pub fn get_dependencies(&self, node_id: &str, depth: i64) -> BTreeSet<String> {
        self.traverse(node_id, depth, &self.outgoing, |edge| &edge.target)
    }

    fn traverse<'g>(
        &'g self,
        node_id: &str,
        depth: i64,
        adjacency: &HashMap<String, Vec<usize>>,
        neighbor: impl Fn(&'g DependencyEdge) -> &'g String,
    ) -> BTreeSet<String> {
        let depth = depth.max(1);
        let mut result = BTreeSet::new();
        let start = match self.nodes.get_key_value(node_id) {
            Some((key, _)) => key.as_str(),
            None => return result,
        };

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<(&str, i64)> = VecDeque::new();
        queue.push_back((start, 0));

        while let Some((current, d)) = queue.pop_front() {
            if d >= depth {
                continue;
            }
            let Some(indices) = adjacency.get(current) else {
                continue;
            };
            for &index in indices {
                let next = neighbor(&self.edges[index]).as_str();
                if visited.insert(next) {
                    result.insert(next.to_string());
                    queue.push_back((next, d + 1));
                }
            }
        }
        result
    }
}

/// Build a dependency graph from the source tree at `root`.
///
/// Deterministic for identical source content: nodes and edges are sorted,
/// so two builds of the same tree produce identical snapshots regardless of
/// file-processing order.
pub fn build_graph(root: &Path, fingerprint: &str) -> RippleResult<DependencyGraph> {
    let indexed = index_tree(root)?;
    Ok(assemble(indexed, fingerprint))
}

fn assemble(indexed: Vec<IndexedFile>, fingerprint: &str) -> DependencyGraph {
    let mut nodes: IndexMap<String, CodeUnit> = IndexMap::new();
    for file in &indexed {
        for unit in &file.units {
            nodes.entry(unit.node_id.clone()).or_insert_with(|| unit.clone());
        }
    }

    // Index of node ids by final dotted segment, for resolving bare call
    // and base-class names.
    let mut by_suffix: HashMap<&str, Vec<&str>> = HashMap::new();
    for node_id in nodes.keys() {
        let last = node_id.rsplit('.').next().unwrap_or(node_id);
        by_suffix.entry(last).or_default().push(node_id);
    }

    let mut edges: BTreeSet<DependencyEdge> = BTreeSet::new();
    let mut dropped = 0usize;
    for file in &indexed {
        for raw in &file.edges {
            let resolved = resolve_target(&raw.target, &file.module, raw.edge_type, &nodes, &by_suffix);
            match resolved {
                Some(target) if target != raw.source => {
                    edges.insert(DependencyEdge {
                        source: raw.source.clone(),
                        target,
                        edge_type: raw.edge_type,
                        line_number: raw.line_number,
                    });
                }
                // Self-loops and dangling references (external imports,
                // builtins, unresolvable attributes) are dropped.
                _ => dropped += 1,
            }
        }
    }
    if dropped > 0 {
        tracing::debug!("dropped {dropped} unresolved or self-referential edges");
    }

    let mut node_list: Vec<CodeUnit> = nodes.into_values().collect();
    node_list.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    let edge_list: Vec<DependencyEdge> = edges.into_iter().collect();

    let graph = DependencyGraph::from_parts(node_list, edge_list, fingerprint.to_string());
    tracing::info!(
        "graph built: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// Map a raw edge target onto an indexed node id.
///
/// Cascade: exact id, module-qualified name, module fallback for dotted
/// imports, then unique last-segment match. `None` means the edge dangles.
fn resolve_target(
    raw: &str,
    source_module: &str,
    edge_type: EdgeType,
    nodes: &IndexMap<String, CodeUnit>,
    by_suffix: &HashMap<&str, Vec<&str>>,
) -> Option<String> {
    if nodes.contains_key(raw) {
        return Some(raw.to_string());
    }
    let qualified = format!("{source_module}.{raw}");
    if nodes.contains_key(&qualified) {
        return Some(qualified);
    }
    if edge_type == EdgeType::Imports {
        // `from m import name` where `name` is not module-level: fall back
        // to the module itself.
        if let Some((parent, _)) = raw.rsplit_once('.') {
            if nodes.contains_key(parent) {
                return Some(parent.to_string());
            }
        }
        return None;
    }
    let last = raw.rsplit('.').next().unwrap_or(raw);
    match by_suffix.get(last) {
        Some(candidates) if candidates.len() == 1 => Some(candidates[0].to_string()),
        _ => None,
    }
}
