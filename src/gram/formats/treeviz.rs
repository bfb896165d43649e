//! Indented tree rendering of a graph, for debugging
//!
//! One line per node: tag, id, captured value if any, and `-> path (#id)`
//! for each outgoing edge. Anonymous capture leaves print as `_`.

use crate::gram::graph::{Graph, NodeId};

pub fn to_treeviz_str(graph: &Graph) -> String {
    let mut out = String::new();
    for &root in graph.roots() {
        write_node(graph, root, 0, &mut out);
    }
    out
}

fn write_node(graph: &Graph, id: NodeId, depth: usize, out: &mut String) {
    let node = match graph.node(id) {
        Some(node) => node,
        None => return,
    };
    out.push_str(&"    ".repeat(depth));
    if node.tag.is_empty() {
        out.push('_');
    } else {
        out.push_str(&node.tag);
    }
    out.push_str(&format!(" {}", node.id));
    if !node.value.is_empty() {
        out.push_str(&format!(" {:?}", node.value));
    }
    for edge in &node.edges {
        out.push_str(&format!(" -> {} ({})", edge.name, edge.target));
    }
    out.push('\n');
    for &child in &node.children {
        write_node(graph, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::grammar::compile;
    use crate::gram::matching::Matcher;

    #[test]
    fn test_treeviz_shows_tags_ids_and_values() {
        let rules = compile("list ≈ item (\",\" item)*\nitem ≈ '^[a-z]+'").unwrap();
        let graph = Matcher::new(&rules).parse("a,b").unwrap();
        let viz = to_treeviz_str(&graph);
        let lines: Vec<&str> = viz.lines().collect();
        assert!(lines[0].starts_with("list #"));
        assert!(lines[1].contains("item"));
        assert!(lines[1].contains("\"a\""));
        assert!(lines[2].contains("\"b\""));
    }
}
