//! Script generation by structural replay
//!
//! A node records which rule and which alternative produced it; walking that
//! alternative's terms against the node's children re-derives everything the
//! graph does not store: literals are re-emitted from the rule, captures
//! come from the stored values, references recurse into the children in
//! order, and edge terms re-emit the recorded path text instead of
//! expanding their target (shared targets stay shared).
//!
//! Output is a stable normal form: tokens are joined with a space only
//! where two word characters would otherwise merge, and `{ … }` blocks are
//! laid out with newline and four-space indentation. Rendering, re-parsing
//! and rendering again is a fixed point.

use crate::gram::grammar::{Repeat, Term};
use crate::gram::graph::{Graph, Node, NodeId};

const INDENT: &str = "    ";

/// Render the subtree under `start`, starting at the given indent level.
pub fn render(graph: &Graph, start: NodeId, indent_level: usize) -> String {
    let mut renderer = ScriptRenderer {
        graph,
        out: String::new(),
        level: indent_level,
    };
    if indent_level > 0 {
        renderer.out.push_str(&INDENT.repeat(indent_level));
    }
    renderer.render_node(start);
    renderer.out.trim_end().to_string()
}

/// Render every root, one per line.
pub fn render_script(graph: &Graph, indent_level: usize) -> String {
    graph
        .roots()
        .iter()
        .map(|&root| render(graph, root, indent_level))
        .collect::<Vec<_>>()
        .join("\n")
}

struct Cursor<'g> {
    children: &'g [NodeId],
    child: usize,
    edges: &'g [crate::gram::graph::Edge],
    edge: usize,
}

impl Cursor<'_> {
    fn progress(&self) -> (usize, usize) {
        (self.child, self.edge)
    }
}

struct ScriptRenderer<'g> {
    graph: &'g Graph,
    out: String,
    level: usize,
}

impl<'g> ScriptRenderer<'g> {
    fn render_node(&mut self, id: NodeId) {
        let node = match self.graph.node(id) {
            Some(node) => node,
            None => return,
        };
        if node.tag.is_empty() {
            self.emit(&node.value);
            return;
        }
        let sequence = match self.matched_sequence(node) {
            Some(sequence) => sequence,
            None => {
                self.emit(&node.value);
                return;
            }
        };
        if sequence.len() == 1
            && matches!(sequence[0], Term::Pattern(_))
            && node.children.is_empty()
        {
            // collapsed leaf rule: the capture is the node's value
            self.emit(&node.value);
            return;
        }
        let mut cursor = Cursor {
            children: &node.children,
            child: 0,
            edges: &node.edges,
            edge: 0,
        };
        self.replay_sequence(sequence, &mut cursor);
    }

    fn matched_sequence(&self, node: &Node) -> Option<&'g [Term]> {
        let rule = self.graph.rules().get(&node.tag)?;
        rule.alternatives.get(node.alt).map(|seq| seq.as_slice())
    }

    fn replay_sequence(&mut self, sequence: &[Term], cursor: &mut Cursor<'g>) {
        for term in sequence {
            self.replay_term(term, cursor);
        }
    }

    fn replay_term(&mut self, term: &Term, cursor: &mut Cursor<'g>) {
        match term {
            Term::Literal(text) => self.emit_token(text),
            Term::Pattern(_) => {
                if self.peek_tag(cursor) == Some("") {
                    let id = cursor.children[cursor.child];
                    cursor.child += 1;
                    if let Some(node) = self.graph.node(id) {
                        self.emit(&node.value);
                    }
                }
            }
            Term::Ref(name) => {
                if self.peek_tag(cursor) == Some(name.as_str()) {
                    let id = cursor.children[cursor.child];
                    cursor.child += 1;
                    self.render_node(id);
                }
            }
            Term::Edge(_) => {
                if cursor.edge < cursor.edges.len() {
                    let path = cursor.edges[cursor.edge].name.clone();
                    cursor.edge += 1;
                    self.emit(&path);
                }
            }
            Term::Not(_) => {}
            Term::Group(alternatives) => self.replay_group(alternatives, cursor),
            Term::Repeat { term, repeat } => match repeat {
                Repeat::Optional => {
                    if self.can_start(term, cursor) {
                        self.replay_term(term, cursor);
                    }
                }
                Repeat::Star | Repeat::Plus | Repeat::Many { .. } => loop {
                    if !self.can_start(term, cursor) {
                        break;
                    }
                    let before = cursor.progress();
                    self.replay_term(term, cursor);
                    if cursor.progress() == before {
                        break;
                    }
                },
            },
        }
    }

    fn replay_group(&mut self, alternatives: &[Vec<Term>], cursor: &mut Cursor<'g>) {
        for sequence in alternatives {
            if self.can_start_sequence(sequence, cursor) == Some(true) {
                self.replay_sequence(sequence, cursor);
                return;
            }
        }
        // no consuming alternative fits; an all-literal alternative (if any)
        // is the only remaining possibility
        if let Some(sequence) = alternatives
            .iter()
            .find(|seq| self.can_start_sequence(seq, cursor).is_none())
        {
            self.replay_sequence(sequence, cursor);
        }
    }

    /// Whether the next stored child/edge can have been produced by `term`.
    fn can_start(&self, term: &Term, cursor: &Cursor<'g>) -> bool {
        match term {
            Term::Literal(_) | Term::Not(_) => false,
            Term::Pattern(_) => self.peek_tag(cursor) == Some(""),
            Term::Ref(name) => self.peek_tag(cursor) == Some(name.as_str()),
            Term::Edge(_) => cursor.edge < cursor.edges.len(),
            Term::Group(alternatives) => alternatives
                .iter()
                .any(|seq| self.can_start_sequence(seq, cursor) == Some(true)),
            Term::Repeat { term, .. } => self.can_start(term, cursor),
        }
    }

    /// The first consuming term of a sequence decides; `None` means the
    /// sequence consumes no stored state (all literals).
    fn can_start_sequence(&self, sequence: &[Term], cursor: &Cursor<'g>) -> Option<bool> {
        for term in sequence {
            match term {
                Term::Literal(_) | Term::Not(_) => continue,
                Term::Repeat {
                    term: inner,
                    repeat: Repeat::Optional | Repeat::Star | Repeat::Many { min: 0, .. },
                } => {
                    if self.can_start(inner, cursor) {
                        return Some(true);
                    }
                }
                other => return Some(self.can_start(other, cursor)),
            }
        }
        None
    }

    fn peek_tag(&self, cursor: &Cursor<'g>) -> Option<&'g str> {
        let id = *cursor.children.get(cursor.child)?;
        self.graph.node(id).map(|node| node.tag.as_str())
    }

    /// Emit a literal token, giving `{` and `}` their block layout.
    fn emit_token(&mut self, token: &str) {
        match token {
            "{" => {
                if !self.out.is_empty() && !self.ends_with_space() {
                    self.out.push(' ');
                }
                self.out.push('{');
                self.level += 1;
                self.newline();
            }
            "}" => {
                self.level = self.level.saturating_sub(1);
                self.newline();
                self.out.push('}');
                self.newline();
            }
            _ => self.emit(token),
        }
    }

    fn emit(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        let merge = match (self.out.chars().last(), token.chars().next()) {
            (Some(last), Some(first)) => is_word(last) && is_word(first),
            _ => false,
        };
        if merge {
            self.out.push(' ');
        }
        self.out.push_str(token);
    }

    fn ends_with_space(&self) -> bool {
        matches!(self.out.chars().last(), Some(c) if c.is_whitespace())
    }

    fn newline(&mut self) {
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        self.out.push('\n');
        self.out.push_str(&INDENT.repeat(self.level));
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::grammar::compile;
    use crate::gram::matching::Matcher;

    #[test]
    fn test_list_renders_back_verbatim() {
        let rules = compile("list ≈ item (\",\" item)*\nitem ≈ '^[a-z]+'").unwrap();
        let graph = Matcher::new(&rules).parse("a,b,c").unwrap();
        assert_eq!(render_script(&graph, 0), "a,b,c");
    }

    #[test]
    fn test_word_merge_gets_a_space() {
        let rules = compile("pair ≈ word word\nword ≈ '^[a-z]+'").unwrap();
        let graph = Matcher::new(&rules).parse("foo  bar").unwrap();
        assert_eq!(render_script(&graph, 0), "foo bar");
    }

    #[test]
    fn test_braces_open_an_indented_block() {
        let rules = compile(
            "node ≈ name block? {\n    block ≈ \"{\" node+ \"}\"\n    name ≈ '^[a-z]+'\n}",
        )
        .unwrap();
        let graph = Matcher::new(&rules).parse("a { b c }").unwrap();
        assert_eq!(render_script(&graph, 0), "a {\n    b c\n}");
    }

    #[test]
    fn test_render_with_indent_level() {
        let rules = compile("item ≈ '^[a-z]+'").unwrap();
        let graph = Matcher::new(&rules).parse("abc").unwrap();
        assert_eq!(render(&graph, graph.roots()[0], 1), "    abc");
    }

    #[test]
    fn test_edges_render_as_paths_not_expansions() {
        let rules = compile(
            "graph ≈ node+ {\n    node ≈ name (block | link)*\n    block ≈ \"{\" node+ \"}\"\n    link ≈ \"@\" @path\n    path ≈ '^[A-Za-z_][A-Za-z0-9_.]*'\n    name ≈ '^[A-Za-z_][A-Za-z0-9_]*'\n}",
        )
        .unwrap();
        let graph = Matcher::new(&rules).parse("a { b } d @a.b").unwrap();
        assert_eq!(render_script(&graph, 0), "a {\n    b\n}\nd@a.b");
    }
}
