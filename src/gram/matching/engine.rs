//! The matcher proper
//!
//! Matching builds a detached [`ParseNode`] tree first; the graph arena is
//! only populated by [`commit`](Session::commit) after the whole start-rule
//! span has matched, so failed parses leave no trace in the store. Alias
//! terms record the matched path text during matching and are resolved
//! against the committed graph, where their targets exist as real nodes.
//!
//! Recursion depth is bounded by a ceiling that converts pathological
//! self-reference (a cycle able to recurse without consuming input) into an
//! ordinary parse failure instead of a stack overflow.

use std::fmt;
use tracing::trace;

use super::trace::{MatchTrace, TraceEvent, TraceOutcome};
use crate::gram::grammar::{Repeat, RuleSet, Term};
use crate::gram::graph::{Graph, NodeId};
use crate::gram::location::line_col;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Failure of a parse: the furthest position reached and what was expected
/// there. An ordinary negative result, never a crash.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub position: usize,
    pub line: usize,
    pub column: usize,
    pub expected: Vec<String>,
    pub message: String,
}

impl ParseError {
    fn new(input: &str, position: usize, message: impl Into<String>, expected: Vec<String>) -> Self {
        let (line, column) = line_col(input, position);
        Self {
            position,
            line,
            column,
            expected,
            message: message.into(),
        }
    }
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse failed at line {}, column {}: {}",
            self.line, self.column, self.message
        )?;
        if !self.expected.is_empty() {
            write!(f, " (expected {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

/// One node of the detached parse tree, mirroring what will be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub tag: String,
    pub alt: usize,
    pub value: String,
    pub children: Vec<ParseNode>,
    /// Alias path texts recorded by edge terms, in match order.
    pub edges: Vec<String>,
}

impl ParseNode {
    fn capture(value: &str) -> Self {
        Self {
            tag: String::new(),
            alt: 0,
            value: value.to_string(),
            children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// Ordered-choice matcher for one rule set.
pub struct Matcher<'r> {
    rules: &'r RuleSet,
    max_depth: usize,
    trace_enabled: bool,
    trace: MatchTrace,
}

impl<'r> Matcher<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
            trace_enabled: false,
            trace: MatchTrace::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Record every rule attempt into [`trace`](Self::trace).
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    pub fn trace(&self) -> &MatchTrace {
        &self.trace
    }

    /// Parse starting from the rule set's start rule.
    pub fn parse(&mut self, input: &str) -> Result<Graph, ParseError> {
        let start = match self.rules.start() {
            Some(start) => start.to_string(),
            None => return Err(ParseError::new(input, 0, "grammar has no rules", vec![])),
        };
        self.parse_from(input, &start)
    }

    /// Parse starting from an explicitly named rule.
    pub fn parse_from(&mut self, input: &str, start: &str) -> Result<Graph, ParseError> {
        if self.rules.get(start).is_none() {
            return Err(ParseError::new(
                input,
                0,
                format!("unknown start rule `{start}`"),
                vec![],
            ));
        }
        let mut session = Session {
            rules: self.rules,
            input,
            depth: 0,
            max_depth: self.max_depth,
            furthest: 0,
            expected: Vec::new(),
            predicate_depth: 0,
            trace_enabled: self.trace_enabled,
            trace: MatchTrace::default(),
        };
        let matched = session.match_rule(start, 0);
        let result = match matched {
            Some((node, end)) => {
                let rest = session.skip_ws(end);
                if rest == input.len() {
                    session.commit(node)
                } else {
                    Err(session.error_at(rest.max(session.furthest), "unconsumed input"))
                }
            }
            None => Err(session.error_at(session.furthest, "no rule matched")),
        };
        self.trace = session.trace;
        result
    }
}

#[derive(Default)]
struct SeqOut {
    children: Vec<ParseNode>,
    edges: Vec<String>,
}

impl SeqOut {
    fn checkpoint(&self) -> (usize, usize) {
        (self.children.len(), self.edges.len())
    }

    fn rollback(&mut self, (children, edges): (usize, usize)) {
        self.children.truncate(children);
        self.edges.truncate(edges);
    }
}

struct Session<'r, 't> {
    rules: &'r RuleSet,
    input: &'t str,
    depth: usize,
    max_depth: usize,
    furthest: usize,
    expected: Vec<String>,
    /// Failures inside a negative lookahead are expected; suppress them in
    /// diagnostics.
    predicate_depth: usize,
    trace_enabled: bool,
    trace: MatchTrace,
}

impl Session<'_, '_> {
    fn skip_ws(&self, mut pos: usize) -> usize {
        while let Some(c) = self.input[pos..].chars().next() {
            if c.is_whitespace() {
                pos += c.len_utf8();
            } else {
                break;
            }
        }
        pos
    }

    fn record_failure(&mut self, position: usize, expected: &str) {
        if self.predicate_depth > 0 {
            return;
        }
        if position > self.furthest {
            self.furthest = position;
            self.expected.clear();
        }
        if position == self.furthest && !self.expected.iter().any(|e| e == expected) {
            self.expected.push(expected.to_string());
        }
    }

    fn error_at(&self, position: usize, message: &str) -> ParseError {
        let expected = if position == self.furthest {
            self.expected.clone()
        } else {
            Vec::new()
        };
        ParseError::new(self.input, position, message, expected)
    }

    fn push_trace(&mut self, rule: &str, position: usize, outcome: TraceOutcome) {
        if self.trace_enabled {
            self.trace.push(TraceEvent {
                rule: rule.to_string(),
                position,
                depth: self.depth,
                outcome,
            });
        }
    }

    fn match_rule(&mut self, name: &str, pos: usize) -> Option<(ParseNode, usize)> {
        let rule = self.rules.get(name)?;
        if self.depth >= self.max_depth {
            self.record_failure(pos, name);
            return None;
        }
        self.depth += 1;
        self.push_trace(name, pos, TraceOutcome::Attempt);
        trace!(rule = name, pos, "try");

        for (alt_index, sequence) in rule.alternatives.iter().enumerate() {
            let mut out = SeqOut::default();
            if let Some(end) = self.match_sequence(sequence, pos, &mut out) {
                let mut value = String::new();
                let mut children = out.children;
                let collapse = sequence.len() == 1
                    && matches!(sequence[0], Term::Pattern(_))
                    && children.len() == 1
                    && children[0].tag.is_empty();
                if collapse {
                    if let Some(leaf) = children.pop() {
                        value = leaf.value;
                    }
                }
                let node = ParseNode {
                    tag: name.to_string(),
                    alt: alt_index,
                    value,
                    children,
                    edges: out.edges,
                };
                self.push_trace(name, pos, TraceOutcome::Matched { end });
                trace!(rule = name, pos, end, "ok");
                self.depth -= 1;
                return Some((node, end));
            }
        }

        self.push_trace(name, pos, TraceOutcome::Failed);
        trace!(rule = name, pos, "fail");
        self.depth -= 1;
        self.record_failure(pos, name);
        None
    }

    fn match_sequence(&mut self, terms: &[Term], mut pos: usize, out: &mut SeqOut) -> Option<usize> {
        for term in terms {
            pos = self.match_term(term, pos, out)?;
        }
        Some(pos)
    }

    fn match_alternation(
        &mut self,
        alternatives: &[Vec<Term>],
        pos: usize,
        out: &mut SeqOut,
    ) -> Option<usize> {
        for sequence in alternatives {
            let checkpoint = out.checkpoint();
            if let Some(end) = self.match_sequence(sequence, pos, out) {
                return Some(end);
            }
            out.rollback(checkpoint);
        }
        None
    }

    fn match_term(&mut self, term: &Term, pos: usize, out: &mut SeqOut) -> Option<usize> {
        match term {
            Term::Literal(text) => {
                let p = self.skip_ws(pos);
                if self.input[p..].starts_with(text.as_str()) {
                    Some(p + text.len())
                } else {
                    let display = format!("\"{text}\"");
                    self.record_failure(p, &display);
                    None
                }
            }
            Term::Pattern(pattern) => {
                let p = self.skip_ws(pos);
                let matched = pattern.match_prefix(&self.input[p..])?;
                let end = p + matched.len();
                out.children.push(ParseNode::capture(matched));
                Some(end)
            }
            Term::Ref(name) => {
                let (node, end) = self.match_rule(name, pos)?;
                out.children.push(node);
                Some(end)
            }
            Term::Edge(name) => {
                let start = self.skip_ws(pos);
                let (_, end) = self.match_rule(name, pos)?;
                let path = self.input[start..end].trim_end().to_string();
                out.edges.push(path);
                Some(end)
            }
            Term::Not(inner) => {
                let mut scratch = SeqOut::default();
                self.predicate_depth += 1;
                let matched = self.match_term(inner, pos, &mut scratch).is_some();
                self.predicate_depth -= 1;
                if matched {
                    None
                } else {
                    Some(pos)
                }
            }
            Term::Group(alternatives) => self.match_alternation(alternatives, pos, out),
            Term::Repeat { term, repeat } => match repeat {
                Repeat::Optional => {
                    let checkpoint = out.checkpoint();
                    match self.match_term(term, pos, out) {
                        Some(end) => Some(end),
                        None => {
                            out.rollback(checkpoint);
                            Some(pos)
                        }
                    }
                }
                Repeat::Star => {
                    let (end, _) = self.match_repeated(term, pos, out, None);
                    Some(end)
                }
                Repeat::Plus => {
                    let (end, count) = self.match_repeated(term, pos, out, None);
                    if count == 0 {
                        None
                    } else {
                        Some(end)
                    }
                }
                Repeat::Many { min, max } => {
                    let checkpoint = out.checkpoint();
                    let (end, count) = self.match_repeated(term, pos, out, *max);
                    if count < *min {
                        out.rollback(checkpoint);
                        None
                    } else {
                        Some(end)
                    }
                }
            },
        }
    }

    /// Greedy repetition. An iteration that consumes nothing ends the loop,
    /// so zero-width patterns cannot spin.
    fn match_repeated(
        &mut self,
        term: &Term,
        mut pos: usize,
        out: &mut SeqOut,
        max: Option<u32>,
    ) -> (usize, u32) {
        let mut count = 0u32;
        while max.map_or(true, |m| count < m) {
            let checkpoint = out.checkpoint();
            match self.match_term(term, pos, out) {
                Some(end) if end > pos => {
                    pos = end;
                    count += 1;
                }
                Some(_) | None => {
                    out.rollback(checkpoint);
                    break;
                }
            }
        }
        (pos, count)
    }

    /// Commit the detached tree to a graph, then resolve alias paths
    /// against it. Any unresolved path fails the whole parse.
    fn commit(&self, root: ParseNode) -> Result<Graph, ParseError> {
        let mut graph = Graph::new(self.rules.clone());
        let mut pending = Vec::new();
        let root_id = commit_node(&mut graph, root, &mut pending);
        graph.push_root(root_id);
        for (id, path) in pending {
            match graph.resolve_path(&path) {
                Some(target) => {
                    graph.add_edge(id, &path, target);
                }
                None => {
                    return Err(ParseError::new(
                        self.input,
                        0,
                        format!("unresolved reference `{path}`"),
                        vec![],
                    ));
                }
            }
        }
        Ok(graph)
    }
}

fn commit_node(graph: &mut Graph, node: ParseNode, pending: &mut Vec<(NodeId, String)>) -> NodeId {
    let child_ids = node
        .children
        .into_iter()
        .map(|child| commit_node(graph, child, pending))
        .collect();
    let id = graph.new_node(node.tag, node.alt, node.value, child_ids);
    for path in node.edges {
        pending.push((id, path));
    }
    id
}
