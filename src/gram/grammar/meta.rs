//! The self-hosted meta-grammar
//!
//! [`META_GRAMMAR`] is the gram syntax described in gram syntax. The
//! bootstrap path compiles it with the combinator-based
//! [`compile`](super::compile); the self-hosted path ([`compile_via`])
//! parses a grammar text as an ordinary script under those rules and
//! rebuilds a [`RuleSet`] from the resulting graph — the engine expressed
//! in its own rule model. Both paths must agree; the test corpus holds them
//! to that.
//!
//! The `!head` guard is what makes the meta-grammar parse itself: a bare
//! identifier in a rule body is a reference only when it is *not* the next
//! declaration's head, and ordered choice alone cannot express that
//! boundary.

use once_cell::sync::Lazy;

use super::{compile, CompileError, Rule, RuleSet, Term};
use crate::gram::graph::{Graph, NodeId};
use crate::gram::grammar::{CapturePattern, Repeat};
use crate::gram::matching::Matcher;

pub const META_GRAMMAR: &str = r#"grammar ≈ rule+ {
    rule ≈ name "≈" body block?
    block ≈ "{" rule+ "}"
    body ≈ seq ("|" seq)*
    seq ≈ term+
    term ≈ "!" factor | !head factor repeat?
    head ≈ name "≈"
    factor ≈ group | literal | pattern | edge | name
    group ≈ "(" body ")"
    edge ≈ "@" name
    repeat ≈ '^[?*+]' | many
    many ≈ "{" count ("," count)? "}"
    count ≈ '^[0-9]+'
    literal ≈ '^"(\\.|[^"\\])*"'
    pattern ≈ '^\'(\\.|[^\'\\])*\''
    name ≈ '^[A-Za-z_][A-Za-z0-9_]*'
}"#;

/// The bootstrap rule set for the meta-grammar, compiled once.
pub fn meta_rules() -> &'static RuleSet {
    static RULES: Lazy<RuleSet> = Lazy::new(|| {
        compile(META_GRAMMAR).expect("the meta-grammar must compile")
    });
    &RULES
}

/// Compile a grammar by parsing it as a script under `rules` (normally
/// [`meta_rules`]) and rebuilding the rule set from the graph, in the same
/// two passes as the combinator path: collect rule names, then build terms
/// against the completed table.
pub fn compile_via(text: &str, rules: &RuleSet) -> Result<RuleSet, CompileError> {
    let graph = Matcher::new(rules).parse(text).map_err(|error| {
        CompileError::Syntax {
            line: error.line,
            column: error.column,
            message: error.message,
        }
    })?;

    let root = graph.roots().first().copied().ok_or(CompileError::EmptyGrammar)?;
    let rule_ids = collect_rule_ids(&graph, root);
    if rule_ids.is_empty() {
        return Err(CompileError::EmptyGrammar);
    }

    // pass 1: the name table
    let mut names = indexmap::IndexSet::new();
    for &id in &rule_ids {
        let name = rule_name(&graph, id)?;
        if !names.insert(name.clone()) {
            return Err(CompileError::DuplicateRule { name });
        }
    }

    // pass 2: term construction against the table
    let mut out = RuleSet::default();
    for &id in &rule_ids {
        let name = rule_name(&graph, id)?;
        let body = child_tagged(&graph, id, "body")
            .ok_or_else(|| shape_error("rule without a body"))?;
        let alternatives = build_alternation(&graph, body, &name, &names)?;
        out.insert(Rule { name, alternatives });
    }
    Ok(out)
}

/// Rule nodes in declaration order: each rule, then its block's rules,
/// depth-first — the same order the combinator compiler flattens in.
fn collect_rule_ids(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    fn walk(graph: &Graph, id: NodeId, out: &mut Vec<NodeId>) {
        let node = match graph.node(id) {
            Some(node) => node,
            None => return,
        };
        for &child in &node.children {
            if let Some(child_node) = graph.node(child) {
                match child_node.tag.as_str() {
                    "rule" => {
                        out.push(child);
                        walk(graph, child, out);
                    }
                    "block" => walk(graph, child, out),
                    _ => {}
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(graph, root, &mut out);
    out
}

fn shape_error(message: &str) -> CompileError {
    CompileError::Syntax {
        line: 1,
        column: 1,
        message: message.to_string(),
    }
}

fn child_tagged(graph: &Graph, id: NodeId, tag: &str) -> Option<NodeId> {
    graph
        .node(id)?
        .children
        .iter()
        .copied()
        .find(|&child| graph.node(child).map(|n| n.tag.as_str()) == Some(tag))
}

fn children_tagged(graph: &Graph, id: NodeId, tag: &str) -> Vec<NodeId> {
    graph
        .node(id)
        .map(|node| {
            node.children
                .iter()
                .copied()
                .filter(|&child| graph.node(child).map(|n| n.tag.as_str()) == Some(tag))
                .collect()
        })
        .unwrap_or_default()
}

fn leaf_value(graph: &Graph, id: NodeId) -> Result<String, CompileError> {
    graph
        .node(id)
        .map(|node| node.value.clone())
        .ok_or_else(|| shape_error("missing node"))
}

fn rule_name(graph: &Graph, rule: NodeId) -> Result<String, CompileError> {
    let name = child_tagged(graph, rule, "name")
        .ok_or_else(|| shape_error("rule without a name"))?;
    leaf_value(graph, name)
}

fn build_alternation(
    graph: &Graph,
    body: NodeId,
    rule: &str,
    names: &indexmap::IndexSet<String>,
) -> Result<Vec<Vec<Term>>, CompileError> {
    children_tagged(graph, body, "seq")
        .into_iter()
        .map(|seq| {
            children_tagged(graph, seq, "term")
                .into_iter()
                .map(|term| build_term(graph, term, rule, names))
                .collect()
        })
        .collect()
}

fn build_term(
    graph: &Graph,
    term: NodeId,
    rule: &str,
    names: &indexmap::IndexSet<String>,
) -> Result<Term, CompileError> {
    let node = graph.node(term).ok_or_else(|| shape_error("missing term"))?;
    let factor = child_tagged(graph, term, "factor")
        .ok_or_else(|| shape_error("term without a factor"))?;
    let built = build_factor(graph, factor, rule, names)?;
    if node.alt == 0 {
        // `"!" factor` — negative lookahead
        return Ok(Term::Not(Box::new(built)));
    }
    match child_tagged(graph, term, "repeat") {
        Some(repeat) => Ok(Term::Repeat {
            term: Box::new(built),
            repeat: build_repeat(graph, repeat)?,
        }),
        None => Ok(built),
    }
}

fn build_factor(
    graph: &Graph,
    factor: NodeId,
    rule: &str,
    names: &indexmap::IndexSet<String>,
) -> Result<Term, CompileError> {
    let node = graph
        .node(factor)
        .ok_or_else(|| shape_error("missing factor"))?;
    let child = node
        .children
        .first()
        .copied()
        .ok_or_else(|| shape_error("factor without content"))?;
    match node.alt {
        0 => {
            let body = child_tagged(graph, child, "body")
                .ok_or_else(|| shape_error("group without a body"))?;
            Ok(Term::Group(build_alternation(graph, body, rule, names)?))
        }
        1 => {
            let quoted = leaf_value(graph, child)?;
            Ok(Term::Literal(unquote_escaped(&quoted)))
        }
        2 => {
            let quoted = leaf_value(graph, child)?;
            let source = unquote(&quoted);
            CapturePattern::new(&source)
                .map(Term::Pattern)
                .map_err(|error| CompileError::InvalidPattern {
                    rule: rule.to_string(),
                    pattern: source,
                    message: error.to_string(),
                })
        }
        3 => {
            let name = child_tagged(graph, child, "name")
                .ok_or_else(|| shape_error("edge without a name"))?;
            let reference = leaf_value(graph, name)?;
            check_reference(rule, &reference, names)?;
            Ok(Term::Edge(reference))
        }
        _ => {
            let reference = leaf_value(graph, child)?;
            check_reference(rule, &reference, names)?;
            Ok(Term::Ref(reference))
        }
    }
}

fn check_reference(
    rule: &str,
    reference: &str,
    names: &indexmap::IndexSet<String>,
) -> Result<(), CompileError> {
    if names.contains(reference) {
        Ok(())
    } else {
        Err(CompileError::UndefinedRule {
            rule: rule.to_string(),
            reference: reference.to_string(),
        })
    }
}

fn build_repeat(graph: &Graph, repeat: NodeId) -> Result<Repeat, CompileError> {
    let node = graph
        .node(repeat)
        .ok_or_else(|| shape_error("missing repeat"))?;
    if node.alt == 0 {
        return match node.value.as_str() {
            "?" => Ok(Repeat::Optional),
            "*" => Ok(Repeat::Star),
            "+" => Ok(Repeat::Plus),
            other => Err(shape_error(&format!("unknown repeat operator `{other}`"))),
        };
    }
    let many = node
        .children
        .first()
        .copied()
        .ok_or_else(|| shape_error("repeat without bounds"))?;
    let counts = children_tagged(graph, many, "count");
    let parse_count = |id: NodeId| -> Result<u32, CompileError> {
        let digits = leaf_value(graph, id)?;
        digits
            .parse::<u32>()
            .map_err(|error| shape_error(&format!("repeat bound: {error}")))
    };
    match counts.as_slice() {
        [min] => Ok(Repeat::Many {
            min: parse_count(*min)?,
            max: None,
        }),
        [min, max] => Ok(Repeat::Many {
            min: parse_count(*min)?,
            max: Some(parse_count(*max)?),
        }),
        _ => Err(shape_error("repeat bounds malformed")),
    }
}

/// Strip the delimiting quotes from a matched token, keeping the inside
/// verbatim (patterns hand their escapes to the regex engine).
fn unquote(token: &str) -> String {
    if token.len() >= 2 {
        token[1..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Strip delimiters and resolve `\x` escapes, for literal terms.
fn unquote_escaped(token: &str) -> String {
    let inner = unquote(token);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_grammar_compiles() {
        let rules = meta_rules();
        assert_eq!(rules.start(), Some("grammar"));
        assert!(rules.contains("factor"));
        assert!(rules.contains("pattern"));
    }

    #[test]
    fn test_self_hosted_compile_of_a_simple_grammar() {
        let text = "list ≈ item (\",\" item)*\nitem ≈ '^[a-z]+'";
        let bootstrap = compile(text).unwrap();
        let hosted = compile_via(text, meta_rules()).unwrap();
        assert_eq!(bootstrap, hosted);
    }

    #[test]
    fn test_self_hosted_compile_reports_undefined_rules() {
        let error = compile_via("list ≈ item", meta_rules()).unwrap_err();
        assert!(matches!(error, CompileError::UndefinedRule { .. }));
    }

    #[test]
    fn test_meta_grammar_accepts_itself() {
        let hosted = compile_via(META_GRAMMAR, meta_rules()).unwrap();
        assert_eq!(&hosted, meta_rules());
    }
}
