//! Grammar compilation behaviors at the API surface

use gram::gram::grammar::{compile, CompileError, Term};
use gram::gram::processor::compile_grammar;
use gram::gram::testing::samples::{EXPR_GRAMMAR, LIST_GRAMMAR, NODE_GRAMMAR};

#[test]
fn test_corpus_grammars_compile() {
    for grammar in [LIST_GRAMMAR, EXPR_GRAMMAR, NODE_GRAMMAR] {
        compile_grammar(grammar).unwrap_or_else(|error| panic!("{error}:\n{grammar}"));
    }
}

#[test]
fn test_compilation_is_never_partial() {
    // the last rule is broken, so nothing is returned at all
    let error = compile("a ≈ b\nb ≈ '^[ok]'\nc ≈ missing").unwrap_err();
    assert_eq!(
        error,
        CompileError::UndefinedRule {
            rule: "c".to_string(),
            reference: "missing".to_string(),
        }
    );
}

#[test]
fn test_nested_rules_are_visible_forward_and_backward() {
    let rules = compile(
        "song ≈ intro verse+ {\n    verse ≈ line+ {\n        line ≈ '^[a-z ]+\\n'\n    }\n    intro ≈ line\n}",
    )
    .unwrap();
    // `intro` references `line`, declared later inside a sibling's block
    assert_eq!(
        rules.names().collect::<Vec<_>>(),
        vec!["song", "verse", "line", "intro"]
    );
}

#[test]
fn test_display_output_recompiles_to_the_same_rules() {
    for grammar in [LIST_GRAMMAR, EXPR_GRAMMAR, NODE_GRAMMAR] {
        let rules = compile(grammar).unwrap();
        let normalized = rules.to_string();
        let recompiled = compile(&normalized)
            .unwrap_or_else(|error| panic!("{error}:\n{normalized}"));
        assert_eq!(rules, recompiled, "normal form diverged:\n{normalized}");
    }
}

#[test]
fn test_start_rule_is_the_first_declared() {
    let rules = compile(EXPR_GRAMMAR).unwrap();
    assert_eq!(rules.start(), Some("expr"));
}

#[test]
fn test_error_positions_are_line_accurate() {
    let error = compile("a ≈ '^x'\nb ≈ (\"y\"").unwrap_err();
    match error {
        CompileError::Unterminated { line, what, .. } => {
            assert_eq!(line, 2);
            assert_eq!(what, "group");
        }
        other => panic!("expected unterminated group, got {other}"),
    }
}

#[test]
fn test_edge_terms_survive_compilation() {
    let rules = compile(NODE_GRAMMAR).unwrap();
    let link = rules.get("link").unwrap();
    assert_eq!(link.alternatives[0][1], Term::Edge("path".to_string()));
}
