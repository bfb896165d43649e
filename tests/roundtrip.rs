//! Round-trip tests over the verified corpus
//!
//! Every valid script must regenerate either verbatim or as the documented
//! normal form, and the normal form must be a fixed point of parse∘render.

use gram::gram::grammar::meta::META_GRAMMAR;
use gram::gram::testing::samples::{
    EXPR_GRAMMAR, EXPR_SCRIPTS, LIST_GRAMMAR, LIST_SCRIPT, NODE_GRAMMAR, NODE_SCRIPT,
    NODE_SCRIPT_NORMAL,
};
use gram::gram::testing::{check_fixpoint, check_round_trip};

#[test]
fn test_list_round_trips_verbatim() {
    check_round_trip(LIST_GRAMMAR, LIST_SCRIPT, None).unwrap();
}

#[test]
fn test_single_item_round_trips_verbatim() {
    check_round_trip(LIST_GRAMMAR, "only", None).unwrap();
}

#[test]
fn test_expression_corpus_round_trips_verbatim() {
    for script in EXPR_SCRIPTS {
        check_round_trip(EXPR_GRAMMAR, script, None)
            .unwrap_or_else(|error| panic!("{script}: {error}"));
    }
}

#[test]
fn test_node_script_normalizes_stably() {
    check_round_trip(NODE_GRAMMAR, NODE_SCRIPT, Some(NODE_SCRIPT_NORMAL)).unwrap();
}

#[test]
fn test_normal_form_is_already_normal() {
    // rendering the normal form changes nothing further
    check_round_trip(NODE_GRAMMAR, NODE_SCRIPT_NORMAL, Some(NODE_SCRIPT_NORMAL)).unwrap();
}

#[test]
fn test_meta_grammar_text_reaches_a_fixed_point() {
    // the meta-grammar is itself a script of the meta-grammar
    let normal = check_fixpoint(META_GRAMMAR, META_GRAMMAR).unwrap();
    assert!(normal.contains("grammar"));
    assert!(normal.contains("factor"));
}

#[test]
fn test_grammar_scripts_reach_fixed_points() {
    for grammar in [LIST_GRAMMAR, EXPR_GRAMMAR, NODE_GRAMMAR] {
        check_fixpoint(META_GRAMMAR, grammar)
            .unwrap_or_else(|error| panic!("{grammar}: {error}"));
    }
}
