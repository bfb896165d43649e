//! Self-hosting equivalence
//!
//! The bootstrap compiler (combinators) and the self-hosted path (the
//! matcher running the meta-grammar over grammar text) must produce the
//! same rule sets — structurally, and in accept/reject behavior over the
//! corpus.

use gram::gram::grammar::meta::{compile_via, meta_rules, META_GRAMMAR};
use gram::gram::processor::{compile_grammar, parse_script};
use gram::gram::testing::samples::{
    EXPR_GRAMMAR, EXPR_SCRIPTS, EXPR_SCRIPTS_BAD, LIST_GRAMMAR, LIST_SCRIPT, LIST_SCRIPT_BAD,
    NODE_GRAMMAR,
};

#[test]
fn test_meta_grammar_compiles_itself_to_the_bootstrap_rules() {
    let hosted = compile_via(META_GRAMMAR, meta_rules()).unwrap();
    assert_eq!(&hosted, meta_rules());
}

#[test]
fn test_self_application_is_a_fixed_point() {
    let hosted = compile_via(META_GRAMMAR, meta_rules()).unwrap();
    let rehosted = compile_via(META_GRAMMAR, &hosted).unwrap();
    assert_eq!(rehosted, hosted);
}

#[test]
fn test_both_paths_agree_structurally_on_the_corpus() {
    for grammar in [LIST_GRAMMAR, EXPR_GRAMMAR, NODE_GRAMMAR] {
        let bootstrap = compile_grammar(grammar).unwrap();
        let hosted = compile_via(grammar, meta_rules()).unwrap();
        assert_eq!(bootstrap, hosted, "paths diverge for:\n{grammar}");
    }
}

#[test]
fn test_both_paths_agree_on_accept_reject_decisions() {
    let bootstrap = compile_grammar(EXPR_GRAMMAR).unwrap();
    let hosted = compile_via(EXPR_GRAMMAR, meta_rules()).unwrap();
    for script in EXPR_SCRIPTS.iter().chain(EXPR_SCRIPTS_BAD) {
        let a = parse_script(script, &bootstrap).is_ok();
        let b = parse_script(script, &hosted).is_ok();
        assert_eq!(a, b, "decision differs for `{script}`");
    }

    let bootstrap = compile_grammar(LIST_GRAMMAR).unwrap();
    let hosted = compile_via(LIST_GRAMMAR, meta_rules()).unwrap();
    for script in [LIST_SCRIPT, LIST_SCRIPT_BAD, "x", "x,", ",x"] {
        assert_eq!(
            parse_script(script, &bootstrap).is_ok(),
            parse_script(script, &hosted).is_ok(),
            "decision differs for `{script}`"
        );
    }
}

#[test]
fn test_hosted_compile_rejects_what_the_bootstrap_rejects() {
    for bad in [
        "list ≈ undefined_thing",
        "a ≈ \"x\"\na ≈ \"y\"",
        "a ≈ '^[bad'",
    ] {
        assert!(compile_grammar(bad).is_err(), "bootstrap accepted `{bad}`");
        assert!(
            compile_via(bad, meta_rules()).is_err(),
            "hosted path accepted `{bad}`"
        );
    }
}
