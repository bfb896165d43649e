//! Property tests for the matcher
//!
//! Generated scripts round-trip exactly; arbitrary inputs terminate with
//! success or failure, never a hang or panic.

use proptest::prelude::*;

use gram::gram::processor::{compile_grammar, parse_script, render_script};
use gram::gram::testing::samples::{EXPR_GRAMMAR, LIST_GRAMMAR};

proptest! {
    #[test]
    fn prop_generated_lists_round_trip(items in prop::collection::vec("[a-z]{1,8}", 1..16)) {
        let rules = compile_grammar(LIST_GRAMMAR).unwrap();
        let script = items.join(",");
        let graph = parse_script(&script, &rules);
        prop_assert!(graph.is_ok());
        prop_assert_eq!(render_script(&graph.unwrap(), 0), script);
    }

    #[test]
    fn prop_item_values_keep_input_order(items in prop::collection::vec("[a-z]{1,8}", 1..16)) {
        let rules = compile_grammar(LIST_GRAMMAR).unwrap();
        let script = items.join(",");
        let graph = parse_script(&script, &rules).unwrap();
        let list = graph.node(graph.roots()[0]).unwrap();
        let values: Vec<String> = list
            .children
            .iter()
            .map(|&id| graph.node(id).unwrap().value.clone())
            .collect();
        prop_assert_eq!(values, items);
    }

    #[test]
    fn prop_arbitrary_list_input_terminates(input in "[ -~]{0,64}") {
        let rules = compile_grammar(LIST_GRAMMAR).unwrap();
        let _ = parse_script(&input, &rules);
    }

    #[test]
    fn prop_arbitrary_expr_input_terminates(input in r"[0-9+*\-() ]{0,48}") {
        let rules = compile_grammar(EXPR_GRAMMAR).unwrap();
        let _ = parse_script(&input, &rules);
    }

    #[test]
    fn prop_expr_round_trip_is_idempotent(input in r"[0-9+*\-()]{0,24}") {
        let rules = compile_grammar(EXPR_GRAMMAR).unwrap();
        if let Ok(graph) = parse_script(&input, &rules) {
            let rendered = render_script(&graph, 0);
            let reparsed = parse_script(&rendered, &rules);
            prop_assert!(reparsed.is_ok());
            prop_assert_eq!(render_script(&reparsed.unwrap(), 0), rendered);
        }
    }
}
