//! Testing utilities for round-trip verification
//!
//! # Parser Testing Guidelines
//!
//! Testing the engine must follow two rules:
//!
//! 1. **Use the verified sample corpus.** Grammars and scripts live in
//!    [`samples`], not inline in test files. The gram format is easy to get
//!    subtly wrong, and when the format evolves every source must be
//!    re-verified; scattering scripts across test files makes that a
//!    maintenance trap.
//!
//! 2. **Verify by round-trip, not by counting.** Asserting node counts says
//!    nothing about shape. [`check_round_trip`] parses a script, regenerates
//!    it, and compares against the expected text char-for-char, then
//!    re-parses the regenerated form to prove it is a fixed point.

pub mod samples;
pub mod text_diff;

pub use text_diff::{assert_text_eq, diff_text, first_divergence};

use crate::gram::processor::{compile_grammar, parse_script, render_script};

/// Parse `script` under `grammar`, render it back, and compare with
/// `expected` (the script itself when `None`). On success, additionally
/// verify the rendered form is a fixed point of parse∘render.
pub fn check_round_trip(
    grammar: &str,
    script: &str,
    expected: Option<&str>,
) -> Result<(), String> {
    let rules = compile_grammar(grammar).map_err(|error| format!("compile failed: {error}"))?;
    let graph = parse_script(script, &rules).map_err(|error| format!("parse failed: {error}"))?;
    let actual = render_script(&graph, 0);
    let expected = expected.unwrap_or(script);
    if let Some(index) = first_divergence(expected, &actual) {
        let report = diff_text(expected, &actual).unwrap_or_default();
        return Err(format!("output diverges at char {index}\n{report}"));
    }
    let reparsed = parse_script(&actual, &rules)
        .map_err(|error| format!("re-parse of rendered output failed: {error}"))?;
    let again = render_script(&reparsed, 0);
    if again != actual {
        return Err("rendered output is not a fixed point".to_string());
    }
    Ok(())
}

/// Like [`check_round_trip`] without an expected text: only require that
/// rendering stabilizes after one parse∘render step. Returns the normal
/// form.
pub fn check_fixpoint(grammar: &str, script: &str) -> Result<String, String> {
    let rules = compile_grammar(grammar).map_err(|error| format!("compile failed: {error}"))?;
    let graph = parse_script(script, &rules).map_err(|error| format!("parse failed: {error}"))?;
    let normal = render_script(&graph, 0);
    let reparsed = parse_script(&normal, &rules)
        .map_err(|error| format!("re-parse of rendered output failed: {error}"))?;
    let again = render_script(&reparsed, 0);
    if again != normal {
        return Err(format!(
            "rendered output is not a fixed point\nfirst:\n{normal}\nsecond:\n{again}"
        ));
    }
    Ok(normal)
}
