//! # gram
//!
//! A grammar engine for the gram format: compile a grammar written in the
//! compact gram meta-syntax into an executable rule set, parse scripts into
//! an in-memory node graph, and generate script text back from the graph.
//!
//! ## Testing
//!
//! Parser tests must use the verified sample corpus in
//! [`gram::testing::samples`] together with the round-trip harness in
//! [`gram::testing`]; see that module for the rules.

pub mod gram;
