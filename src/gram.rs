//! Main module for gram library functionality
//!
//! The pipeline runs in three stages, each usable on its own:
//!
//! 1. [`grammar`] compiles grammar text into a [`RuleSet`](grammar::RuleSet).
//! 2. [`matching`] parses a script under a rule set into a
//!    [`Graph`](graph::Graph) of nodes.
//! 3. [`formats`] renders the graph back to script text (or to diagnostic
//!    formats).
//!
//! [`visit`] provides the concurrency-safe visitor used by external
//! traversals to process each node exactly once per logical event, and
//! [`processor`] bundles the three stages behind the surface API.

pub mod formats;
pub mod grammar;
pub mod graph;
pub mod location;
pub mod matching;
pub mod processor;
pub mod testing;
pub mod visit;

pub use grammar::{compile, CompileError, Rule, RuleSet, Term};
pub use graph::{Graph, Node, NodeId};
pub use matching::{Matcher, ParseError};
pub use processor::{compile_grammar, parse_script, parse_script_from, render_script};
pub use visit::{Origin, Visitor};
