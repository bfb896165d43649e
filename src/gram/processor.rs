//! Surface API for gram processing
//!
//! The three pipeline stages behind single calls, plus the output-format
//! selection used by the `gram` binary. The library owns no file or network
//! I/O; grammar and script texts arrive in-memory.

use std::fmt;

use crate::gram::formats;
use crate::gram::grammar::{self, CompileError, RuleSet};
use crate::gram::graph::Graph;
use crate::gram::matching::{Matcher, ParseError};

/// Compile grammar text into an executable rule set.
pub fn compile_grammar(text: &str) -> Result<RuleSet, CompileError> {
    grammar::compile(text)
}

/// Parse a script under a rule set, starting from the rule set's start rule.
pub fn parse_script(text: &str, rules: &RuleSet) -> Result<Graph, ParseError> {
    Matcher::new(rules).parse(text)
}

/// Parse a script starting from an explicitly named rule.
pub fn parse_script_from(text: &str, rules: &RuleSet, start: &str) -> Result<Graph, ParseError> {
    Matcher::new(rules).parse_from(text, start)
}

/// Generate script text from a graph at the given indent level.
pub fn render_script(graph: &Graph, indent_level: usize) -> String {
    formats::render_script(graph, indent_level)
}

/// Output format for processed scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Regenerated script text (the round-trip form).
    Script,
    /// Indented debug tree of nodes and edges.
    Tree,
    /// JSON dump of the graph arena.
    Json,
}

impl OutputFormat {
    /// Parse a format string like `script`, `tree` or `json`.
    pub fn from_string(format: &str) -> Result<Self, ProcessorError> {
        match format {
            "script" => Ok(OutputFormat::Script),
            "tree" => Ok(OutputFormat::Tree),
            "json" => Ok(OutputFormat::Json),
            other => Err(ProcessorError::InvalidFormat(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ProcessorError {
    Compile(CompileError),
    Parse(ParseError),
    InvalidFormat(String),
    Serialize(String),
    Io(String),
}

impl std::error::Error for ProcessorError {}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorError::Compile(error) => write!(f, "compile error: {error}"),
            ProcessorError::Parse(error) => write!(f, "{error}"),
            ProcessorError::InvalidFormat(format) => write!(f, "invalid format: {format}"),
            ProcessorError::Serialize(message) => write!(f, "serialize error: {message}"),
            ProcessorError::Io(message) => write!(f, "IO error: {message}"),
        }
    }
}

impl From<CompileError> for ProcessorError {
    fn from(error: CompileError) -> Self {
        ProcessorError::Compile(error)
    }
}

impl From<ParseError> for ProcessorError {
    fn from(error: ParseError) -> Self {
        ProcessorError::Parse(error)
    }
}

/// Compile, parse and serialize in one step.
pub fn process(
    grammar_text: &str,
    script_text: &str,
    format: OutputFormat,
    indent_level: usize,
) -> Result<String, ProcessorError> {
    let rules = compile_grammar(grammar_text)?;
    let graph = parse_script(script_text, &rules)?;
    serialize_graph(&graph, format, indent_level)
}

/// Serialize an already-parsed graph.
pub fn serialize_graph(
    graph: &Graph,
    format: OutputFormat,
    indent_level: usize,
) -> Result<String, ProcessorError> {
    match format {
        OutputFormat::Script => Ok(formats::render_script(graph, indent_level)),
        OutputFormat::Tree => Ok(formats::to_treeviz_str(graph)),
        OutputFormat::Json => serde_json::to_string_pretty(graph)
            .map_err(|error| ProcessorError::Serialize(error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAMMAR: &str = "list ≈ item (\",\" item)*\nitem ≈ '^[a-z]+'";

    #[test]
    fn test_process_script_format_round_trips() {
        let output = process(GRAMMAR, "a,b,c", OutputFormat::Script, 0).unwrap();
        assert_eq!(output, "a,b,c");
    }

    #[test]
    fn test_process_tree_format() {
        let output = process(GRAMMAR, "a,b", OutputFormat::Tree, 0).unwrap();
        assert!(output.starts_with("list"));
    }

    #[test]
    fn test_process_json_format_is_valid_json() {
        let output = process(GRAMMAR, "a,b", OutputFormat::Json, 0).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(value.get("roots").is_some());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(matches!(
            OutputFormat::from_string("yaml"),
            Err(ProcessorError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_errors_carry_their_stage() {
        let compile_error = process("list ≈ missing", "a", OutputFormat::Script, 0).unwrap_err();
        assert!(matches!(compile_error, ProcessorError::Compile(_)));
        let parse_error = process(GRAMMAR, "a,,b", OutputFormat::Script, 0).unwrap_err();
        assert!(matches!(parse_error, ProcessorError::Parse(_)));
    }
}
