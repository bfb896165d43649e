//! Rule model for compiled grammars
//!
//! A grammar is an insertion-ordered table of named [`Rule`]s; each rule is
//! an ordered list of alternatives, each alternative an ordered sequence of
//! [`Term`]s. Rules reference each other by name through the table, so
//! self-references and forward references cost nothing to represent: the
//! compiler validates every name before the [`RuleSet`] is handed out.
//!
//! The grammar-of-grammars is expressible in this same model; see
//! [`meta`] for the bootstrap path and the self-hosted one.

use indexmap::IndexMap;
use regex::Regex;
use std::fmt;

pub mod compiler;
pub mod meta;

pub use compiler::{compile, CompileError};

/// A `^`-anchored regular-expression term.
///
/// The written source is retained for equality and re-rendering; the
/// compiled regex is what the matcher runs. Anchoring is enforced at
/// construction so a pattern can only ever match at the cursor.
#[derive(Debug, Clone)]
pub struct CapturePattern {
    source: String,
    regex: Regex,
}

impl CapturePattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let anchored = if source.starts_with('^') {
            source.to_string()
        } else {
            format!("^{source}")
        };
        Ok(Self {
            regex: Regex::new(&anchored)?,
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The matched prefix of `text`, if the pattern matches at its start.
    pub fn match_prefix<'t>(&self, text: &'t str) -> Option<&'t str> {
        let found = self.regex.find(text)?;
        if found.start() != 0 {
            return None;
        }
        Some(found.as_str())
    }
}

impl PartialEq for CapturePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CapturePattern {}

/// Repetition decoration on a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// `?` — zero or one.
    Optional,
    /// `*` — zero or more, greedy.
    Star,
    /// `+` — one or more, greedy.
    Plus,
    /// `{min}` / `{min,max}` — the bounded many block.
    Many { min: u32, max: Option<u32> },
}

/// One term of a rule alternative.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Verbatim text.
    Literal(String),
    /// Anchored regex capture.
    Pattern(CapturePattern),
    /// Named reference to another rule, resolved through the rule table.
    Ref(String),
    /// Alias reference (`@name`): matches the referenced rule's syntax but
    /// records a non-owning edge to the node the matched path resolves to,
    /// instead of owning fresh substructure.
    Edge(String),
    /// Negative lookahead (`!factor`): succeeds without consuming input
    /// exactly when the inner term fails to match at the cursor.
    Not(Box<Term>),
    /// Parenthesized alternation of sequences.
    Group(Vec<Vec<Term>>),
    /// A term decorated with a repetition operator.
    Repeat { term: Box<Term>, repeat: Repeat },
}

fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn fmt_alternatives(alternatives: &[Vec<Term>], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (index, sequence) in alternatives.iter().enumerate() {
        if index > 0 {
            write!(f, " | ")?;
        }
        for (t, term) in sequence.iter().enumerate() {
            if t > 0 {
                write!(f, " ")?;
            }
            write!(f, "{term}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Term {
    /// Normalized grammar notation, the inverse of the compiler.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Literal(text) => write!(f, "\"{}\"", escape_literal(text)),
            Term::Pattern(pattern) => write!(f, "'{}'", pattern.source()),
            Term::Ref(name) => write!(f, "{name}"),
            Term::Edge(name) => write!(f, "@{name}"),
            Term::Not(term) => write!(f, "!{term}"),
            Term::Group(alternatives) => {
                write!(f, "(")?;
                fmt_alternatives(alternatives, f)?;
                write!(f, ")")
            }
            Term::Repeat { term, repeat } => {
                write!(f, "{term}")?;
                match repeat {
                    Repeat::Optional => write!(f, "?"),
                    Repeat::Star => write!(f, "*"),
                    Repeat::Plus => write!(f, "+"),
                    Repeat::Many { min, max: None } => write!(f, "{{{min}}}"),
                    Repeat::Many {
                        min,
                        max: Some(max),
                    } => write!(f, "{{{min},{max}}}"),
                }
            }
        }
    }
}

/// A named rule: ordered alternatives of term sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub alternatives: Vec<Vec<Term>>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ≈ ", self.name)?;
        fmt_alternatives(&self.alternatives, f)
    }
}

/// Insertion-ordered name → rule table. The first rule declared is the
/// start rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: IndexMap<String, Rule>,
}

impl RuleSet {
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.name.clone(), rule)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Name of the start rule: the first rule declared.
    pub fn start(&self) -> Option<&str> {
        self.rules.keys().next().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|name| name.as_str())
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, rule) in self.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}
