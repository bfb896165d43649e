//! Two-pass grammar compiler
//!
//! Pass 1 scans the grammar text for rule declarations — `name ≈ body`,
//! optionally followed by a `{ … }` block of subordinate rules — recording
//! each raw body without resolving anything, so self- and forward-references
//! are legal. Pass 2 parses every body into terms with a chumsky combinator,
//! then resolves bare identifiers against the collected name table and
//! compiles capture patterns.
//!
//! A grammar either compiles completely or fails with a [`CompileError`];
//! nothing is partially applied.

use chumsky::prelude::*;
use indexmap::IndexSet;
use std::fmt;

use super::{CapturePattern, Repeat, Rule, RuleSet, Term};
use crate::gram::location::line_col;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    EmptyGrammar,
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    Unterminated {
        line: usize,
        column: usize,
        what: &'static str,
    },
    DuplicateRule {
        name: String,
    },
    UndefinedRule {
        rule: String,
        reference: String,
    },
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },
}

impl std::error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::EmptyGrammar => write!(f, "grammar contains no rules"),
            CompileError::Syntax {
                line,
                column,
                message,
            } => write!(f, "syntax error at line {line}, column {column}: {message}"),
            CompileError::Unterminated { line, column, what } => {
                write!(f, "unterminated {what} starting at line {line}, column {column}")
            }
            CompileError::DuplicateRule { name } => {
                write!(f, "rule `{name}` is declared more than once")
            }
            CompileError::UndefinedRule { rule, reference } => {
                write!(f, "rule `{rule}` references undefined rule `{reference}`")
            }
            CompileError::InvalidPattern {
                rule,
                pattern,
                message,
            } => write!(f, "invalid pattern in rule `{rule}`: '{pattern}': {message}"),
        }
    }
}

/// Compile grammar text into a [`RuleSet`].
pub fn compile(text: &str) -> Result<RuleSet, CompileError> {
    let mut scanner = Scanner::new(text);
    let decls = scan_decls(&mut scanner, false, 0)?;
    if decls.is_empty() {
        return Err(CompileError::EmptyGrammar);
    }

    let mut flat = Vec::new();
    flatten(&decls, &mut flat);

    let mut names = IndexSet::new();
    for decl in &flat {
        if !names.insert(decl.name.clone()) {
            return Err(CompileError::DuplicateRule {
                name: decl.name.clone(),
            });
        }
    }

    let mut rules = RuleSet::default();
    for decl in &flat {
        let raw = parse_body(&decl.body, decl.body_offset, text)?;
        let alternatives = raw
            .into_iter()
            .map(|sequence| {
                sequence
                    .into_iter()
                    .map(|term| resolve_term(&decl.name, term, &names))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        rules.insert(Rule {
            name: decl.name.clone(),
            alternatives,
        });
    }
    Ok(rules)
}

// ---------------------------------------------------------------------------
// Pass 1: declaration scanner
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RawDecl {
    name: String,
    body: String,
    /// Byte offset of the body within the full grammar text, for error
    /// positions.
    body_offset: usize,
    nested: Vec<RawDecl>,
}

fn flatten<'a>(decls: &'a [RawDecl], out: &mut Vec<&'a RawDecl>) {
    for decl in decls {
        out.push(decl);
        flatten(&decl.nested, out);
    }
}

struct Scanner<'t> {
    text: &'t str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.text.len())
    }

    fn bump(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Option<String> {
        let mut out = String::new();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                out.push(c);
                self.pos += 1;
            }
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(out)
    }

    /// Non-consuming lookahead for `ident ws* ≈`, the start of the next
    /// declaration.
    fn at_decl_head(&mut self) -> bool {
        let save = self.pos;
        let is_head = self.ident().is_some() && {
            self.skip_ws();
            self.peek() == Some('≈')
        };
        self.pos = save;
        is_head
    }

    fn consume_quoted(&mut self, delim: char) -> Result<(), CompileError> {
        let open = self.offset();
        self.bump();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                self.bump();
                continue;
            }
            self.bump();
            if c == delim {
                return Ok(());
            }
        }
        Err(self.unterminated(if delim == '"' { "string" } else { "pattern" }, open))
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        let (line, column) = line_col(self.text, self.offset());
        CompileError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn unterminated(&self, what: &'static str, open_offset: usize) -> CompileError {
        let (line, column) = line_col(self.text, open_offset);
        CompileError::Unterminated { line, column, what }
    }
}

enum BodyEnd {
    /// The next declaration's head follows.
    Decl,
    /// A `{ … }` block of subordinate rules follows.
    Block,
    /// The enclosing block's `}` follows.
    Close,
    Eof,
}

fn scan_decls(
    scanner: &mut Scanner,
    nested: bool,
    block_open: usize,
) -> Result<Vec<RawDecl>, CompileError> {
    let mut decls = Vec::new();
    loop {
        scanner.skip_ws();
        match scanner.peek() {
            None => {
                if nested {
                    return Err(scanner.unterminated("block", block_open));
                }
                return Ok(decls);
            }
            Some('}') if nested => return Ok(decls),
            _ => {}
        }
        let name = match scanner.ident() {
            Some(name) => name,
            None => return Err(scanner.error("expected rule name")),
        };
        scanner.skip_ws();
        if scanner.peek() != Some('≈') {
            return Err(scanner.error(format!("expected `≈` after rule name `{name}`")));
        }
        scanner.bump();
        scanner.skip_ws();
        let body_start = scanner.offset();
        let (body_end, end) = scan_body(scanner, nested)?;
        let body = scanner.text[body_start..body_end].trim_end().to_string();
        if body.is_empty() {
            return Err(scanner.error(format!("rule `{name}` has an empty body")));
        }
        let mut decl = RawDecl {
            name,
            body,
            body_offset: body_start,
            nested: Vec::new(),
        };
        if matches!(end, BodyEnd::Block) {
            let open = scanner.offset();
            scanner.bump(); // '{'
            decl.nested = scan_decls(scanner, true, open)?;
            scanner.bump(); // '}'
        }
        decls.push(decl);
        if matches!(end, BodyEnd::Eof) {
            return Ok(decls);
        }
    }
}

/// Walk one rule body, honoring quotes and paren nesting, until whatever
/// terminates it. Returns the body's end offset and what ended it.
fn scan_body(scanner: &mut Scanner, nested: bool) -> Result<(usize, BodyEnd), CompileError> {
    let mut paren_depth = 0usize;
    let mut last_open_paren = 0usize;
    loop {
        match scanner.peek() {
            None => {
                if paren_depth > 0 {
                    return Err(scanner.unterminated("group", last_open_paren));
                }
                return Ok((scanner.offset(), BodyEnd::Eof));
            }
            Some('"') => scanner.consume_quoted('"')?,
            Some('\'') => scanner.consume_quoted('\'')?,
            Some('(') => {
                last_open_paren = scanner.offset();
                paren_depth += 1;
                scanner.bump();
            }
            Some(')') => {
                if paren_depth == 0 {
                    return Err(scanner.error("unmatched `)`"));
                }
                paren_depth -= 1;
                scanner.bump();
            }
            Some('{') => {
                // `{2}` / `{2,3}` is a repeat bound; `{ rule … }` opens a
                // block of subordinate rules
                let save = scanner.pos;
                scanner.bump();
                scanner.skip_ws();
                let is_bound = matches!(scanner.peek(), Some(c) if c.is_ascii_digit());
                scanner.pos = save;
                if is_bound {
                    let open = scanner.offset();
                    scanner.bump();
                    loop {
                        match scanner.peek() {
                            None => return Err(scanner.unterminated("repeat bound", open)),
                            Some('}') => {
                                scanner.bump();
                                break;
                            }
                            Some(_) => scanner.bump(),
                        }
                    }
                } else {
                    if paren_depth > 0 {
                        return Err(scanner.error("rule block inside a group"));
                    }
                    return Ok((scanner.offset(), BodyEnd::Block));
                }
            }
            Some('}') => {
                if paren_depth > 0 {
                    return Err(scanner.error("unmatched `}` inside a group"));
                }
                if nested {
                    return Ok((scanner.offset(), BodyEnd::Close));
                }
                return Err(scanner.error("unmatched `}`"));
            }
            Some(c) if paren_depth == 0 && (c.is_ascii_alphabetic() || c == '_') => {
                if scanner.at_decl_head() {
                    return Ok((scanner.offset(), BodyEnd::Decl));
                }
                let _ = scanner.ident();
            }
            Some(_) => scanner.bump(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 2: term parsing and resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum RawTerm {
    Literal(String),
    Pattern(String),
    Name(String),
    Edge(String),
    Not(Box<RawTerm>),
    Group(Vec<Vec<RawTerm>>),
    Repeat { term: Box<RawTerm>, repeat: Repeat },
}

/// Combinator for the contents of a quoted token, keeping escape pairs
/// verbatim (`\"`, `\'`, `\\` — patterns hand them to the regex engine).
fn quoted(delim: char) -> impl Parser<char, String, Error = Simple<char>> + Clone {
    let escaped = just('\\').ignore_then(any()).map(|c| vec!['\\', c]);
    let plain = filter(move |c: &char| *c != delim && *c != '\\').map(|c| vec![c]);
    just(delim)
        .ignore_then(escaped.or(plain).repeated())
        .then_ignore(just(delim))
        .map(|parts: Vec<Vec<char>>| parts.into_iter().flatten().collect::<String>())
}

fn body_parser() -> impl Parser<char, Vec<Vec<RawTerm>>, Error = Simple<char>> {
    let pad = filter(|c: &char| c.is_whitespace()).repeated().ignored();

    let count = text::int(10).try_map(|digits: String, span| {
        digits
            .parse::<u32>()
            .map_err(|e| Simple::custom(span, format!("repeat bound: {e}")))
    });
    let count = count.then_ignore(pad.clone());

    let many = just('{')
        .then_ignore(pad.clone())
        .ignore_then(count.clone())
        .then(
            just(',')
                .then_ignore(pad.clone())
                .ignore_then(count)
                .or_not(),
        )
        .then_ignore(just('}'))
        .map(|(min, max)| Repeat::Many { min, max });

    let repeat = choice((
        just('?').to(Repeat::Optional),
        just('*').to(Repeat::Star),
        just('+').to(Repeat::Plus),
        many,
    ))
    .then_ignore(pad.clone());

    let term = recursive(|term| {
        let sequence = term.repeated().at_least(1);
        let alternation = sequence
            .separated_by(just('|').then_ignore(pad.clone()))
            .at_least(1);

        let group = alternation
            .delimited_by(just('(').then_ignore(pad.clone()), just(')'))
            .then_ignore(pad.clone())
            .map(RawTerm::Group);

        let literal = quoted('"').then_ignore(pad.clone()).map(RawTerm::Literal);
        let pattern = quoted('\'').then_ignore(pad.clone()).map(RawTerm::Pattern);
        let edge = just('@')
            .ignore_then(text::ident())
            .then_ignore(pad.clone())
            .map(RawTerm::Edge);
        let name = text::ident().then_ignore(pad.clone()).map(RawTerm::Name);

        let factor = choice((group, literal, pattern, edge, name));

        let negated = just('!')
            .then_ignore(pad.clone())
            .ignore_then(factor.clone())
            .map(|inner| RawTerm::Not(Box::new(inner)));

        let decorated = factor.then(repeat.or_not()).map(|(inner, repeat)| match repeat {
            Some(repeat) => RawTerm::Repeat {
                term: Box::new(inner),
                repeat,
            },
            None => inner,
        });

        negated.or(decorated)
    });

    let sequence = term.repeated().at_least(1);
    pad.ignore_then(
        sequence
            .separated_by(just('|').then_ignore(pad.clone()))
            .at_least(1),
    )
    .then_ignore(end())
}

fn parse_body(
    body: &str,
    body_offset: usize,
    full_text: &str,
) -> Result<Vec<Vec<RawTerm>>, CompileError> {
    body_parser().parse(body).map_err(|errors| {
        let error = &errors[0];
        let char_index = error.span().start;
        let byte_in_body = body
            .char_indices()
            .nth(char_index)
            .map(|(b, _)| b)
            .unwrap_or(body.len());
        let (line, column) = line_col(full_text, body_offset + byte_in_body);
        let message = match error.found() {
            Some(c) => format!("unexpected `{c}`"),
            None => "unexpected end of rule body".to_string(),
        };
        CompileError::Syntax {
            line,
            column,
            message,
        }
    })
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
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

fn resolve_term(
    rule: &str,
    raw: RawTerm,
    names: &IndexSet<String>,
) -> Result<Term, CompileError> {
    match raw {
        RawTerm::Literal(text) => Ok(Term::Literal(unescape(&text))),
        RawTerm::Pattern(source) => match CapturePattern::new(&source) {
            Ok(pattern) => Ok(Term::Pattern(pattern)),
            Err(error) => Err(CompileError::InvalidPattern {
                rule: rule.to_string(),
                pattern: source,
                message: error.to_string(),
            }),
        },
        RawTerm::Name(name) => {
            if names.contains(&name) {
                Ok(Term::Ref(name))
            } else {
                Err(CompileError::UndefinedRule {
                    rule: rule.to_string(),
                    reference: name,
                })
            }
        }
        RawTerm::Edge(name) => {
            if names.contains(&name) {
                Ok(Term::Edge(name))
            } else {
                Err(CompileError::UndefinedRule {
                    rule: rule.to_string(),
                    reference: name,
                })
            }
        }
        RawTerm::Not(inner) => Ok(Term::Not(Box::new(resolve_term(rule, *inner, names)?))),
        RawTerm::Group(alternatives) => {
            let resolved = alternatives
                .into_iter()
                .map(|sequence| {
                    sequence
                        .into_iter()
                        .map(|term| resolve_term(rule, term, names))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Term::Group(resolved))
        }
        RawTerm::Repeat { term, repeat } => Ok(Term::Repeat {
            term: Box::new(resolve_term(rule, *term, names)?),
            repeat,
        }),
    }
}
