//! Command-line interface for gram
//! This binary compiles gram grammars and processes scripts against them.
//!
//! Usage:
//!   gram check `<grammar>` [--print]                        - Compile a grammar and report problems
//!   gram parse `<grammar>` `<script>` [--format `<format>`] - Parse a script and serialize the graph
//!   gram roundtrip `<grammar>` `<script>`                   - Parse, regenerate, and diff against the input

use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

use gram::gram::matching::Matcher;
use gram::gram::processor::{self, OutputFormat};
use gram::gram::testing::{diff_text, first_divergence};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("gram")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for compiling gram grammars and processing scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Compile a grammar and report problems")
                .arg(
                    Arg::new("grammar")
                        .help("Path to the grammar file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("print")
                        .long("print")
                        .help("Print the normalized rule set")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a script and serialize the resulting graph")
                .arg(
                    Arg::new("grammar")
                        .help("Path to the grammar file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("script")
                        .help("Path to the script file")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format ('script', 'tree' or 'json')")
                        .default_value("script"),
                )
                .arg(
                    Arg::new("indent")
                        .long("indent")
                        .help("Indent level for script output")
                        .default_value("0"),
                )
                .arg(
                    Arg::new("trace")
                        .long("trace")
                        .help("Print every rule attempt to stderr")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Parse a script, regenerate it, and diff against the input")
                .arg(
                    Arg::new("grammar")
                        .help("Path to the grammar file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("script")
                        .help("Path to the script file")
                        .required(true)
                        .index(2),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("check", check_matches)) => {
            let grammar = check_matches.get_one::<String>("grammar").unwrap();
            let print = check_matches.get_flag("print");
            handle_check_command(grammar, print);
        }
        Some(("parse", parse_matches)) => {
            let grammar = parse_matches.get_one::<String>("grammar").unwrap();
            let script = parse_matches.get_one::<String>("script").unwrap();
            let format = parse_matches.get_one::<String>("format").unwrap();
            let indent = parse_matches.get_one::<String>("indent").unwrap();
            let trace = parse_matches.get_flag("trace");
            handle_parse_command(grammar, script, format, indent, trace);
        }
        Some(("roundtrip", roundtrip_matches)) => {
            let grammar = roundtrip_matches.get_one::<String>("grammar").unwrap();
            let script = roundtrip_matches.get_one::<String>("script").unwrap();
            handle_roundtrip_command(grammar, script);
        }
        _ => unreachable!(),
    }
}

fn read_file(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("Error reading {path}: {error}");
        std::process::exit(1);
    })
}

fn handle_check_command(grammar_path: &str, print: bool) {
    let grammar_text = read_file(grammar_path);
    match processor::compile_grammar(&grammar_text) {
        Ok(rules) => {
            println!(
                "ok: {} rule{}, start rule `{}`",
                rules.len(),
                if rules.len() == 1 { "" } else { "s" },
                rules.start().unwrap_or("")
            );
            if print {
                println!("{rules}");
            }
        }
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

fn handle_parse_command(
    grammar_path: &str,
    script_path: &str,
    format: &str,
    indent: &str,
    trace: bool,
) {
    let format = OutputFormat::from_string(format).unwrap_or_else(|error| {
        eprintln!("Error: {error}");
        std::process::exit(1);
    });
    let indent: usize = indent.parse().unwrap_or_else(|_| {
        eprintln!("Error: --indent expects a number");
        std::process::exit(1);
    });
    let grammar_text = read_file(grammar_path);
    let script_text = read_file(script_path);

    let rules = processor::compile_grammar(&grammar_text).unwrap_or_else(|error| {
        eprintln!("Error: {error}");
        std::process::exit(1);
    });
    let mut matcher = Matcher::new(&rules).with_trace(trace);
    let result = matcher.parse(&script_text);
    if trace {
        eprint!("{}", matcher.trace());
    }
    match result {
        Ok(graph) => match processor::serialize_graph(&graph, format, indent) {
            Ok(output) => println!("{output}"),
            Err(error) => {
                eprintln!("Error: {error}");
                std::process::exit(1);
            }
        },
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

fn handle_roundtrip_command(grammar_path: &str, script_path: &str) {
    let grammar_text = read_file(grammar_path);
    let script_text = read_file(script_path);

    let rules = processor::compile_grammar(&grammar_text).unwrap_or_else(|error| {
        eprintln!("Error: {error}");
        std::process::exit(1);
    });
    let graph = processor::parse_script(&script_text, &rules).unwrap_or_else(|error| {
        eprintln!("Error: {error}");
        std::process::exit(1);
    });
    let rendered = processor::render_script(&graph, 0);

    match first_divergence(script_text.trim_end(), &rendered) {
        None => println!("round trip ok ({} chars)", rendered.chars().count()),
        Some(index) => {
            println!("output is a normalized form, diverging at char {index}");
            if let Some(report) = diff_text(script_text.trim_end(), &rendered) {
                println!("{report}");
            }
            // the normalized form must still be a fixed point
            match processor::parse_script(&rendered, &rules) {
                Ok(regraph) => {
                    let again = processor::render_script(&regraph, 0);
                    if again == rendered {
                        println!("normalized form is stable");
                    } else {
                        eprintln!("Error: normalized form is not a fixed point");
                        std::process::exit(1);
                    }
                }
                Err(error) => {
                    eprintln!("Error: normalized form does not re-parse: {error}");
                    std::process::exit(1);
                }
            }
        }
    }
}
