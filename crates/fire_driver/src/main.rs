mod diagnostics;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use fire_ast::{Program, StmtKind};
use fire_eval::{EvalConfig, Evaluator, MAX_CALL_DEPTH};
use fire_lexer::{Lexer, Token};
use fire_parser::Parser;
use fire_runtime::BuiltinTable;
use fire_sema::Bound;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, emit, emit_all};

#[derive(ClapParser)]
#[command(name = "fire", version, about = "Fire language checker and interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter, e.g. `debug` or `fire_sema=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check and run a program
    Run {
        file: PathBuf,
        /// Deepest call nesting before a stack overflow is reported
        #[arg(long, default_value_t = MAX_CALL_DEPTH)]
        max_call_depth: usize,
    },
    /// Resolve names and check types without running
    Check { file: PathBuf },
    /// Show the syntax tree
    Parse {
        file: PathBuf,
        /// Print the tree after name resolution
        #[arg(long)]
        bound: bool,
    },
    /// Show lexer output
    Lex { file: PathBuf },
    /// Show the scope tree with variable slots
    Scopes { file: PathBuf },
}

impl Command {
    fn file(&self) -> &PathBuf {
        match self {
            Command::Run { file, .. }
            | Command::Check { file }
            | Command::Parse { file, .. }
            | Command::Lex { file }
            | Command::Scopes { file } => file,
        }
    }
}

fn init_tracing(log: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let file = cli.command.file();
    let path = file.display().to_string();
    let source = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.command {
        Command::Run { max_call_depth, .. } => run_program(&source, &path, EvalConfig { max_call_depth: *max_call_depth }),
        Command::Check { .. } => run_check(&source, &path),
        Command::Parse { bound, .. } => run_parser(&source, &path, *bound),
        Command::Lex { .. } => run_lexer(&source, &path),
        Command::Scopes { .. } => run_scopes(&source, &path),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

/// Render diagnostics; a failure to write them is reported plainly.
fn report(path: &str, source: &str, diagnostics: impl IntoIterator<Item = Diagnostic>) {
    if let Err(e) = emit_all(path, source, diagnostics) {
        eprintln!("failed to write diagnostics: {}", e);
    }
}

fn parse(source: &str, path: &str) -> Result<Program, ()> {
    Parser::parse(source).map_err(|e| report(path, source, [Diagnostic::from(&e)]))
}

/// Parse and bind. Every binding error is reported before giving up.
fn run_frontend(source: &str, path: &str, builtins: &BuiltinTable) -> Result<(Program, Bound), ()> {
    let mut program = parse(source, path)?;
    match fire_sema::bind(&mut program, builtins) {
        Ok(bound) => {
            debug!(
                scopes = bound.scopes.len(),
                functions = bound.symbols.functions.len(),
                classes = bound.symbols.classes.len(),
                "bound program"
            );
            Ok((program, bound))
        }
        Err(errors) => {
            info!(count = errors.len(), "binding failed");
            let count = errors.len();
            report(path, source, errors.iter().map(Diagnostic::from));
            eprintln!("{} error{} found", count, if count == 1 { "" } else { "s" });
            Err(())
        }
    }
}

fn run_program(source: &str, path: &str, config: EvalConfig) -> Result<(), ()> {
    let builtins = BuiltinTable::new();
    let (program, bound) = run_frontend(source, path, &builtins)?;
    let mut evaluator = Evaluator::new(&program, &bound, &builtins).with_config(config);
    evaluator.run().map_err(|err| {
        if let Err(e) = emit(path, source, &Diagnostic::from(&err)) {
            eprintln!("{}: {}", err, e);
        }
    })
}

fn run_check(source: &str, path: &str) -> Result<(), ()> {
    let builtins = BuiltinTable::new();
    let (_, bound) = run_frontend(source, path, &builtins)?;

    println!("=== Check Output for {} ===\n", path);
    for function in &bound.symbols.functions {
        let owner = function
            .class
            .and_then(|c| bound.symbols.class(c))
            .map_or_else(String::new, |c| format!("{}.", c.name));
        println!("fn {}{}", owner, function.signature());
    }
    for class in &bound.symbols.classes {
        let fields: Vec<String> = class.fields.iter().map(|f| format!("{}: {}", f.name, f.ty)).collect();
        println!("class {} {{ {} }}", class.name, fields.join(", "));
    }
    for enum_symbol in &bound.symbols.enums {
        println!("enum {} {{ {} }}", enum_symbol.name, enum_symbol.enumerators.join(", "));
    }
    println!("\nNo errors found.");
    Ok(())
}

fn run_parser(source: &str, path: &str, bound: bool) -> Result<(), ()> {
    let builtins = BuiltinTable::new();
    let program = if bound { run_frontend(source, path, &builtins)?.0 } else { parse(source, path)? };

    println!("=== Parser Output for {} ===\n", path);
    println!("{}", program.pretty_print());

    println!("=== Summary ===");
    let count = |pred: fn(&StmtKind) -> bool| program.body.stmts.iter().filter(|s| pred(&s.kind)).count();
    println!("Functions:  {}", count(|k| matches!(k, StmtKind::Fn(_))));
    println!("Classes:    {}", count(|k| matches!(k, StmtKind::Class(_))));
    println!("Enums:      {}", count(|k| matches!(k, StmtKind::Enum(_))));
    println!("Statements: {}", program.body.stmts.len());
    Ok(())
}

fn run_lexer(source: &str, path: &str) -> Result<(), ()> {
    let tokens = Lexer::tokenize(source).map_err(|e| report(path, source, [Diagnostic::from(&e)]))?;

    println!("=== Lexer Output for {} ===\n", path);
    println!("{:<12} {:<12} {}", "SPAN", "KIND", "VALUE");
    println!("{}", "-".repeat(48));
    for spanned in &tokens {
        let span = format!("{}..{}", spanned.span.start, spanned.span.end);
        println!("{:<12} {:<12} {}", span, token_kind(&spanned.token), spanned.token);
    }
    println!("\nTotal tokens: {}", tokens.len());
    Ok(())
}

fn token_kind(token: &Token) -> &'static str {
    match token {
        Token::IntLiteral(_)
        | Token::SizeLiteral(_)
        | Token::FloatLiteral(_)
        | Token::StringLiteral(_)
        | Token::CharLiteral(_)
        | Token::True
        | Token::False
        | Token::NoneLit => "literal",
        Token::Ident(_) => "identifier",
        Token::Eof => "eof",
        other if other.to_string().chars().all(|c| c.is_ascii_alphabetic()) => "keyword",
        _ => "punct",
    }
}

fn run_scopes(source: &str, path: &str) -> Result<(), ()> {
    let builtins = BuiltinTable::new();
    let (_, bound) = run_frontend(source, path, &builtins)?;
    println!("=== Scopes for {} ===\n", path);
    print!("{}", bound.scopes.dump(&bound.symbols));
    Ok(())
}
