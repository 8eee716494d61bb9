use clap::{ArgAction, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xtend_render::{Context, ExprEvaluator, Scope, Value};

#[derive(Parser)]
#[command(name = "xtend")]
#[command(about = "xtend: brace-directive text templates")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template
    Render {
        /// Template file
        path: PathBuf,

        /// JSON object file for the global scope
        #[arg(long, value_name = "FILE")]
        global: Option<PathBuf>,

        /// JSON object file for the local scope
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Local variable as name=value (value parsed as JSON, else taken as a string)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Write the output here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check a template for errors without rendering it
    Check {
        /// Template file
        path: PathBuf,
    },

    /// Print the token stream of a template
    Tokens {
        /// Template file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Render {
            path,
            global,
            context,
            vars,
            output,
        } => cmd_render(&path, global.as_deref(), context.as_deref(), &vars, output.as_deref()),
        Command::Check { path } => cmd_check(&path),
        Command::Tokens { path } => cmd_tokens(&path),
    }
}

/// Logs go to stderr. `XTEND_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("XTEND_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn read_source(path: &Path) -> String {
    if !path.exists() {
        fail(format!("file not found: {}", path.display()));
    }
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => fail(format!("reading {}: {e}", path.display())),
    }
}

fn parse_or_exit(path: &Path, source: &str) -> xtend_parser::Sequence {
    match xtend_parser::parse(source) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            eprint!("{}", xtend_parser::format_error(&e, source));
            std::process::exit(1);
        }
    }
}

/// Load a JSON object file into a scope.
fn load_scope(path: &Path) -> Scope {
    let text = read_source(path);
    match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
        Ok(vars) => vars.into_iter().collect(),
        Err(e) => fail(format!("{} is not a JSON object: {e}", path.display())),
    }
}

fn parse_var(raw: &str) -> (String, Value) {
    let Some((name, value)) = raw.split_once('=') else {
        fail(format!("expected NAME=VALUE, got `{raw}`"));
    };
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    (name.trim().to_string(), value)
}

fn cmd_render(
    path: &Path,
    global: Option<&Path>,
    context: Option<&Path>,
    vars: &[String],
    output: Option<&Path>,
) {
    let source = read_source(path);
    let root = parse_or_exit(path, &source);

    let globals = global.map(load_scope).unwrap_or_default();
    let mut locals = context.map(load_scope).unwrap_or_default();
    for raw in vars {
        let (name, value) = parse_var(raw);
        locals.insert(name, value);
    }

    tracing::debug!(
        path = %path.display(),
        globals = globals.len(),
        locals = locals.len(),
        "loaded context"
    );

    let ctx = Context::new(&globals, &locals);
    let rendered = match xtend_render::render(&root, &ctx, &ExprEvaluator) {
        Ok(rendered) => rendered,
        Err(e) => fail(format!("rendering {}: {e}", path.display())),
    };

    match output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, &rendered) {
                fail(format!("writing {}: {e}", out.display()));
            }
            eprintln!("Rendered: {}", out.display());
        }
        None => print!("{rendered}"),
    }
}

fn cmd_check(path: &Path) {
    let source = read_source(path);
    parse_or_exit(path, &source);
    eprintln!("OK: {}", path.display());
}

fn cmd_tokens(path: &Path) {
    let source = read_source(path);
    for token in xtend_lexer::tokenize(&source) {
        match token {
            Ok(token) => println!(
                "{:>4}:{:<3} {:<12} {:?}",
                token.span.line,
                token.span.column,
                token.kind.to_string(),
                token.text
            ),
            Err(e) => {
                let err = xtend_parser::ParseError::from(e);
                eprintln!("{}: {err}", path.display());
                eprint!("{}", xtend_parser::format_error(&err, &source));
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_values_parse_as_json() {
        assert_eq!(parse_var("n=3"), ("n".to_string(), Value::Int(3)));
        assert_eq!(
            parse_var("xs=[1, \"a\"]"),
            ("xs".to_string(), Value::List(vec![Value::Int(1), Value::from("a")]))
        );
    }

    #[test]
    fn test_var_values_fall_back_to_strings() {
        assert_eq!(parse_var("name=Ada"), ("name".to_string(), Value::from("Ada")));
        assert_eq!(parse_var("eq=a=b"), ("eq".to_string(), Value::from("a=b")));
        assert_eq!(parse_var("empty="), ("empty".to_string(), Value::from("")));
    }
}
