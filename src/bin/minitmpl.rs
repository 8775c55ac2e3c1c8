//! minitmpl CLI
//!
//! Commands: render, check
//! Rendered text goes to stdout (or `--output`), diagnostics to stderr.
//! Exit code 1 for unreadable input, 2 for template errors.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minitmpl::{Context, Error, Kwargs, Template, Value};

#[derive(Parser)]
#[command(name = "minitmpl")]
#[command(about = "Render minitmpl templates against a JSON context")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log compile and render steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a template and render it
    Render {
        /// Template file
        template: PathBuf,

        /// JSON file holding the context object
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Extra variable as key=value; the value is parsed as JSON, else taken as a string
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a template and report syntax errors only
    Check {
        /// Template file
        template: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            template,
            context,
            vars,
            output,
        } => {
            let compiled = match load_template(&template) {
                Ok(t) => t,
                Err(code) => return code,
            };

            let context = match build_context(context.as_deref(), &vars) {
                Ok(c) => c,
                Err(e) => {
                    error!("{e}");
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            debug!(variables = context.len(), "context ready");

            let rendered = match compiled.render(&context) {
                Ok(r) => r,
                Err(e) => return template_failure(&template, &e),
            };
            info!(bytes = rendered.len(), "rendered {}", template.display());

            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, rendered) {
                        error!("cannot write {}: {e}", path.display());
                        eprintln!("error: cannot write {}: {e}", path.display());
                        return ExitCode::FAILURE;
                    }
                }
                None => print!("{rendered}"),
            }
            ExitCode::SUCCESS
        }

        Commands::Check { template } => match load_template(&template) {
            Ok(_) => {
                println!("{}: ok", template.display());
                ExitCode::SUCCESS
            }
            Err(code) => code,
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialised");
    }
}

fn load_template(path: &Path) -> Result<Template, ExitCode> {
    let source = fs::read_to_string(path).map_err(|e| {
        error!("cannot read {}: {e}", path.display());
        eprintln!("error: cannot read {}: {e}", path.display());
        ExitCode::FAILURE
    })?;
    debug!(bytes = source.len(), "compiling {}", path.display());

    Template::new(source).map_err(|e| template_failure(path, &e))
}

fn template_failure(path: &Path, e: &Error) -> ExitCode {
    error!(kind = ?e.kind(), "{}: {e}", path.display());
    eprintln!("error: {}: {e}", path.display());
    ExitCode::from(2)
}

fn build_context(file: Option<&Path>, vars: &[String]) -> Result<Context, String> {
    let mut context = match file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
            Context::from_json(json).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => Context::new(),
    };

    for var in vars {
        let (key, raw) = var
            .split_once('=')
            .ok_or_else(|| format!("--var expects KEY=VALUE, got '{var}'"))?;
        let value = serde_json::from_str::<serde_json::Value>(raw)
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(raw));
        context.insert(key, value);
    }

    for (name, function) in builtin_functions() {
        if context.get(name).is_none() {
            context.insert(name, function);
        }
    }
    Ok(context)
}

/// Callables made available to templates rendered from the command line.
fn builtin_functions() -> Vec<(&'static str, Value)> {
    vec![
        ("len", Value::function(len)),
        ("upper", Value::function(|args, _| map_str(args, "upper", str::to_uppercase))),
        ("lower", Value::function(|args, _| map_str(args, "lower", str::to_lowercase))),
        ("range", Value::function(range)),
    ]
}

fn len(args: &[Value], _: &Kwargs) -> minitmpl::Result<Value> {
    let n = match args {
        [Value::String(s)] => s.chars().count(),
        [Value::Array(a)] => a.len(),
        [Value::Map(m)] => m.len(),
        [other] => {
            return Err(Error::template(format!(
                "len() of a {} value",
                other.type_name()
            )))
        }
        _ => return Err(Error::template("len() takes exactly one argument")),
    };
    Ok(Value::Int(n as i64))
}

fn map_str(args: &[Value], name: &str, f: fn(&str) -> String) -> minitmpl::Result<Value> {
    match args {
        [Value::String(s)] => Ok(Value::String(f(s))),
        _ => Err(Error::template(format!("{name}() takes one string"))),
    }
}

/// Longest list `range` will build.
const MAX_RANGE_LEN: i64 = 10_000;

fn range(args: &[Value], _: &Kwargs) -> minitmpl::Result<Value> {
    let bounds: Vec<i64> = args
        .iter()
        .map(|a| {
            a.as_i64()
                .ok_or_else(|| Error::template("range() takes integers"))
        })
        .collect::<minitmpl::Result<_>>()?;
    let (start, end) = match bounds.as_slice() {
        [end] => (0, *end),
        [start, end] => (*start, *end),
        _ => return Err(Error::template("range() takes one or two integers")),
    };
    if end.saturating_sub(start) > MAX_RANGE_LEN {
        return Err(Error::template(format!(
            "range() is limited to {MAX_RANGE_LEN} values"
        )));
    }
    Ok(Value::Array((start..end).map(Value::Int).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn call(name: &str, args: &[Value]) -> minitmpl::Result<Value> {
        let context = build_context(None, &[]).unwrap();
        match context.get(name) {
            Some(Value::Function(f)) => f.call(args, &Kwargs::new()),
            other => panic!("{name} is not a builtin: {other:?}"),
        }
    }

    fn vars(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn var_values_parse_as_json_or_fall_back_to_strings() {
        let context =
            build_context(None, &vars(&["n=3", "xs=[1, 2]", "name=jack", "eq=a=b"])).unwrap();
        assert_eq!(context.get("n"), Some(&Value::Int(3)));
        assert_eq!(context.get("xs"), Some(&Value::from(vec![1, 2])));
        assert_eq!(context.get("name"), Some(&Value::from("jack")));
        assert_eq!(context.get("eq"), Some(&Value::from("a=b")));
    }

    #[test]
    fn var_without_equals_is_rejected() {
        let err = build_context(None, &vars(&["oops"])).unwrap_err();
        assert_eq!(err, "--var expects KEY=VALUE, got 'oops'");
    }

    #[test]
    fn builtins_never_replace_caller_keys() {
        let context = build_context(None, &vars(&["len=5"])).unwrap();
        assert_eq!(context.get("len"), Some(&Value::Int(5)));
        assert!(matches!(context.get("upper"), Some(Value::Function(_))));
    }

    #[test]
    fn context_file_is_loaded_and_vars_override_it() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"title": "Home", "n": 1}}"#).unwrap();

        let context = build_context(Some(file.path()), &vars(&["n=2"])).unwrap();
        assert_eq!(context.get("title"), Some(&Value::from("Home")));
        assert_eq!(context.get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn context_file_must_hold_an_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(build_context(Some(file.path()), &[]).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = build_context(Some(file.path()), &[]).unwrap_err();
        assert!(err.starts_with("invalid JSON"), "{err}");
    }

    #[test]
    fn len_counts_strings_arrays_and_maps() {
        assert_eq!(call("len", &[Value::from("héllo")]).unwrap(), Value::Int(5));
        assert_eq!(call("len", &[Value::from(vec![1, 2, 3])]).unwrap(), Value::Int(3));
        assert_eq!(
            call("len", &[Value::Int(1)]).unwrap_err(),
            Error::template("len() of a int value")
        );
        assert_eq!(
            call("len", &[]).unwrap_err(),
            Error::template("len() takes exactly one argument")
        );
    }

    #[test]
    fn upper_and_lower_take_one_string() {
        assert_eq!(call("upper", &[Value::from("abc")]).unwrap(), Value::from("ABC"));
        assert_eq!(call("lower", &[Value::from("ABC")]).unwrap(), Value::from("abc"));
        assert_eq!(
            call("upper", &[Value::Int(1)]).unwrap_err(),
            Error::template("upper() takes one string")
        );
    }

    #[test]
    fn range_builds_bounded_integer_lists() {
        assert_eq!(call("range", &[Value::Int(3)]).unwrap(), Value::from(vec![0, 1, 2]));
        assert_eq!(
            call("range", &[Value::Int(2), Value::Int(4)]).unwrap(),
            Value::from(vec![2, 3])
        );
        assert_eq!(call("range", &[Value::Int(-2)]).unwrap(), Value::Array(vec![]));
        assert_eq!(
            call("range", &[Value::from("x")]).unwrap_err(),
            Error::template("range() takes integers")
        );
        assert_eq!(
            call("range", &[]).unwrap_err(),
            Error::template("range() takes one or two integers")
        );
        assert_eq!(
            call("range", &[Value::Int(10_000_000_000)]).unwrap_err(),
            Error::template("range() is limited to 10000 values")
        );
    }

    #[test]
    fn builtins_render_through_templates() {
        let context = build_context(None, &vars(&[r#"name="jack""#])).unwrap();
        let template = Template::new("{% call upper name %} {% call len name %}").unwrap();
        assert_eq!(template.render(&context).unwrap(), "JACK 4");
    }
}
