use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use clap::Parser;
use lambda::{
    session::{LineOutcome, DEFAULT_STEP_LIMIT},
    Config, EvalError, Outcome, ParseError, Session,
};
use tracing_subscriber::EnvFilter;
use util::repl::{self, Control};

#[derive(Parser)]
#[command(version, about = "Untyped lambda calculus REPL")]
struct Args {
    /// A `.lam` file to load before prompting
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Reduction steps allowed per evaluation
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STEP_LIMIT)]
    steps: usize,
}

fn build_report(e: &ParseError) -> Report {
    let label = match &e.found {
        Some(found) => format!("Unexpected {}", found.fg(Color::Red)),
        None => e.message.clone(),
    };
    Report::build(ReportKind::Error, (), e.span.start)
        .with_message(&e.message)
        .with_label(
            Label::new(e.span.clone())
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
}

fn print_result(source: &str, result: &Result<Outcome, EvalError>) -> Result<()> {
    match result {
        Ok(outcome) => println!("{outcome}"),
        Err(EvalError::Parse(e)) => build_report(e).eprint(Source::from(source))?,
        Err(e) => eprintln!("Error: {e}"),
    }
    Ok(())
}

/// `defs` and `defs.lam` name the same file; `defs.v2` means `defs.v2.lam`.
fn lam_path(path: &Path) -> PathBuf {
    if path.extension() == Some(OsStr::new("lam")) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".lam");
    PathBuf::from(name)
}

fn load_file(session: &mut Session, path: &Path) -> Result<()> {
    let path = lam_path(path);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::info!(path = %path.display(), "loading");
    for LineOutcome {
        line,
        source,
        result,
    } in session.load_lines(contents.lines())
    {
        print!("[{}:{line}] ", path.display());
        if result.is_err() {
            println!("{source}");
        }
        print_result(&source, &result)?;
    }
    Ok(())
}

struct Repl {
    session: Session,
}
impl Repl {
    fn trace(&self, input: &str) -> Result<()> {
        match self.session.trace(input) {
            Ok(trace) => {
                for (i, step) in trace.steps.iter().enumerate() {
                    println!("{:>4} {}: {}", i + 1, step.kind, step.term);
                }
                if trace.exhausted {
                    println!("... stopped after {} steps", trace.steps.len());
                }
            }
            Err(e) => build_report(&e).eprint(Source::from(input))?,
        }
        Ok(())
    }

    fn steps(&mut self, input: &str) {
        if input.is_empty() {
            println!("{}", self.session.step_limit());
            return;
        }
        match input.parse() {
            Ok(limit) => self.session.set_step_limit(limit),
            Err(e) => eprintln!("Invalid step limit {input}: {e}"),
        }
    }

    fn show_env(&self) {
        for (name, term) in self.session.environment().iter() {
            println!("{name} := {term}");
        }
    }

    fn show_help() {
        println!(
            "{}",
            r#"
expr                -- evaluate expr to normal form
name: expr          -- bind name to expr
:load       path    -- run every line of a .lam file
:trace      expr    -- show each reduction step
:steps      [n]     -- show or set the step limit
:env                -- list definitions
:reset              -- forget all definitions
:help               -- show this message
exit | quit         -- leave
        "#
            .trim()
        );
    }

    fn handle_repl_input(&mut self, input: &str) -> Result<Control> {
        let input = input.trim();
        if matches!(input, "exit" | "quit") {
            println!("Bye!");
            return Ok(Control::Exit);
        }
        let (cmd, input) = if let Some(stripped) = input.strip_prefix(':') {
            stripped
                .trim_start()
                .split_once(' ')
                .map(|(cmd, input)| (cmd, input.trim()))
                .unwrap_or((stripped, ""))
        } else {
            ("", input)
        };
        match cmd {
            "" => {
                let result = self.session.execute(input);
                print_result(input, &result)?;
            }
            "l" | "load" => {
                if let Err(e) = load_file(&mut self.session, Path::new(input)) {
                    eprintln!("Error: {e:#}");
                }
            }
            "t" | "trace" => self.trace(input)?,
            "s" | "steps" => self.steps(input),
            "e" | "env" => self.show_env(),
            "reset" => self.session.reset(),
            "h" | "help" => Self::show_help(),
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
            }
        }
        Ok(Control::Continue)
    }
}
impl repl::Repl for Repl {
    type Error = anyhow::Error;
    const PROMPT: &'static str = "λ> ";
    const HISTORY: Option<&'static str> = Some("/tmp/lambda.history");
    fn evaluate(&mut self, input: String) -> Result<Control, Self::Error> {
        if input.trim().is_empty() {
            return Ok(Control::Continue);
        }
        self.handle_repl_input(&input)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut session = Session::new(Config {
        step_limit: args.steps,
    });
    if let Some(path) = args.file {
        if let Err(e) = load_file(&mut session, &path) {
            eprintln!("Error: {e:#}");
        }
    }

    println!("Untyped lambda calculus. :h to show help");
    println!();
    repl::start_repl(Repl { session })?;
    Ok(())
}
