use tracing::debug;

use crate::{
    env::Environment,
    error::{EvalError, ParseError},
    parser::{self, Statement},
    prelude::*,
    reducer::{self, Normal, Reduction, Step},
    term::Term,
};

pub const DEFAULT_STEP_LIMIT: usize = 10_000;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Config {
    /// Reduction steps allowed per evaluation.
    pub step_limit: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// The result of running one statement.
#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
pub enum Outcome {
    #[display(fmt = "{name} := {term}")]
    Defined { name: Identifier, term: Term },
    #[display(fmt = "=> {term}")]
    Evaluated { term: Term, steps: usize },
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct LineOutcome {
    /// 1-based
    pub line: usize,
    pub source: String,
    pub result: Result<Outcome, EvalError>,
}

/// Steps taken by [`Session::trace`].
#[derive(Clone, Debug)]
pub struct Trace {
    pub steps: Vec<Step>,
    /// Set when the step limit cut the reduction short.
    pub exhausted: bool,
}

#[derive(Default, Clone, Debug)]
pub struct Session {
    env: Environment,
    config: Config,
}
impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            env: Environment::default(),
            config,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn step_limit(&self) -> usize {
        self.config.step_limit
    }

    pub fn set_step_limit(&mut self, step_limit: usize) {
        self.config.step_limit = step_limit;
    }

    pub fn reset(&mut self) {
        debug!(definitions = self.env.len(), "reset environment");
        self.env.reset();
    }

    /// Parses a `name: expression` line and binds it unevaluated.
    pub fn define(&mut self, line: &str) -> Result<(), ParseError> {
        let (name, term) = parser::parse_definition(line)?;
        self.bind(name, term);
        Ok(())
    }

    /// Parses an expression, reduces it to normal form and renders the result.
    pub fn evaluate(&self, line: &str) -> Result<String, EvalError> {
        let term = parser::parse_expression(line)?;
        let Normal { term, .. } = self.normalize(term)?;
        Ok(Self::render(&term))
    }

    /// Runs a line that is either a definition or an expression.
    pub fn execute(&mut self, line: &str) -> Result<Outcome, EvalError> {
        match parser::parse_statement(line)? {
            Statement::Definition(name, term) => {
                self.bind(name.clone(), term.clone());
                Ok(Outcome::Defined { name, term })
            }
            Statement::Expression(term) => {
                let Normal { term, steps } = self.normalize(term)?;
                Ok(Outcome::Evaluated { term, steps })
            }
        }
    }

    /// The steps reducing an expression, up to the step limit. Running out of
    /// steps is not an error here; the trace simply stops.
    pub fn trace(&self, line: &str) -> Result<Trace, ParseError> {
        let term = parser::parse_expression(line)?;
        let mut reduction = Reduction::new(term, &self.env);
        let steps = reduction
            .by_ref()
            .take(self.config.step_limit)
            .collect::<Vec<_>>();
        let exhausted = reducer::step(reduction.term(), &self.env).is_some();
        Ok(Trace { steps, exhausted })
    }

    /// Runs each line in order. Blank lines and `#` comments are skipped, and
    /// a failing line does not stop the ones after it.
    pub fn load_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Vec<LineOutcome> {
        lines
            .into_iter()
            .enumerate()
            .filter_map(|(i, source)| {
                let source = source.trim();
                if source.is_empty() || source.starts_with('#') {
                    return None;
                }
                Some(LineOutcome {
                    line: i + 1,
                    source: source.to_string(),
                    result: self.execute(source),
                })
            })
            .collect()
    }

    pub fn render(term: &Term) -> String {
        term.to_string()
    }

    fn bind(&mut self, name: Identifier, term: Term) {
        debug!(%name, %term, "define");
        self.env.define(name, term);
    }

    fn normalize(&self, term: Term) -> Result<Normal, EvalError> {
        debug!(%term, limit = self.config.step_limit, "evaluate");
        let normal = reducer::normalize(term, &self.env, self.config.step_limit).map_err(|e| {
            EvalError::StepLimitExceeded {
                partial: Self::render(&e.partial),
                limit: e.limit,
            }
        })?;
        debug!(steps = normal.steps, "reached normal form");
        Ok(normal)
    }
}
