use std::collections::HashSet;

use rpds::Stack;
use thiserror::Error;

use crate::{env::Environment, prelude::*, term::Term};

/// Replaces the free occurrences of `var` in `base` with `replacement`.
///
/// A binder that would capture a free variable of `replacement` is renamed
/// before substitution descends below it.
pub fn substitute(base: &Term, var: &str, replacement: &Term) -> Term {
    fn rec(base: &Term, var: &str, replacement: &Term, free: &HashSet<Identifier>) -> Term {
        match base {
            Term::Var(x) if &**x == var => replacement.clone(),
            Term::Var(_) => base.clone(),
            Term::App(lhs, rhs) => Term::App(
                rec(lhs, var, replacement, free).into(),
                rec(rhs, var, replacement, free).into(),
            ),
            // `var` is shadowed, or never occurs below
            Term::Abs(param, body) if &**param == var || !body.is_free(var) => base.clone(),
            Term::Abs(param, body) if free.contains(param) => {
                let fresh = fresh_name(param, |name| free.contains(name) || body.mentions(name));
                let renamed = substitute(body, param, &Term::Var(fresh.clone()));
                Term::Abs(fresh, rec(&renamed, var, replacement, free).into())
            }
            Term::Abs(param, body) => {
                Term::Abs(param.clone(), rec(body, var, replacement, free).into())
            }
        }
    }
    rec(base, var, replacement, &replacement.free_vars())
}

/// `base` followed by as many primes as it takes to get a name `taken` rejects.
fn fresh_name(base: &str, taken: impl Fn(&str) -> bool) -> Identifier {
    let mut candidate = format!("{base}'");
    while taken(&candidate) {
        candidate.push('\'');
    }
    candidate.into()
}

#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
pub enum StepKind {
    #[display(fmt = "beta")]
    Beta,
    /// A free name was replaced by its definition.
    #[display(fmt = "unfold {_0}")]
    Unfold(Identifier),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Step {
    pub kind: StepKind,
    pub term: Term,
}

enum Contraction {
    Reduced(Term),
    Unfold(Identifier),
}

/// Finds the leftmost-outermost redex. An unfoldable name is reported back to
/// the root instead of being replaced in place, so that its definition is
/// substituted against the whole term.
fn contract(term: &Term, env: &Environment, bound: &Stack<Identifier>) -> Option<Contraction> {
    use Contraction::*;
    match term {
        Term::Var(x) => {
            if !bound.iter().any(|b| b == x) && env.contains(x) {
                Some(Unfold(x.clone()))
            } else {
                None
            }
        }
        Term::Abs(param, body) => match contract(body, env, &bound.push(param.clone()))? {
            Reduced(body) => Some(Reduced(Term::Abs(param.clone(), body.into()))),
            unfold => Some(unfold),
        },
        Term::App(lhs, rhs) => {
            if let Term::Abs(param, body) = lhs.as_ref() {
                return Some(Reduced(substitute(body, param, rhs)));
            }
            if let Some(contraction) = contract(lhs, env, bound) {
                return Some(match contraction {
                    Reduced(lhs) => Reduced(Term::App(lhs.into(), rhs.clone())),
                    unfold => unfold,
                });
            }
            Some(match contract(rhs, env, bound)? {
                Reduced(rhs) => Reduced(Term::App(lhs.clone(), rhs.into())),
                unfold => unfold,
            })
        }
    }
}

/// Performs one normal-order step, or returns `None` at normal form.
pub fn step(term: &Term, env: &Environment) -> Option<Step> {
    Some(match contract(term, env, &Stack::new())? {
        Contraction::Reduced(term) => Step {
            kind: StepKind::Beta,
            term,
        },
        Contraction::Unfold(name) => {
            let definition = env.lookup(&name)?;
            Step {
                term: substitute(term, &name, &definition),
                kind: StepKind::Unfold(name),
            }
        }
    })
}

/// The successive terms of a normal-order reduction. Ends at normal form,
/// so it may never end.
pub struct Reduction<'e> {
    term: Term,
    env: &'e Environment,
}
impl<'e> Reduction<'e> {
    pub fn new(term: Term, env: &'e Environment) -> Self {
        Self { term, env }
    }
    pub fn term(&self) -> &Term {
        &self.term
    }
}
impl<'e> Iterator for Reduction<'e> {
    type Item = Step;
    fn next(&mut self) -> Option<Step> {
        let next = step(&self.term, self.env)?;
        self.term = next.term.clone();
        Some(next)
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Normal {
    pub term: Term,
    pub steps: usize,
}

#[derive(Error, PartialEq, Eq, Clone, Debug)]
#[error("no normal form within {limit} steps")]
pub struct StepLimitExceeded {
    /// The term reached after `limit` steps.
    pub partial: Term,
    pub limit: usize,
}

/// Reduces `term` to normal form, taking at most `limit` steps.
pub fn normalize(term: Term, env: &Environment, limit: usize) -> Result<Normal, StepLimitExceeded> {
    let mut reduction = Reduction::new(term, env);
    let mut steps = 0;
    loop {
        if steps == limit {
            return match step(reduction.term(), env) {
                None => Ok(Normal {
                    term: reduction.term,
                    steps,
                }),
                Some(_) => Err(StepLimitExceeded {
                    partial: reduction.term,
                    limit,
                }),
            };
        }
        match reduction.next() {
            Some(Step { kind, term }) => {
                steps += 1;
                tracing::trace!(step = steps, %kind, %term);
            }
            None => {
                return Ok(Normal {
                    term: reduction.term,
                    steps,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse_expression;

    fn parse(s: &str) -> Term {
        parse_expression(s).unwrap()
    }

    fn eval(s: &str) -> Normal {
        normalize(parse(s), &Environment::default(), 1000).unwrap()
    }

    #[test]
    fn test_substitute() {
        assert_eq!(
            substitute(&parse("(x (λx.x))"), "x", &parse("y")),
            parse("(y (λx.x))")
        );
        assert_eq!(
            substitute(&parse("(λz.(x z))"), "x", &parse("(λw.w)")),
            parse("(λz.((λw.w) z))")
        );
    }

    #[test]
    fn test_substitute_renames_capturing_binder() {
        let result = substitute(&parse("(λy.x)"), "x", &parse("y"));
        assert_eq!(result, parse("(λy'.y)"));
    }

    #[test]
    fn test_fresh_name_avoids_body_and_replacement() {
        // y' is used in the body and y'' is free in the replacement
        let result = substitute(&parse("(λy.(x y'))"), "x", &parse("(y y'')"));
        assert_eq!(result, parse("(λy'''.((y y'') y'))"));
    }

    #[test]
    fn test_no_rename_without_occurrence() {
        let base = parse("(λy.y)");
        assert_eq!(substitute(&base, "x", &parse("y")), base);
    }

    #[test]
    fn test_capture_avoidance() {
        let Normal { term, steps } = eval("((λx.(λy.x)) y)");
        assert_eq!(steps, 1);
        assert_eq!(term, parse("(λy'.y)"));
        assert!(term.alpha_eq(&parse("(λz.y)")));
        assert!(!term.alpha_eq(&parse("(λy.y)")));
    }

    #[test]
    fn test_identity_takes_one_step() {
        let Normal { term, steps } = eval("((λx.x) (λy.y))");
        assert_eq!(steps, 1);
        assert_eq!(term, parse("(λy.y)"));
    }

    #[test]
    fn test_normal_order() {
        // the argument diverges but is discarded
        let Normal { term, .. } = eval("((λx.(λy.y)) ((λx.(x x)) (λx.(x x))))");
        assert_eq!(term, parse("(λy.y)"));
        // reduces under binders and inside stuck applications
        let Normal { term, steps } = eval("(λz.(z ((λx.x) z)))");
        assert_eq!(steps, 1);
        assert_eq!(term, parse("(λz.(z z))"));
    }

    #[test]
    fn test_omega_hits_limit() {
        let omega = parse("((λx.(x x)) (λx.(x x)))");
        let err = normalize(omega.clone(), &Environment::default(), 1000).unwrap_err();
        assert_eq!(err.limit, 1000);
        assert_eq!(err.partial, omega);
    }

    #[test]
    fn test_limit_is_exact() {
        let term = parse("((λx.x) ((λx.x) z))");
        assert_eq!(
            normalize(term.clone(), &Environment::default(), 2).unwrap(),
            Normal {
                term: parse("z"),
                steps: 2
            }
        );
        let err = normalize(term, &Environment::default(), 1).unwrap_err();
        assert_eq!(err.partial, parse("((λx.x) z)"));
    }

    #[test]
    fn test_normal_form_is_fixed_point() {
        for s in ["x", "(λx.x)", "(f (λx.(x y)))", "(λy'.y)"] {
            let term = parse(s);
            assert_eq!(
                normalize(term.clone(), &Environment::default(), 0).unwrap(),
                Normal { term, steps: 0 }
            );
        }
    }

    #[test]
    fn test_unfold() {
        let mut env = Environment::default();
        env.define("I".into(), parse("(λx.x)"));
        let steps = Reduction::new(parse("(I a)"), &env).collect::<Vec<_>>();
        assert_eq!(
            steps,
            vec![
                Step {
                    kind: StepKind::Unfold("I".into()),
                    term: parse("((λx.x) a)")
                },
                Step {
                    kind: StepKind::Beta,
                    term: parse("a")
                },
            ]
        );
    }

    #[test]
    fn test_bound_name_is_not_unfolded() {
        let mut env = Environment::default();
        env.define("x".into(), parse("(λz.z)"));
        let Normal { term, steps } = normalize(parse("(λx.(x a))"), &env, 10).unwrap();
        assert_eq!(steps, 0);
        assert_eq!(term, parse("(λx.(x a))"));
    }

    #[test]
    fn test_unfold_is_hygienic() {
        // `F` refers to the global `y`, not the binder it is used under
        let mut env = Environment::default();
        env.define("F".into(), parse("(f y)"));
        env.define("f".into(), parse("(λa.a)"));
        let Normal { term, .. } = normalize(parse("(λy.F)"), &env, 10).unwrap();
        assert_eq!(term, parse("(λy'.y)"));
    }

    #[test]
    fn test_self_reference_hits_limit() {
        let mut env = Environment::default();
        env.define("loop".into(), parse("loop"));
        let err = normalize(parse("loop"), &env, 50).unwrap_err();
        assert_eq!(err.partial, parse("loop"));
    }
}
