use std::{collections::HashSet, rc::Rc};

use crate::prelude::*;

pub type TermRef = Rc<Term>;

/// A lambda term. `Display` renders the canonical surface form, which the
/// parser reads back to the same term.
#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
pub enum Term {
    /// `x`
    #[display(fmt = "{_0}")]
    Var(Identifier),
    /// `(λx.t)`
    #[display(fmt = "(λ{_0}.{_1})")]
    Abs(Identifier, TermRef),
    /// `(t t)`
    #[display(fmt = "({_0} {_1})")]
    App(TermRef, TermRef),
}

impl Term {
    pub fn var(name: impl Into<Identifier>) -> Self {
        Term::Var(name.into())
    }
    pub fn abs(param: impl Into<Identifier>, body: impl Into<TermRef>) -> Self {
        Term::Abs(param.into(), body.into())
    }
    pub fn app(lhs: impl Into<TermRef>, rhs: impl Into<TermRef>) -> Self {
        Term::App(lhs.into(), rhs.into())
    }

    /// Names that occur in the term without an enclosing binder.
    pub fn free_vars(&self) -> HashSet<Identifier> {
        fn rec<'a>(term: &'a Term, bound: &mut Vec<&'a str>, free: &mut HashSet<Identifier>) {
            match term {
                Term::Var(x) => {
                    if !bound.contains(&&**x) {
                        free.insert(x.clone());
                    }
                }
                Term::Abs(param, body) => {
                    bound.push(param);
                    rec(body, bound, free);
                    bound.pop();
                }
                Term::App(lhs, rhs) => {
                    rec(lhs, bound, free);
                    rec(rhs, bound, free);
                }
            }
        }
        let mut free = HashSet::new();
        rec(self, &mut vec![], &mut free);
        free
    }

    pub fn is_free(&self, name: &str) -> bool {
        match self {
            Term::Var(x) => &**x == name,
            Term::Abs(param, body) => &**param != name && body.is_free(name),
            Term::App(lhs, rhs) => lhs.is_free(name) || rhs.is_free(name),
        }
    }

    /// Whether `name` appears anywhere in the term, bound, free or as a binder.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Term::Var(x) => &**x == name,
            Term::Abs(param, body) => &**param == name || body.mentions(name),
            Term::App(lhs, rhs) => lhs.mentions(name) || rhs.mentions(name),
        }
    }

    /// Equality up to renaming of bound variables.
    pub fn alpha_eq(&self, other: &Term) -> bool {
        fn rec<'a>(
            lhs: &'a Term,
            rhs: &'a Term,
            lhs_scope: &mut Vec<&'a str>,
            rhs_scope: &mut Vec<&'a str>,
        ) -> bool {
            match (lhs, rhs) {
                (Term::Var(x), Term::Var(y)) => {
                    let i = lhs_scope.iter().rposition(|n| *n == &**x);
                    let j = rhs_scope.iter().rposition(|n| *n == &**y);
                    match (i, j) {
                        (Some(i), Some(j)) => i == j,
                        (None, None) => x == y,
                        _ => false,
                    }
                }
                (Term::Abs(x, lhs), Term::Abs(y, rhs)) => {
                    lhs_scope.push(x);
                    rhs_scope.push(y);
                    let eq = rec(lhs, rhs, lhs_scope, rhs_scope);
                    lhs_scope.pop();
                    rhs_scope.pop();
                    eq
                }
                (Term::App(f, a), Term::App(g, b)) => {
                    rec(f, g, lhs_scope, rhs_scope) && rec(a, b, lhs_scope, rhs_scope)
                }
                _ => false,
            }
        }
        rec(self, other, &mut vec![], &mut vec![])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sorted(set: HashSet<Identifier>) -> Vec<String> {
        let mut names = set.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn test_display() {
        let k = Term::abs("x", Term::abs("y", Term::var("x")));
        assert_eq!(k.to_string(), "(λx.(λy.x))");
        let app = Term::app(Term::app(Term::var("f"), Term::var("a")), Term::var("b"));
        assert_eq!(app.to_string(), "((f a) b)");
    }

    #[test]
    fn test_free_vars() {
        // (λx.(x y)) (λy.z)
        let term = Term::app(
            Term::abs("x", Term::app(Term::var("x"), Term::var("y"))),
            Term::abs("y", Term::var("z")),
        );
        assert_eq!(sorted(term.free_vars()), vec!["y", "z"]);
        assert!(term.is_free("y"));
        assert!(!term.is_free("x"));
        assert!(term.mentions("x"));
        assert!(!term.mentions("w"));
    }

    #[test]
    fn test_shadowed_binder_is_not_free() {
        let term = Term::abs("x", Term::abs("x", Term::var("x")));
        assert!(term.free_vars().is_empty());
        assert!(!term.is_free("x"));
    }

    #[test]
    fn test_alpha_eq() {
        let lhs = Term::abs("x", Term::abs("y", Term::var("x")));
        let rhs = Term::abs("a", Term::abs("b", Term::var("a")));
        let other = Term::abs("a", Term::abs("b", Term::var("b")));
        assert!(lhs.alpha_eq(&rhs));
        assert!(!lhs.alpha_eq(&other));
        assert_ne!(lhs, rhs);
        // free names have to match literally
        assert!(!Term::var("x").alpha_eq(&Term::var("y")));
        assert!(!Term::abs("x", Term::var("y")).alpha_eq(&Term::abs("y", Term::var("y"))));
    }
}
