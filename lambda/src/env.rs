use rpds::HashTrieMap;

use crate::{prelude::*, term::TermRef};

/// Named terms, stored as written. Definitions are never reduced here.
#[derive(Default, Clone, Debug)]
pub struct Environment {
    definitions: HashTrieMap<Identifier, TermRef>,
}
impl Environment {
    /// Binds `name`, replacing any earlier binding.
    pub fn define(&mut self, name: Identifier, term: impl Into<TermRef>) {
        self.definitions = self.definitions.insert(name, term.into());
    }

    pub fn lookup(&self, name: &str) -> Option<TermRef> {
        self.definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Bindings sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &TermRef)> {
        let mut entries = self.definitions.iter().collect::<Vec<_>>();
        entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.size()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn reset(&mut self) {
        self.definitions = HashTrieMap::new();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::Term;

    #[test]
    fn test_define_and_lookup() {
        let mut env = Environment::default();
        assert!(env.lookup("I").is_none());
        env.define("I".into(), Term::abs("x", Term::var("x")));
        assert_eq!(
            env.lookup("I").as_deref(),
            Some(&Term::abs("x", Term::var("x")))
        );
        assert!(env.contains("I"));
        assert!(!env.contains("K"));
    }

    #[test]
    fn test_redefine_replaces() {
        let mut env = Environment::default();
        env.define("K".into(), Term::abs("x", Term::abs("y", Term::var("x"))));
        env.define("K".into(), Term::abs("x", Term::abs("y", Term::var("y"))));
        assert_eq!(env.len(), 1);
        assert_eq!(
            env.lookup("K").unwrap().to_string(),
            "(λx.(λy.y))".to_string()
        );
    }

    #[test]
    fn test_iter_and_reset() {
        let mut env = Environment::default();
        env.define("b".into(), Term::var("y"));
        env.define("a".into(), Term::var("x"));
        let names = env.iter().map(|(n, _)| n.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b"]);
        env.reset();
        assert!(env.is_empty());
        assert!(env.lookup("a").is_none());
    }
}
