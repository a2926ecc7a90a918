use crate::console::{Console, Evaluator};
use crate::error::EvalError;
use indexmap::IndexMap;
use std::rc::Rc;

/// A registered command handler. Handlers get the console itself (for
/// output, nested runs, or requesting exit) and the argument tokens after
/// the command word; a returned value is rendered like an evaluated result.
pub type HandlerFn<E> =
    dyn Fn(&mut Console<E>, &[String]) -> Result<Option<<E as Evaluator>::Value>, EvalError>;

pub struct CommandEntry<E: Evaluator> {
    pub name: String,
    pub case_sensitive: bool,
    handler: Rc<HandlerFn<E>>,
}

impl<E: Evaluator> CommandEntry<E> {
    fn matches(&self, word: &str) -> bool {
        if self.case_sensitive {
            self.name == word
        } else {
            self.name.eq_ignore_ascii_case(word)
        }
    }
}

/// An insertion-ordered command registry. Dispatch compares the first
/// whitespace-delimited token of a line against each entry in registration
/// order and stops at the first match, so iteration order is part of the
/// contract.
pub struct CommandTable<E: Evaluator> {
    entries: IndexMap<String, CommandEntry<E>>,
}

impl<E: Evaluator> CommandTable<E> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or overwrite the entry for `name`.
    pub fn register<F>(&mut self, name: &str, case_sensitive: bool, handler: F)
    where
        F: Fn(&mut Console<E>, &[String]) -> Result<Option<E::Value>, EvalError> + 'static,
    {
        self.entries.insert(
            name.to_string(),
            CommandEntry {
                name: name.to_string(),
                case_sensitive,
                handler: Rc::new(handler),
            },
        );
    }

    /// Match `line` against the table: the first token is the candidate
    /// command word, the rest become argument tokens. `None` is an explicit
    /// miss, letting the caller fall through to statement evaluation.
    pub fn resolve(&self, line: &str) -> Option<(Rc<HandlerFn<E>>, Vec<String>)> {
        let mut tokens = line.split_whitespace();
        let word = tokens.next()?;
        let entry = self.entries.values().find(|entry| entry.matches(word))?;
        let args = tokens.map(str::to_string).collect();
        Some((Rc::clone(&entry.handler), args))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Evaluator> Default for CommandTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::CalcEvaluator;

    fn table() -> CommandTable<CalcEvaluator> {
        CommandTable::new()
    }

    #[test]
    fn test_resolve_splits_word_and_args() {
        let mut commands = table();
        commands.register("load", false, |_, _| Ok(None));
        let (_, args) = commands.resolve("load one  two").unwrap();
        assert_eq!(args, vec!["one", "two"]);
    }

    #[test]
    fn test_case_insensitive_matches_any_permutation() {
        let mut commands = table();
        commands.register("help", false, |_, _| Ok(None));
        for word in ["help", "HELP", "hElP"] {
            assert!(commands.resolve(word).is_some(), "{word} should match");
        }
    }

    #[test]
    fn test_case_sensitive_matches_exactly() {
        let mut commands = table();
        commands.register("Help", true, |_, _| Ok(None));
        assert!(commands.resolve("Help").is_some());
        assert!(commands.resolve("help").is_none());
    }

    #[test]
    fn test_miss_is_explicit_not_an_error() {
        let commands = table();
        assert!(commands.resolve("anything at all").is_none());
        assert!(commands.resolve("").is_none());
    }

    #[test]
    fn test_registration_order_wins_for_overlapping_names() {
        let mut commands = table();
        commands.register("STATUS", true, |_, _| Ok(None));
        commands.register("status", false, |_, _| Ok(None));
        // The case-sensitive entry was registered first and scans first.
        let (_, _) = commands.resolve("STATUS").unwrap();
        let names: Vec<_> = commands.names().collect();
        assert_eq!(names, vec!["STATUS", "status"]);
    }

    #[test]
    fn test_reregistering_overwrites() {
        let mut commands = table();
        commands.register("x", false, |_, _| Ok(None));
        commands.register("x", true, |_, _| Ok(None));
        assert!(commands.resolve("X").is_none());
    }
}
