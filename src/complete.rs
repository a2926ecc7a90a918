/// The pluggable completion capability: given the text before the cursor and
/// the current execution context, propose candidates. Implementations are
/// free to return a single string, a list, or nothing; the console
/// normalizes the shape at the dispatch boundary.
pub trait LineProcessor<C> {
    fn complete(&self, line: &str, context: &C) -> Completion;
}

/// What a line processor may answer with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Completion {
    #[default]
    None,
    Single(String),
    Many(Vec<String>),
}

impl Completion {
    /// Normalize to an ordered candidate list.
    pub fn into_candidates(self) -> Vec<String> {
        match self {
            Completion::None => Vec::new(),
            Completion::Single(candidate) => vec![candidate],
            Completion::Many(candidates) => candidates,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Completion::None)
    }
}

impl From<String> for Completion {
    fn from(candidate: String) -> Self {
        Completion::Single(candidate)
    }
}

impl From<&str> for Completion {
    fn from(candidate: &str) -> Self {
        Completion::Single(candidate.to_string())
    }
}

impl From<Vec<String>> for Completion {
    fn from(candidates: Vec<String>) -> Self {
        Completion::Many(candidates)
    }
}

impl From<Option<String>> for Completion {
    fn from(candidate: Option<String>) -> Self {
        match candidate {
            Some(candidate) => Completion::Single(candidate),
            None => Completion::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_shapes() {
        assert!(Completion::None.into_candidates().is_empty());
        assert_eq!(Completion::from("one").into_candidates(), vec!["one"]);
        assert_eq!(
            Completion::from(vec!["a".to_string(), "b".to_string()]).into_candidates(),
            vec!["a", "b"]
        );
        assert_eq!(Completion::from(None).into_candidates(), Vec::<String>::new());
        assert_eq!(
            Completion::from(Some("x".to_string())).into_candidates(),
            vec!["x"]
        );
    }

    #[test]
    fn test_many_preserves_order() {
        let candidates = vec!["z".to_string(), "a".to_string(), "m".to_string()];
        assert_eq!(
            Completion::from(candidates.clone()).into_candidates(),
            candidates
        );
    }
}
