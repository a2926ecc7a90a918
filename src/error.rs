use std::fmt;
use thiserror::Error;

pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("SyntaxError: unexpected end of input inside an unfinished statement")]
    UnexpectedEof,

    #[error("{0}")]
    Eval(EvalError),

    #[error("{0}")]
    Handler(EvalError),

    #[error("Interrupted")]
    Interrupted,
}

impl ConsoleError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn syntax<S: Into<String>>(message: S) -> Self {
        Self::Syntax(message.into())
    }

    /// Returns true if this error may be caught and reported by the read
    /// loop when `rescue_errors` is in effect.
    pub fn is_rescuable(&self) -> bool {
        matches!(
            self,
            ConsoleError::Syntax(_)
                | ConsoleError::UnexpectedEof
                | ConsoleError::Eval(_)
                | ConsoleError::Handler(_)
        )
    }

    /// Returns true if this error must terminate the current run no matter
    /// what the rescue policy says.
    pub fn is_termination(&self) -> bool {
        matches!(self, ConsoleError::Interrupted | ConsoleError::Io(_))
    }
}

/// A failure reported by an evaluator or a command handler: a short error
/// kind, a message, and optional trace frames (`source:line`) supplied by
/// whoever raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub kind: String,
    pub message: String,
    pub trace: Vec<String>,
}

impl EvalError {
    pub fn new<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn frame<S: Into<String>>(mut self, frame: S) -> Self {
        self.trace.push(frame.into());
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::new("NameError", "undefined variable `x`");
        assert_eq!(err.to_string(), "NameError: undefined variable `x`");
    }

    #[test]
    fn test_frames_accumulate_in_order() {
        let err = EvalError::new("TypeError", "boom")
            .frame("(line):1")
            .frame("(line):2");
        assert_eq!(err.trace, vec!["(line):1", "(line):2"]);
    }

    #[test]
    fn test_rescue_classification() {
        assert!(ConsoleError::Syntax("x".into()).is_rescuable());
        assert!(ConsoleError::UnexpectedEof.is_rescuable());
        assert!(ConsoleError::Eval(EvalError::new("E", "m")).is_rescuable());
        assert!(!ConsoleError::Interrupted.is_rescuable());
        assert!(ConsoleError::Interrupted.is_termination());
        assert!(!ConsoleError::Config("bad".into()).is_rescuable());
    }
}
