use crate::error::{ConsoleError, ConsoleResult};

/// What the evaluator's lexing capability says about a buffered piece of
/// input: a finished statement, one that needs continuation lines, or one
/// that can never become valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementStatus {
    Complete,
    Incomplete,
    Invalid(String),
}

/// One logical statement spanning one or more physical lines, together with
/// the line number its first physical line was pulled at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    first_line: usize,
}

impl Statement {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn first_line(&self) -> usize {
        self.first_line
    }
}

/// Buffers physical lines until they form one complete logical statement.
/// The first line has already been consumed by the console's dispatch check,
/// so only continuation lines are pulled here, under the continuation
/// prompt, never the primary one.
pub struct Accumulator {
    lines: Vec<String>,
    first_line: usize,
}

impl Accumulator {
    pub fn new(first_line: &str, line_number: usize) -> Self {
        Self {
            lines: vec![first_line.to_string()],
            first_line: line_number,
        }
    }

    pub fn buffered(&self) -> String {
        self.lines.join("\n")
    }

    /// Drive the buffer to completion: `classify` is the evaluator's lexing
    /// capability, `pull` re-enters the input source for one more physical
    /// line. End of input while the statement is still open is an error of
    /// its own, distinct from a syntax error.
    pub fn accumulate<C, P>(mut self, classify: C, mut pull: P) -> ConsoleResult<Statement>
    where
        C: Fn(&str) -> StatementStatus,
        P: FnMut() -> ConsoleResult<Option<String>>,
    {
        loop {
            match classify(&self.buffered()) {
                StatementStatus::Complete => {
                    return Ok(Statement {
                        text: self.buffered(),
                        first_line: self.first_line,
                    });
                }
                StatementStatus::Invalid(message) => {
                    return Err(ConsoleError::Syntax(message));
                }
                StatementStatus::Incomplete => match pull()? {
                    Some(line) => {
                        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
                        self.lines.push(line.to_string());
                    }
                    None => return Err(ConsoleError::UnexpectedEof),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(text: &str) -> StatementStatus {
        let depth: i64 = text
            .chars()
            .map(|c| match c {
                '(' => 1,
                ')' => -1,
                _ => 0,
            })
            .sum();
        match depth {
            0 => StatementStatus::Complete,
            d if d > 0 => StatementStatus::Incomplete,
            _ => StatementStatus::Invalid("unmatched closing parenthesis".to_string()),
        }
    }

    #[test]
    fn test_complete_first_line_pulls_nothing() {
        let statement = Accumulator::new("1 + 1", 1)
            .accumulate(balanced, || panic!("should not pull"))
            .unwrap();
        assert_eq!(statement.text(), "1 + 1");
        assert_eq!(statement.first_line(), 1);
    }

    #[test]
    fn test_pulls_until_complete() {
        let mut remaining = vec!["2".to_string(), ")".to_string()].into_iter();
        let statement = Accumulator::new("(1 +", 3)
            .accumulate(balanced, || Ok(remaining.next().map(|l| l + "\n")))
            .unwrap();
        assert_eq!(statement.text(), "(1 +\n2\n)");
        assert_eq!(statement.first_line(), 3);
    }

    #[test]
    fn test_invalid_input_is_a_syntax_error() {
        let result = Accumulator::new("1)", 1).accumulate(balanced, || Ok(None));
        assert!(matches!(result, Err(ConsoleError::Syntax(_))));
    }

    #[test]
    fn test_eof_mid_statement_is_distinct() {
        let result = Accumulator::new("(1 +", 1).accumulate(balanced, || Ok(None));
        assert!(matches!(result, Err(ConsoleError::UnexpectedEof)));
    }
}
