//! A small, self-contained expression evaluator used by the `kiln` binary
//! and the test suite. It implements the full evaluator capability
//! (completeness lexing and statement execution) for a calculator language
//! with variables, so the engine has something real to drive.

use crate::accumulate::StatementStatus;
use crate::complete::{Completion, LineProcessor};
use crate::console::Evaluator;
use crate::error::EvalError;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// What calc statements produce. The `Debug` form is the diagnostic
/// rendering shown after `  => `.
#[derive(Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "nil"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// The calc execution context: a flat variable scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, Value>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalcEvaluator;

impl Evaluator for CalcEvaluator {
    type Value = Value;
    type Context = Scope;

    fn default_context(&self) -> Scope {
        Scope::default()
    }

    /// A unit of input is complete once parentheses balance, no string is
    /// left open, and the last significant character is not an operator
    /// awaiting a right-hand side.
    fn classify(&self, source: &str) -> StatementStatus {
        let mut depth: i32 = 0;
        let mut in_string = false;
        let mut escaped = false;
        let mut last_significant = ' ';
        for c in source.chars() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                    last_significant = '"';
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return StatementStatus::Invalid(
                            "unmatched closing parenthesis".to_string(),
                        );
                    }
                }
                _ => {}
            }
            if !c.is_whitespace() {
                last_significant = c;
            }
        }
        if in_string || depth > 0 {
            return StatementStatus::Incomplete;
        }
        if matches!(
            last_significant,
            '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!'
        ) {
            return StatementStatus::Incomplete;
        }
        StatementStatus::Complete
    }

    fn evaluate(
        &mut self,
        statement: &str,
        context: &mut Scope,
        source_name: &str,
        first_line: usize,
    ) -> Result<Value, EvalError> {
        let result = match assign_pattern().captures(statement.trim()) {
            Some(captures) => {
                let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                eval_expr(captures.get(2).map(|m| m.as_str()).unwrap_or_default(), context)
                    .map(|value| {
                        context.set(name, value.clone());
                        value
                    })
            }
            None => eval_expr(statement, context),
        };
        result.map_err(|error| error.frame(format!("{source_name}:{first_line}")))
    }
}

fn assign_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^let\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?s:(.+))$").unwrap()
    })
}

/// Completes keywords and variable names for the word under the cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalcCompleter;

const KEYWORDS: &[&str] = &["exit", "false", "let", "nil", "true"];

impl LineProcessor<Scope> for CalcCompleter {
    fn complete(&self, line: &str, context: &Scope) -> Completion {
        let prefix = line
            .rsplit(|c: char| !(c.is_alphanumeric() || c == '_'))
            .next()
            .unwrap_or("");
        if prefix.is_empty() {
            return Completion::None;
        }
        let mut candidates: Vec<String> = KEYWORDS
            .iter()
            .filter(|keyword| keyword.starts_with(prefix))
            .map(|keyword| keyword.to_string())
            .collect();
        candidates.extend(
            context
                .names()
                .into_iter()
                .filter(|name| name.starts_with(prefix)),
        );
        candidates.sort();
        candidates.dedup();
        match candidates.len() {
            0 => Completion::None,
            1 => Completion::Single(candidates.remove(0)),
            _ => Completion::Many(candidates),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(Op),
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn syntax_error(message: impl Into<String>) -> EvalError {
    EvalError::new("SyntaxError", message)
}

fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::new("TypeError", message)
}

fn tokenize(text: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let mut is_float = false;
                if chars.peek() == Some(&'.') {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                        is_float = true;
                        literal.push('.');
                        chars.next();
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                literal.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                if is_float {
                    let value = literal
                        .parse::<f64>()
                        .map_err(|_| syntax_error(format!("invalid float literal `{literal}`")))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = literal.parse::<i64>().map_err(|_| {
                        syntax_error(format!("integer literal `{literal}` is out of range"))
                    })?;
                    tokens.push(Token::Int(value));
                }
            }
            '"' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                while let Some(d) = chars.next() {
                    match d {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => literal.push('\n'),
                            Some('t') => literal.push('\t'),
                            Some('"') => literal.push('"'),
                            Some('\\') => literal.push('\\'),
                            Some(other) => {
                                return Err(syntax_error(format!(
                                    "unknown escape `\\{other}` in string literal"
                                )))
                            }
                            None => break,
                        },
                        _ => literal.push(d),
                    }
                }
                if !closed {
                    return Err(syntax_error("unterminated string literal"));
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(Op::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Op(Op::Sub));
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(Op::Mul));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(Op::Div));
            }
            '%' => {
                chars.next();
                tokens.push(Token::Op(Op::Rem));
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(Op::Eq));
                } else {
                    return Err(syntax_error("unexpected `=`; assignment is `let name = value`"));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(Op::Ne));
                } else {
                    return Err(syntax_error("unexpected `!`"));
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(Op::Le));
                } else {
                    tokens.push(Token::Op(Op::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(Op::Ge));
                } else {
                    tokens.push(Token::Op(Op::Gt));
                }
            }
            other => return Err(syntax_error(format!("unexpected character `{other}`"))),
        }
    }
    Ok(tokens)
}

fn eval_expr(text: &str, scope: &Scope) -> Result<Value, EvalError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.comparison(scope)?;
    if parser.pos != parser.tokens.len() {
        return Err(syntax_error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_op(&self) -> Option<Op> {
        match self.peek() {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn comparison(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        let mut lhs = self.additive(scope)?;
        while let Some(op @ (Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge)) = self.peek_op()
        {
            self.pos += 1;
            let rhs = self.additive(scope)?;
            lhs = compare(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn additive(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        let mut lhs = self.multiplicative(scope)?;
        while let Some(op @ (Op::Add | Op::Sub)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.multiplicative(scope)?;
            lhs = arithmetic(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        let mut lhs = self.unary(scope)?;
        while let Some(op @ (Op::Mul | Op::Div | Op::Rem)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.unary(scope)?;
            lhs = arithmetic(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        if self.peek_op() == Some(Op::Sub) {
            self.pos += 1;
            return match self.unary(scope)? {
                Value::Int(value) => value
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::new("RangeError", "integer overflow")),
                Value::Float(value) => Ok(Value::Float(-value)),
                other => Err(type_error(format!("cannot negate a {}", other.type_name()))),
            };
        }
        self.primary(scope)
    }

    fn primary(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        match self.next() {
            Some(Token::Int(value)) => Ok(Value::Int(value)),
            Some(Token::Float(value)) => Ok(Value::Float(value)),
            Some(Token::Str(value)) => Ok(Value::Str(value)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "nil" => Ok(Value::Unit),
                _ => scope.get(&name).cloned().ok_or_else(|| {
                    EvalError::new("NameError", format!("undefined variable `{name}`"))
                }),
            },
            Some(Token::LParen) => {
                let value = self.comparison(scope)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(syntax_error("expected `)`")),
                }
            }
            Some(token) => Err(syntax_error(format!("unexpected token {token:?}"))),
            None => Err(syntax_error("unexpected end of expression")),
        }
    }
}

fn arithmetic(op: Op, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, a, b),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, a, b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, a as f64, b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_arithmetic(op, a, b as f64))),
        (Value::Str(a), Value::Str(b)) if op == Op::Add => Ok(Value::Str(a + &b)),
        (lhs, rhs) => Err(type_error(format!(
            "cannot apply operator to {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn int_arithmetic(op: Op, a: i64, b: i64) -> Result<Value, EvalError> {
    let checked = match op {
        Op::Add => a.checked_add(b),
        Op::Sub => a.checked_sub(b),
        Op::Mul => a.checked_mul(b),
        Op::Div | Op::Rem if b == 0 => {
            return Err(EvalError::new("ZeroDivisionError", "divided by 0"))
        }
        Op::Div => a.checked_div(b),
        Op::Rem => a.checked_rem(b),
        _ => None,
    };
    checked
        .map(Value::Int)
        .ok_or_else(|| EvalError::new("RangeError", "integer overflow"))
}

fn float_arithmetic(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Rem => a % b,
        _ => f64::NAN,
    }
}

fn compare(op: Op, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) if matches!(op, Op::Eq | Op::Ne) => {
            return Ok(Value::Bool(if op == Op::Eq { a == b } else { a != b }));
        }
        (Value::Unit, Value::Unit) if matches!(op, Op::Eq | Op::Ne) => {
            return Ok(Value::Bool(op == Op::Eq));
        }
        _ => {
            return Err(type_error(format!(
                "cannot compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(op == Op::Ne));
    };
    Ok(Value::Bool(match op {
        Op::Eq => ordering.is_eq(),
        Op::Ne => !ordering.is_eq(),
        Op::Lt => ordering.is_lt(),
        Op::Le => ordering.is_le(),
        Op::Gt => ordering.is_gt(),
        Op::Ge => ordering.is_ge(),
        _ => false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(statement: &str, scope: &mut Scope) -> Result<Value, EvalError> {
        CalcEvaluator.evaluate(statement, scope, "(line)", 1)
    }

    #[test]
    fn test_literals() {
        let mut scope = Scope::default();
        assert_eq!(eval("42", &mut scope).unwrap(), Value::Int(42));
        assert_eq!(eval("1.5", &mut scope).unwrap(), Value::Float(1.5));
        assert_eq!(
            eval("\"hi\\n\"", &mut scope).unwrap(),
            Value::Str("hi\n".to_string())
        );
        assert_eq!(eval("true", &mut scope).unwrap(), Value::Bool(true));
        assert_eq!(eval("nil", &mut scope).unwrap(), Value::Unit);
    }

    #[test]
    fn test_precedence_and_parens() {
        let mut scope = Scope::default();
        assert_eq!(eval("1 + 2 * 3", &mut scope).unwrap(), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3", &mut scope).unwrap(), Value::Int(9));
        assert_eq!(eval("-2 + 5", &mut scope).unwrap(), Value::Int(3));
        assert_eq!(eval("7 % 4", &mut scope).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_mixed_numeric_promotes_to_float() {
        let mut scope = Scope::default();
        assert_eq!(eval("1 + 0.5", &mut scope).unwrap(), Value::Float(1.5));
        assert_eq!(eval("3 / 2", &mut scope).unwrap(), Value::Int(1));
        assert_eq!(eval("3.0 / 2", &mut scope).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_string_concat_and_compare() {
        let mut scope = Scope::default();
        assert_eq!(
            eval("\"a\" + \"b\"", &mut scope).unwrap(),
            Value::Str("ab".to_string())
        );
        assert_eq!(
            eval("\"a\" < \"b\"", &mut scope).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_assignment_and_lookup() {
        let mut scope = Scope::default();
        assert_eq!(eval("let x = 5", &mut scope).unwrap(), Value::Int(5));
        assert_eq!(eval("x + 1", &mut scope).unwrap(), Value::Int(6));
        assert_eq!(eval("x == 5", &mut scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_undefined_variable_carries_a_frame() {
        let mut scope = Scope::default();
        let error = CalcEvaluator
            .evaluate("ghost", &mut scope, "script.calc", 7)
            .unwrap_err();
        assert_eq!(error.kind, "NameError");
        assert_eq!(error.trace, vec!["script.calc:7"]);
    }

    #[test]
    fn test_division_by_zero() {
        let mut scope = Scope::default();
        let error = eval("1 / 0", &mut scope).unwrap_err();
        assert_eq!(error.kind, "ZeroDivisionError");
        assert_eq!(error.message, "divided by 0");
    }

    #[test]
    fn test_type_mismatch() {
        let mut scope = Scope::default();
        assert_eq!(
            eval("1 + \"x\"", &mut scope).unwrap_err().kind,
            "TypeError"
        );
        assert_eq!(eval("-\"x\"", &mut scope).unwrap_err().kind, "TypeError");
    }

    #[test]
    fn test_classify_statuses() {
        let lexer = CalcEvaluator;
        assert_eq!(lexer.classify("1 + 1"), StatementStatus::Complete);
        assert_eq!(lexer.classify("(1 +"), StatementStatus::Incomplete);
        assert_eq!(lexer.classify("1 +"), StatementStatus::Incomplete);
        assert_eq!(lexer.classify("let x ="), StatementStatus::Incomplete);
        assert_eq!(lexer.classify("\"open"), StatementStatus::Incomplete);
        assert_eq!(lexer.classify("(1 +\n2\n)"), StatementStatus::Complete);
        assert!(matches!(
            lexer.classify("1)"),
            StatementStatus::Invalid(_)
        ));
    }

    #[test]
    fn test_multi_line_statement_evaluates_as_one_unit() {
        let mut scope = Scope::default();
        assert_eq!(eval("(1 +\n2\n)", &mut scope).unwrap(), Value::Int(3));
        assert_eq!(eval("let y =\n4", &mut scope).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_debug_rendering() {
        assert_eq!(format!("{:?}", Value::Int(3)), "3");
        assert_eq!(format!("{:?}", Value::Float(3.0)), "3.0");
        assert_eq!(format!("{:?}", Value::Str("hi".to_string())), "\"hi\"");
        assert_eq!(format!("{:?}", Value::Unit), "nil");
    }

    #[test]
    fn test_completer_shapes() {
        let mut scope = Scope::default();
        let completer = CalcCompleter;
        assert!(completer.complete("", &scope).is_none());
        assert_eq!(
            completer.complete("tr", &scope),
            Completion::Single("true".to_string())
        );
        scope.set("total", Value::Int(1));
        scope.set("tribble", Value::Int(2));
        let Completion::Many(candidates) = completer.complete("let t = tr", &scope) else {
            panic!("expected several candidates");
        };
        assert_eq!(candidates, vec!["tribble", "true"]);
    }

    #[test]
    fn test_completer_ignores_non_word_tail() {
        let scope = Scope::default();
        assert!(CalcCompleter.complete("1 + ", &scope).is_none());
    }
}
