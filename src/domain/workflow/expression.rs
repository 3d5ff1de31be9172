//! Boolean conditions over collected answers
//!
//! Conditions drive conditional requiredness (`required_if`), transitions
//! (`next[].when`) and advisory rules (`actions_if[].when`). The grammar is
//! deliberately tiny:
//!
//! ```text
//! condition  := "always" | or_expr
//! or_expr    := and_expr ( "||" and_expr )*
//! and_expr   := primary ( "&&" primary )*
//! primary    := "(" or_expr ")" | identifier [ ( "==" | "!=" ) literal ]
//! literal    := word | 'quoted' | "quoted"
//! ```
//!
//! An identifier is a flat answer key looked up as written: `a.b` names the
//! answer `"a.b"` and is never walked as a path into nested values.
//!
//! Bare literals are compared as strings unless they are `true`, `false` or
//! `null`. An identifier missing from the answers only equals `null`. A bare
//! identifier tests the truthiness of the answer.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::state::Answers;

/// Keyword that always matches in transition rules
pub const ALWAYS: &str = "always";

/// Errors raised when an expression does not match the supported grammar
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unsupported character '{ch}' at position {position}")]
    UnsupportedCharacter { ch: char, position: usize },

    #[error("unsupported operator '{operator}' at position {position}")]
    UnsupportedOperator { operator: String, position: usize },

    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("expected {expected} at position {position}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Quoted(String),
    Eq,
    NotEq,
    And,
    Or,
    OpenParen,
    CloseParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => write!(f, "{}", w),
            Self::Quoted(q) => write!(f, "'{}'", q),
            Self::Eq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let next = chars.get(pos + 1).copied();

        let kind = match (c, next) {
            ('=', Some('=')) => {
                pos += 2;
                TokenKind::Eq
            }
            ('!', Some('=')) => {
                pos += 2;
                TokenKind::NotEq
            }
            ('&', Some('&')) => {
                pos += 2;
                TokenKind::And
            }
            ('|', Some('|')) => {
                pos += 2;
                TokenKind::Or
            }
            ('=' | '!' | '&' | '|', _) => {
                return Err(ExpressionError::UnsupportedOperator {
                    operator: c.to_string(),
                    position: start,
                });
            }
            ('(', _) => {
                pos += 1;
                TokenKind::OpenParen
            }
            (')', _) => {
                pos += 1;
                TokenKind::CloseParen
            }
            ('\'' | '"', _) => {
                let quote = c;
                pos += 1;
                let content_start = pos;

                while pos < chars.len() && chars[pos] != quote {
                    pos += 1;
                }

                if pos >= chars.len() {
                    return Err(ExpressionError::UnterminatedString(start));
                }

                let content: String = chars[content_start..pos].iter().collect();
                pos += 1;
                TokenKind::Quoted(content)
            }
            _ if is_word_char(c) => {
                while pos < chars.len() && is_word_char(chars[pos]) {
                    pos += 1;
                }
                TokenKind::Word(chars[start..pos].iter().collect())
            }
            _ => {
                return Err(ExpressionError::UnsupportedCharacter {
                    ch: c,
                    position: start,
                });
            }
        };

        tokens.push(Token {
            kind,
            position: start,
        });
    }

    Ok(tokens)
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Null,
    Bool(bool),
    Text(String),
}

impl Literal {
    fn from_word(word: &str) -> Self {
        match word {
            "null" => Self::Null,
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            other => Self::Text(other.to_string()),
        }
    }

    fn matches(&self, answer: Option<&Value>) -> bool {
        match (self, answer) {
            (Self::Null, None | Some(Value::Null)) => true,
            (Self::Null, _) => false,
            (_, None) => false,
            (_, Some(Value::Array(items))) => items.iter().any(|item| self.matches_scalar(item)),
            (_, Some(value)) => self.matches_scalar(value),
        }
    }

    fn matches_scalar(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null) => true,
            (Self::Bool(expected), Value::Bool(actual)) => expected == actual,
            (Self::Bool(expected), Value::String(actual)) => actual == &expected.to_string(),
            (Self::Text(expected), Value::String(actual)) => actual == expected,
            (Self::Text(expected), Value::Bool(actual)) => &actual.to_string() == expected,
            (Self::Text(expected), Value::Number(actual)) => &number_text(actual) == expected,
            _ => false,
        }
    }
}

fn number_text(number: &serde_json::Number) -> String {
    if let Some(i) = number.as_i64() {
        return i.to_string();
    }
    if let Some(u) = number.as_u64() {
        return u.to_string();
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => number.to_string(),
    }
}

fn is_truthy(answer: Option<&Value>) -> bool {
    match answer {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Always,
    Truthy(String),
    Compare {
        identifier: String,
        negated: bool,
        literal: Literal,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn evaluate(&self, answers: &Answers) -> bool {
        match self {
            Self::Always => true,
            Self::Truthy(identifier) => is_truthy(answers.get(identifier)),
            Self::Compare {
                identifier,
                negated,
                literal,
            } => literal.matches(answers.get(identifier)) != *negated,
            Self::And(left, right) => left.evaluate(answers) && right.evaluate(answers),
            Self::Or(left, right) => left.evaluate(answers) || right.evaluate(answers),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(token: &Token, expected: &str) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            position: token.position,
        }
    }

    fn parse(mut self) -> Result<Expr, ExpressionError> {
        let expr = self.parse_or()?;

        if let Some(token) = self.advance() {
            return Err(Self::unexpected(&token, "'&&', '||' or end of expression"));
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;

        while self.peek() == Some(&TokenKind::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_primary()?;

        while self.peek() == Some(&TokenKind::And) {
            self.pos += 1;
            let right = self.parse_primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self
            .advance()
            .ok_or_else(|| ExpressionError::UnexpectedEnd("identifier or '('".to_string()))?;

        match token.kind {
            TokenKind::OpenParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::CloseParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(Self::unexpected(&other, "')'")),
                    None => Err(ExpressionError::UnexpectedEnd("')'".to_string())),
                }
            }
            TokenKind::Word(identifier) => {
                let negated = match self.peek() {
                    Some(TokenKind::Eq) => false,
                    Some(TokenKind::NotEq) => true,
                    _ => return Ok(Expr::Truthy(identifier)),
                };
                self.pos += 1;

                let literal = match self.advance() {
                    Some(Token {
                        kind: TokenKind::Word(word),
                        ..
                    }) => Literal::from_word(&word),
                    Some(Token {
                        kind: TokenKind::Quoted(text),
                        ..
                    }) => Literal::Text(text),
                    Some(other) => return Err(Self::unexpected(&other, "literal")),
                    None => return Err(ExpressionError::UnexpectedEnd("literal".to_string())),
                };

                Ok(Expr::Compare {
                    identifier,
                    negated,
                    literal,
                })
            }
            _ => Err(Self::unexpected(&token, "identifier or '('")),
        }
    }
}

/// A parsed, validated condition
///
/// Conditions are parsed when the workflow document is deserialized, so a
/// malformed expression prevents the workflow from loading.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse a condition string
    pub fn parse(source: impl Into<String>) -> Result<Self, ExpressionError> {
        let source = source.into();
        let trimmed = source.trim();

        if trimmed.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let expr = if trimmed == ALWAYS {
            Expr::Always
        } else {
            Parser {
                tokens: tokenize(trimmed)?,
                pos: 0,
            }
            .parse()?
        };

        Ok(Self { source, expr })
    }

    /// Condition that always matches
    pub fn always() -> Self {
        Self {
            source: ALWAYS.to_string(),
            expr: Expr::Always,
        }
    }

    /// Whether this is the `always` keyword
    pub fn is_always(&self) -> bool {
        matches!(self.expr, Expr::Always)
    }

    /// The original expression text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against the current answers
    pub fn evaluate(&self, answers: &Answers) -> bool {
        self.expr.evaluate(answers)
    }
}

impl TryFrom<String> for Condition {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.source
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Parse and evaluate an expression in one go
pub fn evaluate(expression: &str, answers: &Answers) -> Result<bool, ExpressionError> {
    Ok(Condition::parse(expression)?.evaluate(answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> Answers {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bare_literal_is_compared_as_string() {
        let a = answers(json!({"transport_mode": "air"}));

        assert!(evaluate("transport_mode==air", &a).unwrap());
        assert!(!evaluate("transport_mode==sea", &a).unwrap());
        assert!(evaluate("transport_mode != sea", &a).unwrap());
    }

    #[test]
    fn test_identifiers_are_flat_answer_keys() {
        let a = answers(json!({"a.b": "x", "a": {"b": "y"}}));

        assert!(evaluate("a.b==x", &a).unwrap());
        assert!(!evaluate("a.b==y", &a).unwrap());
    }

    #[test]
    fn test_missing_identifier() {
        let a = Answers::new();

        assert!(!evaluate("permit==yes", &a).unwrap());
        assert!(!evaluate("permit==false", &a).unwrap());
        assert!(evaluate("permit==null", &a).unwrap());
        assert!(evaluate("permit!=yes", &a).unwrap());
        assert!(!evaluate("permit!=null", &a).unwrap());
    }

    #[test]
    fn test_boolean_and_null_literals() {
        let a = answers(json!({"hazardous": true, "checked": "false", "cleared": null}));

        assert!(evaluate("hazardous==true", &a).unwrap());
        assert!(!evaluate("hazardous==false", &a).unwrap());
        assert!(evaluate("checked==false", &a).unwrap());
        assert!(evaluate("cleared==null", &a).unwrap());
        assert!(!evaluate("hazardous==null", &a).unwrap());
    }

    #[test]
    fn test_numbers_compare_by_text() {
        let a = answers(json!({"qty": 5, "weight": 2.5}));

        assert!(evaluate("qty==5", &a).unwrap());
        assert!(!evaluate("qty==6", &a).unwrap());
        assert!(evaluate("weight==2.5", &a).unwrap());
    }

    #[test]
    fn test_precedence_and_grouping() {
        let a = answers(json!({"a": "1", "b": "2", "c": "3"}));

        // && binds tighter than ||
        assert!(evaluate("a==x || b==2 && c==3", &a).unwrap());
        assert!(!evaluate("(a==x || b==2) && c==4", &a).unwrap());
        assert!(evaluate("a==1 && (b==x || c==3)", &a).unwrap());
    }

    #[test]
    fn test_quoted_literal() {
        let a = answers(json!({"country": "Hong Kong"}));

        assert!(evaluate("country=='Hong Kong'", &a).unwrap());
        assert!(evaluate("country==\"Hong Kong\"", &a).unwrap());
    }

    #[test]
    fn test_multi_select_matches_any_element() {
        let a = answers(json!({"docs": ["invoice", "packing_list"]}));

        assert!(evaluate("docs==invoice", &a).unwrap());
        assert!(!evaluate("docs==permit", &a).unwrap());
        assert!(evaluate("docs!=permit", &a).unwrap());
    }

    #[test]
    fn test_truthiness() {
        let a = answers(json!({"yes": true, "no": false, "empty": "", "zero": 0, "name": "x"}));

        assert!(evaluate("yes", &a).unwrap());
        assert!(!evaluate("no", &a).unwrap());
        assert!(!evaluate("empty", &a).unwrap());
        assert!(!evaluate("zero", &a).unwrap());
        assert!(evaluate("name", &a).unwrap());
        assert!(!evaluate("missing", &a).unwrap());
    }

    #[test]
    fn test_always() {
        let condition = Condition::parse("always").unwrap();
        assert!(condition.is_always());
        assert!(condition.evaluate(&Answers::new()));
        assert!(Condition::always().is_always());
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        assert_eq!(evaluate("", &Answers::new()), Err(ExpressionError::Empty));

        assert!(matches!(
            evaluate("a=b", &Answers::new()),
            Err(ExpressionError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            evaluate("a > 1", &Answers::new()),
            Err(ExpressionError::UnsupportedCharacter { ch: '>', position: 2 })
        ));
        assert!(matches!(
            evaluate("process.exit(1); a==b", &Answers::new()),
            Err(ExpressionError::UnexpectedToken { .. }) | Err(ExpressionError::UnsupportedCharacter { .. })
        ));
        assert!(matches!(
            evaluate("a==", &Answers::new()),
            Err(ExpressionError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            evaluate("(a==b", &Answers::new()),
            Err(ExpressionError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            evaluate("a==b c==d", &Answers::new()),
            Err(ExpressionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            evaluate("a=='open", &Answers::new()),
            Err(ExpressionError::UnterminatedString(3))
        ));
    }

    #[test]
    fn test_serde_round_trip_keeps_source() {
        let condition: Condition = serde_json::from_value(json!("permit==no")).unwrap();
        assert_eq!(condition.as_str(), "permit==no");
        assert_eq!(serde_json::to_value(&condition).unwrap(), json!("permit==no"));

        let err = serde_json::from_value::<Condition>(json!("a >= 1"));
        assert!(err.is_err());
    }
}
