//! Boolean expressions over transcript metrics, e.g.
//! `(exon_num > 1 and proportion_verified_introns >= 0.5) or selected_cds_length > 300`.
//!
//! Expressions are parsed once into a typed tree and evaluated against any
//! [`MetricLookup`].

use std::fmt;

use serde::Deserialize;

use crate::error::Error;
use crate::transcript::metrics::{self, MetricLookup};

use super::rules::Operator;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Expression {
    Literal(bool),
    /// A flag metric used on its own.
    Metric(String),
    Compare {
        metric: String,
        operator: Operator,
        value: f64,
    },
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Parse an expression; unknown metric names are rejected.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expression = parser.parse_or()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(Error::Expression(format!(
                "unexpected '{token}' in '{text}'"
            )));
        }
        for name in expression.metric_names() {
            if !metrics::is_known_metric(name) {
                return Err(Error::Expression(format!("unknown metric '{name}' in '{text}'")));
            }
        }
        Ok(expression)
    }

    pub fn evaluate(&self, lookup: &dyn MetricLookup) -> Result<bool, Error> {
        let fetch = |name: &str| {
            lookup
                .metric(name)
                .ok_or_else(|| Error::Expression(format!("metric '{name}' not available")))
        };
        Ok(match self {
            Self::Literal(b) => *b,
            Self::Metric(name) => fetch(name)?.as_f64() != 0.0,
            Self::Compare {
                metric,
                operator,
                value,
            } => operator.apply(fetch(metric)?.as_f64(), *value),
            Self::Not(inner) => !inner.evaluate(lookup)?,
            Self::And(a, b) => a.evaluate(lookup)? && b.evaluate(lookup)?,
            Self::Or(a, b) => a.evaluate(lookup)? || b.evaluate(lookup)?,
        })
    }

    /// Every metric name referenced by the expression.
    #[must_use]
    pub fn metric_names(&self) -> Vec<&str> {
        match self {
            Self::Literal(_) => Vec::new(),
            Self::Metric(name) | Self::Compare { metric: name, .. } => vec![name.as_str()],
            Self::Not(inner) => inner.metric_names(),
            Self::And(a, b) | Self::Or(a, b) => {
                let mut names = a.metric_names();
                names.extend(b.metric_names());
                names
            }
        }
    }
}

impl TryFrom<String> for Expression {
    type Error = Error;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(b) => write!(f, "{b}"),
            Self::Metric(name) => write!(f, "{name}"),
            Self::Compare {
                metric,
                operator,
                value,
            } => write!(f, "{metric} {operator} {value}"),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::And(a, b) => write!(f, "({a} and {b})"),
            Self::Or(a, b) => write!(f, "({a} or {b})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Op(Operator),
    And,
    Or,
    Not,
    True,
    False,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Op(op) => write!(f, "{op}"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Open => write!(f, "("),
            Self::Close => write!(f, ")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('(', _) => (Token::Open, 1),
            (')', _) => (Token::Close, 1),
            ('=', Some('=')) => (Token::Op(Operator::Eq), 2),
            ('!', Some('=')) => (Token::Op(Operator::Ne), 2),
            ('<', Some('=')) => (Token::Op(Operator::Le), 2),
            ('>', Some('=')) => (Token::Op(Operator::Ge), 2),
            ('<', _) => (Token::Op(Operator::Lt), 1),
            ('>', _) => (Token::Op(Operator::Gt), 1),
            _ if c.is_ascii_digit() || c == '.' || c == '-' => {
                let start = i;
                let mut end = i + 1;
                while end < chars.len()
                    && (chars[end].is_ascii_digit()
                        || matches!(chars[end], '.' | 'e' | 'E')
                        || (matches!(chars[end], '-' | '+') && matches!(chars[end - 1], 'e' | 'E')))
                {
                    end += 1;
                }
                let literal: String = chars[start..end].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| Error::Expression(format!("invalid number '{literal}' in '{text}'")))?;
                (Token::Number(number), end - start)
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut end = i + 1;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let word: String = chars[start..end].iter().collect();
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                };
                (token, end - start)
            }
            _ => {
                return Err(Error::Expression(format!(
                    "unexpected character '{c}' in '{text}'"
                )));
            }
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

/// Recursive-descent parser: `or` binds loosest, then `and`, then `not`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expression, Error> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression, Error> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = Expression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression, Error> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expression::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        match self.advance() {
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    other => Err(Error::Expression(format!(
                        "expected ')' but found {}",
                        other.map_or("end of input".to_string(), |t| format!("'{t}'"))
                    ))),
                }
            }
            Some(Token::True) => Ok(Expression::Literal(true)),
            Some(Token::False) => Ok(Expression::Literal(false)),
            Some(Token::Ident(metric)) => {
                let Some(Token::Op(operator)) = self.peek().cloned() else {
                    return Ok(Expression::Metric(metric));
                };
                self.pos += 1;
                let value = match self.advance() {
                    Some(Token::Number(n)) => n,
                    Some(Token::True) => 1.0,
                    Some(Token::False) => 0.0,
                    other => {
                        return Err(Error::Expression(format!(
                            "expected a value after '{metric} {operator}', found {}",
                            other.map_or("end of input".to_string(), |t| format!("'{t}'"))
                        )));
                    }
                };
                Ok(Expression::Compare {
                    metric,
                    operator,
                    value,
                })
            }
            other => Err(Error::Expression(format!(
                "unexpected {}",
                other.map_or("end of input".to_string(), |t| format!("'{t}'"))
            ))),
        }
    }
}
