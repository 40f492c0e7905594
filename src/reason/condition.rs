//! Rule condition language: parsing and three-valued evaluation.
//!
//! A condition is a boolean expression over named facts:
//!
//! ```text
//! temperature > 30 and not (door == "open" or alarm)
//! ```
//!
//! Comparisons take the form `fact OP literal` with `OP` one of
//! `> >= < <= == !=`; a bare fact name tests truthiness. `not` binds tighter
//! than `and`, which binds tighter than `or`; `!`, `&&` and `||` are accepted
//! as spellings of the same operators.
//!
//! Evaluation is three-valued. A comparison against an absent fact, or an
//! ordered comparison between values of different kinds, is *unknown*.
//! Connectives follow Kleene logic, and a rule fires only when its condition
//! is definitely true, so partial fact sets never make reasoning fail.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde_json::Number;

use crate::error::{ConfigError, ConfigResult};
use crate::value::{self, Facts, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `fact OP literal`.
    Compare {
        fact: String,
        op: CompareOp,
        literal: Value,
    },
    /// Bare `fact`: holds when the fact is present and truthy.
    Holds(String),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Parse a condition from its textual form.
    pub fn parse(source: &str) -> ConfigResult<Self> {
        let tokens = tokenize(source).map_err(|message| ConfigError::Condition {
            condition: source.into(),
            message,
        })?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or().and_then(|expr| {
            if parser.pos < parser.tokens.len() {
                Err(format!("unexpected {}", parser.tokens[parser.pos]))
            } else {
                Ok(expr)
            }
        });
        expr.map_err(|message| ConfigError::Condition {
            condition: source.into(),
            message,
        })
    }

    /// Evaluate against a fact set. `None` means the outcome is unknown.
    pub fn evaluate(&self, facts: &Facts) -> Option<bool> {
        match self {
            Self::Compare { fact, op, literal } => {
                let actual = facts.get(fact)?;
                let ord = || value::compare(actual, literal);
                match op {
                    CompareOp::Eq => Some(value::loosely_equal(actual, literal)),
                    CompareOp::Ne => Some(!value::loosely_equal(actual, literal)),
                    CompareOp::Gt => ord().map(|o| o == Ordering::Greater),
                    CompareOp::Ge => ord().map(|o| o != Ordering::Less),
                    CompareOp::Lt => ord().map(|o| o == Ordering::Less),
                    CompareOp::Le => ord().map(|o| o != Ordering::Greater),
                }
            }
            Self::Holds(fact) => facts.get(fact).map(value::is_truthy),
            Self::Not(inner) => inner.evaluate(facts).map(|b| !b),
            Self::And(lhs, rhs) => match (lhs.evaluate(facts), rhs.evaluate(facts)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            Self::Or(lhs, rhs) => match (lhs.evaluate(facts), rhs.evaluate(facts)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
        }
    }

    /// Whether the condition definitely holds.
    pub fn holds(&self, facts: &Facts) -> bool {
        self.evaluate(facts) == Some(true)
    }

    /// Names of every fact the condition cites, in sorted order.
    pub fn cited_facts(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_facts(&mut out);
        out
    }

    fn collect_facts<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Compare { fact, .. } | Self::Holds(fact) => {
                out.insert(fact.as_str());
            }
            Self::Not(inner) => inner.collect_facts(out),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_facts(out);
                rhs.collect_facts(out);
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { fact, op, literal } => write!(f, "{fact} {} {literal}", op.symbol()),
            Self::Holds(fact) => write!(f, "{fact}"),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::And(lhs, rhs) => write!(f, "({lhs} and {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} or {rhs})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Value),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::Literal(v) => write!(f, "literal `{v}`"),
            Self::Op(op) => write!(f, "operator `{}`", op.symbol()),
            Self::And => write!(f, "`and`"),
            Self::Or => write!(f, "`or`"),
            Self::Not => write!(f, "`not`"),
            Self::LParen => write!(f, "`(`"),
            Self::RParen => write!(f, "`)`"),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '>' | '<' | '=' | '!' => {
                let (tok, width) = match (c, next) {
                    ('>', Some('=')) => (Token::Op(CompareOp::Ge), 2),
                    ('>', _) => (Token::Op(CompareOp::Gt), 1),
                    ('<', Some('=')) => (Token::Op(CompareOp::Le), 2),
                    ('<', _) => (Token::Op(CompareOp::Lt), 1),
                    ('=', Some('=')) => (Token::Op(CompareOp::Eq), 2),
                    ('=', _) => (Token::Op(CompareOp::Eq), 1),
                    ('!', Some('=')) => (Token::Op(CompareOp::Ne), 2),
                    _ => (Token::Not, 1),
                };
                tokens.push(tok);
                i += width;
            }
            '&' | '|' => {
                if next != Some(c) {
                    return Err(format!("expected `{c}{c}` at offset {i}"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
                i += 2;
            }
            '"' | '\'' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(format!("unterminated string starting at offset {i}"));
                }
                let text: String = chars[start..end].iter().collect();
                tokens.push(Token::Literal(Value::String(text)));
                i = end + 1;
            }
            c if c.is_ascii_digit()
                || (c == '-' && next.is_some_and(|n| n.is_ascii_digit() || n == '.')) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Literal(parse_number(&text)?));
            }
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "null" => Token::Literal(Value::Null),
                    _ => Token::Ident(word),
                });
            }
            other => return Err(format!("unexpected character `{other}` at offset {i}")),
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str) -> Result<Value, String> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("invalid number `{text}`"))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Condition, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Condition::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, String> {
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(format!("expected `)`, found {other}")),
                    None => Err("expected `)`, found end of input".into()),
                }
            }
            Some(Token::Ident(fact)) => {
                let Some(Token::Op(op)) = self.peek().cloned() else {
                    return Ok(Condition::Holds(fact));
                };
                self.pos += 1;
                match self.bump() {
                    Some(Token::Literal(literal)) => Ok(Condition::Compare { fact, op, literal }),
                    Some(other) => Err(format!("expected a literal after `{}`, found {other}", op.symbol())),
                    None => Err(format!("expected a literal after `{}`", op.symbol())),
                }
            }
            Some(other) => Err(format!("expected a fact name, found {other}")),
            None => Err("empty condition".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(pairs: &[(&str, Value)]) -> Facts {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_simple_comparison() {
        let c = Condition::parse("temperature > 30").unwrap();
        assert_eq!(
            c,
            Condition::Compare {
                fact: "temperature".into(),
                op: CompareOp::Gt,
                literal: json!(30),
            }
        );
    }

    #[test]
    fn precedence_not_and_or() {
        let c = Condition::parse("a or b and not c").unwrap();
        assert_eq!(c.to_string(), "(a or (b and not (c)))");
    }

    #[test]
    fn symbolic_connectives() {
        let c = Condition::parse("!(x == 'a') && y >= -2.5 || z").unwrap();
        let f = facts(&[("x", json!("b")), ("y", json!(0)), ("z", json!(false))]);
        assert!(c.holds(&f));
    }

    #[test]
    fn comparisons_evaluate() {
        let f = facts(&[("t", json!(32)), ("s", json!("open"))]);
        assert!(Condition::parse("t > 30").unwrap().holds(&f));
        assert!(Condition::parse("t >= 32").unwrap().holds(&f));
        assert!(!Condition::parse("t < 32").unwrap().holds(&f));
        assert!(Condition::parse("t <= 32.0").unwrap().holds(&f));
        assert!(Condition::parse("t == 32.0").unwrap().holds(&f));
        assert!(Condition::parse("s != \"closed\"").unwrap().holds(&f));
    }

    #[test]
    fn absent_fact_is_unknown() {
        let c = Condition::parse("humidity > 70").unwrap();
        assert_eq!(c.evaluate(&Facts::new()), None);
        assert!(!c.holds(&Facts::new()));
    }

    #[test]
    fn mismatched_kinds_are_unknown() {
        let c = Condition::parse("t > 30").unwrap();
        assert_eq!(c.evaluate(&facts(&[("t", json!("hot"))])), None);
    }

    #[test]
    fn kleene_connectives() {
        let f = facts(&[("a", json!(true))]);
        assert_eq!(Condition::parse("a or missing").unwrap().evaluate(&f), Some(true));
        assert_eq!(Condition::parse("a and missing").unwrap().evaluate(&f), None);
        assert_eq!(Condition::parse("not a and missing").unwrap().evaluate(&f), Some(false));
    }

    #[test]
    fn cited_facts_are_collected() {
        let c = Condition::parse("temperature > 30 and (humidity > 70 or temperature > 40)").unwrap();
        let cited: Vec<&str> = c.cited_facts().into_iter().collect();
        assert_eq!(cited, vec!["humidity", "temperature"]);
    }

    #[test]
    fn dotted_fact_names() {
        let c = Condition::parse("robot.location == \"dock\"").unwrap();
        assert!(c.holds(&facts(&[("robot.location", json!("dock"))])));
    }

    #[test]
    fn malformed_conditions_are_rejected() {
        for bad in ["", "t >", "> 3", "(a", "a b", "t > \"open", "a & b", "t > x"] {
            let err = Condition::parse(bad).unwrap_err();
            assert!(
                matches!(err, ConfigError::Condition { .. }),
                "expected condition error for {bad:?}"
            );
        }
    }
}
