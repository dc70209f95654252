//! Conditional expressions over command responses.
//!
//! An expression looks like `result[0] contains Si-R` or
//! `result[1] not ge 3`: an index into the response list, an optional
//! `not`, an operator and a literal.

mod wait;

pub use wait::{CommandRunner, WaitMatch, WaitPolicy, wait_for};

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, rest, value},
    sequence::{delimited, preceded, terminated, tuple},
};
use regex::{Regex, RegexBuilder};

use crate::error::{ConditionError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    Matches,
}

/// A literal after casting: booleans and numbers compare by value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Literal {
    /// Cast literal text the way operators see it.
    pub fn cast(text: &str) -> Self {
        match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => return Self::Bool(true),
            "false" | "no" | "off" => return Self::Bool(false),
            _ => {}
        }
        match text.parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(text.to_string()),
        }
    }

    fn equals(&self, response: &str) -> bool {
        match self {
            Self::Bool(expected) => {
                matches!(Self::cast(response.trim()), Self::Bool(actual) if actual == *expected)
            }
            Self::Number(expected) => parse_number(response) == Some(*expected),
            Self::Text(expected) => response == expected,
        }
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Eq(Literal),
    Neq(Literal),
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    Contains(String),
    Matches(Regex),
}

impl Predicate {
    fn test(&self, response: &str) -> bool {
        match self {
            Self::Eq(literal) => literal.equals(response),
            Self::Neq(literal) => !literal.equals(response),
            Self::Gt(bound) => parse_number(response).is_some_and(|n| n > *bound),
            Self::Ge(bound) => parse_number(response).is_some_and(|n| n >= *bound),
            Self::Lt(bound) => parse_number(response).is_some_and(|n| n < *bound),
            Self::Le(bound) => parse_number(response).is_some_and(|n| n <= *bound),
            Self::Contains(needle) => response.contains(needle.as_str()),
            Self::Matches(regex) => regex.is_match(response),
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A parsed conditional expression.
#[derive(Debug, Clone)]
pub struct Conditional {
    raw: String,
    index: usize,
    negate: bool,
    predicate: Predicate,
}

impl Conditional {
    /// Parse an expression such as `result[0] contains ok`.
    pub fn parse(expression: &str) -> Result<Self> {
        let parse_error = |message: String| -> Error {
            ConditionError::Parse {
                expression: expression.to_string(),
                message,
            }
            .into()
        };

        let (_, (index, negate, operator, text)) = parse_expression(expression.trim())
            .map_err(|e| parse_error(format!("invalid syntax ({})", e)))?;

        let number = |text: &str| match Literal::cast(text) {
            Literal::Number(n) => Ok(n),
            _ => Err(parse_error(format!("'{}' is not a number", text))),
        };

        let predicate = match operator {
            Operator::Eq => Predicate::Eq(Literal::cast(text)),
            Operator::Neq => Predicate::Neq(Literal::cast(text)),
            Operator::Gt => Predicate::Gt(number(text)?),
            Operator::Ge => Predicate::Ge(number(text)?),
            Operator::Lt => Predicate::Lt(number(text)?),
            Operator::Le => Predicate::Le(number(text)?),
            Operator::Contains => Predicate::Contains(text.to_string()),
            Operator::Matches => Predicate::Matches(
                RegexBuilder::new(text)
                    .multi_line(true)
                    .build()
                    .map_err(|e| parse_error(e.to_string()))?,
            ),
        };

        Ok(Self {
            raw: expression.to_string(),
            index,
            negate,
            predicate,
        })
    }

    /// The expression text as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Index of the response the expression reads.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Evaluate against the ordered responses of one command batch.
    pub fn evaluate<S: AsRef<str>>(&self, responses: &[S]) -> Result<bool> {
        let response = responses.get(self.index).ok_or_else(|| ConditionError::IndexOutOfRange {
            expression: self.raw.clone(),
            index: self.index,
            len: responses.len(),
        })?;
        Ok(self.predicate.test(response.as_ref()) != self.negate)
    }
}

impl FromStr for Conditional {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn result_index(input: &str) -> IResult<&str, usize> {
    preceded(
        tag("result"),
        delimited(char('['), map_res(digit1, |d: &str| d.parse::<usize>()), char(']')),
    )(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Neq, alt((tag("neq"), tag("ne"), tag("!=")))),
        value(Operator::Eq, alt((tag("eq"), tag("==")))),
        value(Operator::Ge, alt((tag("ge"), tag(">=")))),
        value(Operator::Gt, alt((tag("gt"), tag(">")))),
        value(Operator::Le, alt((tag("le"), tag("<=")))),
        value(Operator::Lt, alt((tag("lt"), tag("<")))),
        value(Operator::Contains, tag("contains")),
        value(Operator::Matches, tag("matches")),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
        rest,
    ))(input)
}

fn parse_expression(input: &str) -> IResult<&str, (usize, bool, Operator, &str)> {
    all_consuming(tuple((
        terminated(result_index, space1),
        map(opt(terminated(tag("not"), space1)), |not| not.is_some()),
        terminated(operator, space1),
        terminated(literal, space0),
    )))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str, responses: &[&str]) -> bool {
        Conditional::parse(expression)
            .unwrap()
            .evaluate(responses)
            .unwrap()
    }

    #[test]
    fn test_contains() {
        assert!(eval("result[0] contains Si-R", &["System : Si-R G120"]));
        assert!(!eval("result[0] contains RTX", &["System : Si-R G120"]));
    }

    #[test]
    fn test_negation() {
        assert!(eval("result[0] not contains RTX", &["System : Si-R G120"]));
        assert!(!eval("result[0] not contains Si-R", &["System : Si-R G120"]));
    }

    #[test]
    fn test_operator_aliases() {
        assert!(eval("result[0] == up", &["up"]));
        assert!(eval("result[0] eq up", &["up"]));
        assert!(eval("result[0] != up", &["down"]));
        assert!(eval("result[0] ne up", &["down"]));
        assert!(eval("result[0] neq up", &["down"]));
        assert!(eval("result[0] > 2", &["3"]));
        assert!(eval("result[0] gt 2", &["3"]));
        assert!(eval("result[0] >= 3", &["3"]));
        assert!(eval("result[0] ge 3", &["3"]));
        assert!(eval("result[0] < 4", &["3"]));
        assert!(eval("result[0] lt 4", &["3"]));
        assert!(eval("result[0] <= 3", &["3"]));
        assert!(eval("result[0] le 3", &["3"]));
    }

    #[test]
    fn test_numeric_equality_casts_response() {
        assert!(eval("result[0] eq 5", &["5"]));
        assert!(eval("result[0] eq 5", &[" 5.0 "]));
        assert!(!eval("result[0] eq 5", &["five"]));
    }

    #[test]
    fn test_boolean_literal() {
        assert!(eval("result[0] eq true", &["yes"]));
        assert!(eval("result[0] eq off", &["false"]));
        assert!(!eval("result[0] eq true", &["no"]));
    }

    #[test]
    fn test_non_numeric_response_fails_numeric_comparison() {
        assert!(!eval("result[0] gt 1", &["up"]));
        assert!(!eval("result[0] le 1", &["up"]));
    }

    #[test]
    fn test_quoted_literal() {
        assert!(eval("result[0] contains \"Firm Ver\"", &["Firm Ver. : V20.52"]));
        assert!(eval("result[0] eq 'a b'", &["a b"]));
    }

    #[test]
    fn test_matches_is_multiline() {
        let output = "lan0: up\nlan1: down\n";
        assert!(eval(r"result[0] matches ^lan1: down$", &[output]));
        assert!(!eval(r"result[0] matches ^lan2", &[output]));
    }

    #[test]
    fn test_second_response() {
        assert!(eval("result[1] contains b", &["a", "b"]));
    }

    #[test]
    fn test_index_out_of_range() {
        let conditional = Conditional::parse("result[2] contains x").unwrap();
        let err = conditional.evaluate(&["a"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Condition(ConditionError::IndexOutOfRange { index: 2, len: 1, .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        for expression in [
            "",
            "result[0]",
            "result[x] contains a",
            "output[0] contains a",
            "result[0] like a",
            "result[0] gt many",
            "result[0] matches (",
            "result[0] eq \"a\" trailing",
        ] {
            let err = Conditional::parse(expression).unwrap_err();
            assert!(
                matches!(err, Error::Condition(ConditionError::Parse { .. })),
                "{expression}: {err}"
            );
        }
    }

    #[test]
    fn test_raw_and_display() {
        let conditional: Conditional = "result[0] contains ok".parse().unwrap();
        assert_eq!(conditional.raw(), "result[0] contains ok");
        assert_eq!(conditional.to_string(), "result[0] contains ok");
        assert_eq!(conditional.index(), 0);
    }
}
