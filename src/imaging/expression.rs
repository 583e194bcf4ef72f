//! Structured effect expressions.
//!
//! An effect expression is the ordered list of filter terms applied to an
//! image before it is drawn, written in CSS filter syntax:
//!
//! ```text
//! contrast(1.2) saturate(1.35) blur(0.5px) hue-rotate(-20deg)
//! ```
//!
//! Text is only handled at the boundary: [`EffectExpression::parse`] turns it
//! into terms and [`Display`](std::fmt::Display) writes it back. Everything in
//! between (strength attenuation, adjustment composition, rasterization) works
//! on [`EffectTerm`] values.
//!
//! ## Arguments
//!
//! A term whose argument is a single number with an optional unit (`1.2`,
//! `2px`, `-15deg`, `50%`) parses to [`Argument::Number`]. Anything else, such
//! as `drop-shadow(2px 2px 4px black)`, is kept verbatim as [`Argument::Raw`]
//! and passes through every compositor untouched.
//!
//! ## The `none` sentinel
//!
//! The empty expression serializes to `none`, and both `none` and blank text
//! parse to the empty expression.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Serialized form of the empty expression.
pub const NO_EFFECT: &str = "none";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("Missing term name before '(' at offset {0}")]
    MissingName(usize),
    #[error("Term '{0}' is missing its closing parenthesis")]
    Unclosed(String),
}

/// Argument of a single effect term.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A number with an optional unit suffix (`""`, `"px"`, `"deg"`, `"%"`).
    Number { value: f64, unit: String },
    /// Anything that is not a lone number, kept exactly as written.
    Raw(String),
}

/// One `name(argument)` term of an effect expression.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTerm {
    pub name: String,
    pub argument: Argument,
}

impl EffectTerm {
    pub fn number(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: Argument::Number {
                value,
                unit: unit.into(),
            },
        }
    }

    pub fn raw(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: Argument::Raw(argument.into()),
        }
    }

    /// Numeric value, if the argument is a number.
    pub fn value(&self) -> Option<f64> {
        match &self.argument {
            Argument::Number { value, .. } => Some(*value),
            Argument::Raw(_) => None,
        }
    }

    /// Unit suffix, if the argument is a number.
    pub fn unit(&self) -> Option<&str> {
        match &self.argument {
            Argument::Number { unit, .. } => Some(unit),
            Argument::Raw(_) => None,
        }
    }
}

impl fmt::Display for EffectTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Argument::Number { value, unit } => {
                write!(f, "{}({}{})", self.name, format_number(*value), unit)
            }
            Argument::Raw(raw) => write!(f, "{}({})", self.name, raw),
        }
    }
}

/// The value at which a recognized effect has no visible impact.
///
/// Returns `None` for names outside the recognized set; such terms are never
/// attenuated.
pub fn neutral_value(name: &str) -> Option<f64> {
    match name {
        "brightness" | "contrast" | "saturate" | "opacity" => Some(1.0),
        "sepia" | "grayscale" | "hue-rotate" | "invert" | "blur" => Some(0.0),
        _ => None,
    }
}

/// An ordered sequence of effect terms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectExpression {
    terms: Vec<EffectTerm>,
}

impl EffectExpression {
    /// The empty expression (`none`).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(terms: Vec<EffectTerm>) -> Self {
        Self { terms }
    }

    /// Parse CSS filter text into terms.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == NO_EFFECT {
            return Ok(Self::none());
        }

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut terms = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '(' {
                return Err(ExpressionError::MissingName(offset));
            }
            if !is_name_char(c) {
                return Err(ExpressionError::UnexpectedChar { found: c, offset });
            }

            let name_start = offset;
            while i < chars.len() && is_name_char(chars[i].1) {
                i += 1;
            }
            let name_end = chars.get(i).map(|&(o, _)| o).unwrap_or(text.len());
            let name = &text[name_start..name_end];

            match chars.get(i) {
                Some(&(_, '(')) => {}
                Some(&(offset, found)) => {
                    return Err(ExpressionError::UnexpectedChar { found, offset });
                }
                None => return Err(ExpressionError::Unclosed(name.to_string())),
            }

            // Nested parentheses belong to the argument, e.g. `drop-shadow(0 0 2px rgb(0,0,0))`.
            let arg_start = chars[i].0 + 1;
            let mut depth = 1;
            i += 1;
            while i < chars.len() {
                match chars[i].1 {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            if depth != 0 {
                return Err(ExpressionError::Unclosed(name.to_string()));
            }
            let arg_end = chars[i].0;
            i += 1;

            terms.push(EffectTerm {
                name: name.to_string(),
                argument: parse_argument(&text[arg_start..arg_end]),
            });
        }

        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[EffectTerm] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<EffectTerm> {
        self.terms
    }

    /// True for the empty expression.
    pub fn is_none(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn push(&mut self, term: EffectTerm) {
        self.terms.push(term);
    }

    /// Append `other`'s terms after this expression's terms.
    pub fn then(mut self, other: EffectExpression) -> Self {
        self.terms.extend(other.terms);
        self
    }

    /// True when every term is a recognized effect sitting at its neutral value.
    pub fn is_neutral(&self) -> bool {
        self.terms.iter().all(|term| {
            matches!(
                (neutral_value(&term.name), term.value()),
                (Some(neutral), Some(value)) if value == neutral
            )
        })
    }
}

impl fmt::Display for EffectExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str(NO_EFFECT);
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

impl FromStr for EffectExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Split `"-15.5deg"` into value and unit; anything else stays raw.
fn parse_argument(raw: &str) -> Argument {
    let trimmed = raw.trim();
    let split = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (c == '-' && i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let unit_ok = unit.chars().all(|c| c.is_ascii_alphabetic() || c == '%');
    let number_ok = number.bytes().any(|b| b.is_ascii_digit()) && !number.ends_with('.');

    match number.parse::<f64>() {
        Ok(value) if unit_ok && number_ok && value.is_finite() => Argument::Number {
            value,
            unit: unit.to_string(),
        },
        _ => Argument::Raw(trimmed.to_string()),
    }
}

/// Shortest round-trip decimal form, with `-0` written as `0`.
pub(crate) fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}
