//! Selector expressions for pulling a scalar out of an inbound message.
//!
//! A selector is compiled once (when a rule is applied) into a list of steps
//! and then evaluated against every data message. Supported forms:
//!
//! - `.` selects the whole message
//! - `value` or `.value` selects a top-level key
//! - `.a.b[2]` walks nested objects and arrays
//! - `.["odd key"]` or `['odd key']` selects keys containing reserved characters

use crate::error::{BlockError, Result};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "key '{}'", key),
            Step::Index(index) => write!(f, "index [{}]", index),
        }
    }
}

/// A compiled selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    steps: Vec<Step>,
}

impl Selector {
    /// Compile selector text into an evaluation plan
    pub fn compile(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BlockError::Parse("selector is empty".to_string()));
        }

        let chars: Vec<char> = trimmed.chars().collect();
        let mut steps = Vec::new();
        let mut pos = 0;

        if trimmed == "." {
            return Ok(Self {
                source: text.to_string(),
                steps,
            });
        }

        // The first step may omit its leading dot
        match chars[0] {
            '.' => {
                pos = 1;
                if chars.get(pos) == Some(&'[') {
                    steps.push(parse_bracket(&chars, &mut pos, trimmed)?);
                } else {
                    steps.push(Step::Key(parse_key(&chars, &mut pos, trimmed)?));
                }
            }
            '[' => steps.push(parse_bracket(&chars, &mut pos, trimmed)?),
            _ => steps.push(Step::Key(parse_key(&chars, &mut pos, trimmed)?)),
        }

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    steps.push(Step::Key(parse_key(&chars, &mut pos, trimmed)?));
                }
                '[' => steps.push(parse_bracket(&chars, &mut pos, trimmed)?),
                c => {
                    return Err(BlockError::Parse(format!(
                        "unexpected '{}' at position {} in selector '{}'",
                        c, pos, trimmed
                    )))
                }
            }
        }

        Ok(Self {
            source: text.to_string(),
            steps,
        })
    }

    /// Selector text as it was supplied
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of steps; zero selects the whole message
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Walk `message` and return the selected value
    pub fn evaluate<'a>(&self, message: &'a Value) -> Result<&'a Value> {
        let mut current = message;

        for step in &self.steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(key).ok_or_else(|| {
                    BlockError::Eval(format!("{} not found (selector '{}')", step, self.source))
                })?,
                (Step::Index(index), Value::Array(items)) => {
                    items.get(*index).ok_or_else(|| {
                        BlockError::Eval(format!(
                            "{} out of bounds for array of length {} (selector '{}')",
                            step,
                            items.len(),
                            self.source
                        ))
                    })?
                }
                (step, other) => {
                    return Err(BlockError::Eval(format!(
                        "cannot apply {} to {} (selector '{}')",
                        step,
                        json_type_name(other),
                        self.source
                    )))
                }
            };
        }

        Ok(current)
    }

    /// Evaluate and coerce the result to `f64`
    ///
    /// Any JSON number is accepted. Every other type is an error rather than
    /// a silent zero.
    pub fn evaluate_number(&self, message: &Value) -> Result<f64> {
        let value = self.evaluate(message)?;
        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| BlockError::UnsupportedValue {
                path: self.source.clone(),
                found: "non-finite number",
            }),
            other => Err(BlockError::UnsupportedValue {
                path: self.source.clone(),
                found: json_type_name(other),
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_key_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']' | '"' | '\'') && !c.is_whitespace()
}

fn parse_key(chars: &[char], pos: &mut usize, source: &str) -> Result<String> {
    let start = *pos;
    while *pos < chars.len() && is_key_char(chars[*pos]) {
        *pos += 1;
    }

    if start == *pos {
        return Err(BlockError::Parse(format!(
            "expected key at position {} in selector '{}'",
            start, source
        )));
    }

    Ok(chars[start..*pos].iter().collect())
}

fn parse_bracket(chars: &[char], pos: &mut usize, source: &str) -> Result<Step> {
    let open = *pos;
    *pos += 1; // '['

    let step = match chars.get(*pos) {
        Some(&quote) if quote == '"' || quote == '\'' => {
            *pos += 1;
            let mut key = String::new();
            loop {
                match chars.get(*pos) {
                    None => {
                        return Err(BlockError::Parse(format!(
                            "unterminated quoted key at position {} in selector '{}'",
                            open, source
                        )))
                    }
                    Some('\\') => {
                        let escaped = chars.get(*pos + 1).ok_or_else(|| {
                            BlockError::Parse(format!(
                                "dangling escape in selector '{}'",
                                source
                            ))
                        })?;
                        key.push(*escaped);
                        *pos += 2;
                    }
                    Some(&c) if c == quote => {
                        *pos += 1;
                        break;
                    }
                    Some(&c) => {
                        key.push(c);
                        *pos += 1;
                    }
                }
            }
            Step::Key(key)
        }
        _ => {
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != ']' {
                *pos += 1;
            }
            let digits: String = chars[start..*pos].iter().collect();
            let index = digits.trim().parse::<usize>().map_err(|_| {
                BlockError::Parse(format!(
                    "invalid index '{}' at position {} in selector '{}'",
                    digits, open, source
                ))
            })?;
            Step::Index(index)
        }
    };

    if chars.get(*pos) != Some(&']') {
        return Err(BlockError::Parse(format!(
            "unterminated '[' at position {} in selector '{}'",
            open, source
        )));
    }
    *pos += 1;

    Ok(step)
}
