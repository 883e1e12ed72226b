use crate::error::{BlockError, Result};
use crate::path::{json_type_name, Selector};
use crate::types::RuleResponse;
use serde_json::{Map, Value};

pub const PATH_FIELD: &str = "Path";
pub const NUM_SAMPLES_FIELD: &str = "NumSamples";

/// Validated configuration of a timeseries block.
///
/// Only constructed through [`TimeseriesRule::from_value`], so the compiled
/// selector always matches `path` and `num_samples` is within limits.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRule {
    path: String,
    selector: Selector,
    num_samples: usize,
}

impl TimeseriesRule {
    /// Parse and validate a rule payload such as
    /// `{"Path": ".value", "NumSamples": 128}`.
    ///
    /// Either the whole rule is valid or an error is returned; nothing is
    /// partially applied.
    pub fn from_value(payload: &Value, max_window: usize) -> Result<Self> {
        let rule = payload.as_object().ok_or_else(|| {
            BlockError::RuleType(format!(
                "rule must be an object, got {}",
                json_type_name(payload)
            ))
        })?;

        let path = parse_string(rule, PATH_FIELD)?;
        let selector = Selector::compile(&path)?;
        let num_samples = parse_float(rule, NUM_SAMPLES_FIELD)?;
        let num_samples = window_size(num_samples, max_window)?;

        Ok(Self {
            path,
            selector,
            num_samples,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn to_response(&self) -> RuleResponse {
        RuleResponse {
            path: self.path.clone(),
            num_samples: self.num_samples,
        }
    }
}

fn parse_string(rule: &Map<String, Value>, key: &str) -> Result<String> {
    match rule.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(BlockError::Parse(format!(
            "'{}' must be a string, got {}",
            key,
            json_type_name(other)
        ))),
        None => Err(BlockError::Parse(format!("'{}' was not in rule", key))),
    }
}

/// Numbers are accepted as JSON numbers or numeric strings
fn parse_float(rule: &Map<String, Value>, key: &str) -> Result<f64> {
    match rule.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| BlockError::Parse(format!("'{}' is not representable as f64", key))),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            BlockError::Parse(format!("'{}' is not a valid number: '{}'", key, s))
        }),
        Some(other) => Err(BlockError::Parse(format!(
            "'{}' must be a number, got {}",
            key,
            json_type_name(other)
        ))),
        None => Err(BlockError::Parse(format!("'{}' was not in rule", key))),
    }
}

fn window_size(raw: f64, max_window: usize) -> Result<usize> {
    if !raw.is_finite() || raw.fract() != 0.0 {
        return Err(BlockError::InvalidConfig(format!(
            "{} must be a whole number, got {}",
            NUM_SAMPLES_FIELD, raw
        )));
    }
    if raw < 1.0 || raw > max_window as f64 {
        return Err(BlockError::InvalidConfig(format!(
            "{} must be between 1 and {}, got {}",
            NUM_SAMPLES_FIELD, max_window, raw
        )));
    }
    Ok(raw as usize)
}
