//! Timeseries block.
//!
//! Keeps the last `NumSamples` values selected by `Path` from messages on the
//! `in` route, each stamped with the wall clock on arrival.
//!
//! | route | kind | effect |
//! |---|---|---|
//! | `rule` | in | replace the rule, reset the window to zero samples |
//! | `in` | in | evaluate the selector and append the value |
//! | `poll` | in | emit `{"timeseries": [{timestamp, value}, ..]}` on the outbound port |
//! | `rule` | query | `{"Path", "NumSamples"}` |
//! | `state`, `timeseries` | query | `{"timeseries": {"Values": [..]}}` |
//! | `spectrum`, `fft` | query | `{"fft": [[re, im], ..]}` |
//!
//! Until a rule has been applied, data is ignored and queries return empty
//! results.

use crate::block::{Block, Outbound};
use crate::clock::{Clock, SystemClock};
use crate::error::{BlockError, Result};
use crate::ids::{BlockId, IdAllocator};
use crate::rule::TimeseriesRule;
use crate::settings::BlockSettings;
use crate::spectrum::SpectrumTransform;
use crate::types::{
    BlockState, PollSnapshot, RuleResponse, Sample, SnapshotPoint, SpectrumResponse,
    StateResponse, WindowValues,
};
use crate::window::WindowBuffer;
use async_trait::async_trait;
use serde_json::Value;

pub const KIND: &str = "timeseries";

pub const IN_ROUTES: &[&str] = &["in", "rule", "poll"];
pub const QUERY_ROUTES: &[&str] = &["rule", "state", "timeseries", "spectrum", "fft"];

pub struct Timeseries {
    id: BlockId,
    max_window: usize,
    clock: Box<dyn Clock>,
    rule: Option<TimeseriesRule>,
    window: Option<WindowBuffer>,
    spectrum: SpectrumTransform,
}

impl Timeseries {
    pub fn new(ids: &IdAllocator) -> Self {
        Self {
            id: ids.next_id(),
            max_window: BlockSettings::default().max_window,
            clock: Box::new(SystemClock),
            rule: None,
            window: None,
            spectrum: SpectrumTransform::new(),
        }
    }

    pub fn from_settings(ids: &IdAllocator, settings: &BlockSettings) -> Self {
        Self::new(ids).with_max_window(settings.max_window)
    }

    pub fn with_clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_max_window(mut self, max_window: usize) -> Self {
        self.max_window = max_window;
        self
    }

    pub fn rule(&self) -> Option<&TimeseriesRule> {
        self.rule.as_ref()
    }

    pub fn window(&self) -> Option<&WindowBuffer> {
        self.window.as_ref()
    }

    /// Validate and apply a rule payload. On error nothing changes.
    pub fn apply_rule(&mut self, payload: &Value) -> Result<()> {
        let rule = TimeseriesRule::from_value(payload, self.max_window)?;

        match self.window.as_mut() {
            Some(window) => window.reset(rule.num_samples()),
            None => self.window = Some(WindowBuffer::new(rule.num_samples())),
        }

        log::info!(
            "{} {} configured: path '{}', {} samples",
            KIND,
            self.id,
            rule.path(),
            rule.num_samples()
        );
        self.rule = Some(rule);
        Ok(())
    }

    /// Extract a value from `msg` and append it to the window.
    ///
    /// Silently ignored while unconfigured. Evaluation errors leave the window
    /// untouched.
    pub fn ingest(&mut self, msg: &Value) -> Result<()> {
        let (Some(rule), Some(window)) = (self.rule.as_ref(), self.window.as_mut()) else {
            log::debug!("{} {} not configured, dropping data", KIND, self.id);
            return Ok(());
        };

        let value = rule.selector().evaluate_number(msg)?;
        window.append(Sample::new(self.clock.now(), value));
        Ok(())
    }

    pub fn rule_response(&self) -> RuleResponse {
        match &self.rule {
            Some(rule) => rule.to_response(),
            None => RuleResponse {
                path: String::new(),
                num_samples: 0,
            },
        }
    }

    pub fn state_response(&self) -> StateResponse {
        StateResponse {
            timeseries: WindowValues {
                values: self.window.as_ref().map(|w| w.snapshot()).unwrap_or_default(),
            },
        }
    }

    /// Transform of the current window, recomputed on every call
    pub fn spectrum_response(&mut self) -> SpectrumResponse {
        let values = self.window.as_ref().map(|w| w.values()).unwrap_or_default();
        SpectrumResponse {
            fft: self
                .spectrum
                .compute(&values)
                .iter()
                .map(|bin| bin.as_pair())
                .collect(),
        }
    }

    pub fn poll_snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            timeseries: self
                .window
                .as_ref()
                .map(|w| w.iter().map(SnapshotPoint::from).collect())
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Block for Timeseries {
    fn id(&self) -> BlockId {
        self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn in_routes(&self) -> &'static [&'static str] {
        IN_ROUTES
    }

    fn query_routes(&self) -> &'static [&'static str] {
        QUERY_ROUTES
    }

    fn state(&self) -> BlockState {
        if self.rule.is_some() && self.window.is_some() {
            BlockState::Configured
        } else {
            BlockState::Uninitialized
        }
    }

    async fn on_message(&mut self, route: &'static str, msg: Value, out: &Outbound) -> Result<()> {
        match route {
            "rule" => self.apply_rule(&msg),
            "in" => self.ingest(&msg),
            "poll" => {
                let snapshot = serde_json::to_value(self.poll_snapshot())?;
                out.emit(snapshot).await
            }
            other => Err(BlockError::UnknownRoute(other.to_string())),
        }
    }

    fn on_query(&mut self, route: &'static str) -> Result<Value> {
        let response = match route {
            "rule" => serde_json::to_value(self.rule_response())?,
            "state" | "timeseries" => serde_json::to_value(self.state_response())?,
            "spectrum" | "fft" => serde_json::to_value(self.spectrum_response())?,
            other => return Err(BlockError::UnknownRoute(other.to_string())),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use serde_json::json;

    fn block() -> Timeseries {
        Timeseries::new(&IdAllocator::new()).with_clock(FixedClock(1_700_000_000.0))
    }

    #[test]
    fn test_unconfigured_block() {
        let mut ts = block();
        assert_eq!(ts.state(), BlockState::Uninitialized);

        ts.ingest(&json!({"value": 1})).unwrap();
        assert!(ts.window().is_none());
        assert!(ts.state_response().timeseries.values.is_empty());
        assert!(ts.spectrum_response().fft.is_empty());
        assert!(ts.poll_snapshot().timeseries.is_empty());
        assert_eq!(ts.rule_response().num_samples, 0);
        assert_eq!(ts.rule_response().path, "");
    }

    #[test]
    fn test_rule_then_data() {
        let mut ts = block();
        ts.apply_rule(&json!({"Path": "value", "NumSamples": 3})).unwrap();
        assert_eq!(ts.state(), BlockState::Configured);

        for v in 1..=4 {
            ts.ingest(&json!({ "value": v })).unwrap();
        }

        let values: Vec<f64> = ts.state_response().timeseries.values.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert!(ts
            .state_response()
            .timeseries
            .values
            .iter()
            .all(|s| s.timestamp == 1_700_000_000.0));
    }

    #[test]
    fn test_failed_rule_keeps_previous_state() {
        let mut ts = block();
        ts.apply_rule(&json!({"Path": ".v", "NumSamples": 2})).unwrap();
        ts.ingest(&json!({"v": 5})).unwrap();
        let before = ts.state_response();

        assert!(ts.apply_rule(&json!({"NumSamples": 9})).is_err());
        assert!(ts.apply_rule(&json!({"Path": ".w"})).is_err());
        assert!(ts.apply_rule(&json!("not a rule")).is_err());

        assert_eq!(ts.state_response(), before);
        assert_eq!(ts.rule().unwrap().path(), ".v");
    }

    #[test]
    fn test_bad_data_leaves_window_untouched() {
        let mut ts = block();
        ts.apply_rule(&json!({"Path": ".v", "NumSamples": 2})).unwrap();
        ts.ingest(&json!({"v": 5})).unwrap();
        let before = ts.state_response();

        assert!(matches!(ts.ingest(&json!({"w": 1})), Err(BlockError::Eval(_))));
        assert!(matches!(
            ts.ingest(&json!({"v": "7"})),
            Err(BlockError::UnsupportedValue { .. })
        ));
        assert_eq!(ts.state_response(), before);
    }

    #[test]
    fn test_reconfigure_resets_window() {
        let mut ts = block();
        ts.apply_rule(&json!({"Path": "v", "NumSamples": 2})).unwrap();
        ts.ingest(&json!({"v": 5})).unwrap();

        ts.apply_rule(&json!({"Path": "v", "NumSamples": 4})).unwrap();
        let samples = ts.state_response().timeseries.values;
        assert_eq!(samples, vec![Sample::default(); 4]);
    }

    #[test]
    fn test_query_routes() {
        let mut ts = block();
        ts.apply_rule(&json!({"Path": "v", "NumSamples": 2})).unwrap();

        assert_eq!(ts.on_query("rule").unwrap(), json!({"Path": "v", "NumSamples": 2}));
        assert_eq!(ts.on_query("fft").unwrap(), json!({"fft": [[0.0, 0.0], [0.0, 0.0]]}));
        assert_eq!(ts.on_query("state").unwrap(), ts.on_query("timeseries").unwrap());
        assert_eq!(ts.on_query("spectrum").unwrap(), ts.on_query("fft").unwrap());
    }
}
