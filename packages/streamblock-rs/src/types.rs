use serde::{Deserialize, Serialize};

/// One timestamped reading held by a window.
///
/// Serialized with capitalized keys, which is the shape of the state query
/// response (`{"Timestamp": .., "Value": ..}`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sample {
    /// Unix time in seconds
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One frequency-domain bin of a spectrum query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumBin {
    pub real: f64,
    pub imag: f64,
}

impl SpectrumBin {
    pub fn as_pair(&self) -> [f64; 2] {
        [self.real, self.imag]
    }
}

/// Lifecycle of a block as seen from outside.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BlockState {
    /// No rule applied yet
    Uninitialized,

    /// Rule applied and window allocated
    Configured,

    /// Termination signal received, loop exited
    Terminated,
}

impl Default for BlockState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Reply to a `rule` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResponse {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "NumSamples")]
    pub num_samples: usize,
}

/// Window contents as returned by the `state`/`timeseries` query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowValues {
    #[serde(rename = "Values")]
    pub values: Vec<Sample>,
}

/// Reply to a `state`/`timeseries` query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateResponse {
    pub timeseries: WindowValues,
}

/// Reply to a `spectrum`/`fft` query: one `[real, imag]` pair per sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumResponse {
    pub fft: Vec<[f64; 2]>,
}

/// A single point of a poll snapshot (lowercase keys on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPoint {
    pub timestamp: f64,
    pub value: f64,
}

impl From<&Sample> for SnapshotPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            value: sample.value,
        }
    }
}

/// Message pushed onto the outbound port for every poll trigger.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub timeseries: Vec<SnapshotPoint>,
}
