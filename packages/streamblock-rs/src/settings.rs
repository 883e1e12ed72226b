// Runtime settings shared by every block spawned through the driver

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy for the outbound port when its buffer is full
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Wait for the consumer. Stalls the whole event loop until space frees up.
    Block,

    /// Drop the message being sent and report `OutboundFull`
    DropNewest,
}

impl Default for OverflowStrategy {
    fn default() -> Self {
        Self::DropNewest
    }
}

impl std::str::FromStr for OverflowStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "block" => Ok(Self::Block),
            "drop_newest" => Ok(Self::DropNewest),
            other => Err(format!(
                "unknown overflow strategy '{}': expected 'block' or 'drop-newest'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlockSettings {
    /// Capacity of the merged inbound/query queue
    pub queue_capacity: usize,

    /// Capacity of the outbound port
    pub outbound_capacity: usize,

    pub overflow: OverflowStrategy,

    /// Upper bound on a query round trip; `None` waits until the block answers
    /// or terminates
    pub query_timeout_ms: Option<u64>,

    /// Largest window a rule may request
    pub max_window: usize,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            outbound_capacity: 16,
            overflow: OverflowStrategy::default(),
            query_timeout_ms: None,
            max_window: 1 << 20,
        }
    }
}

impl BlockSettings {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}
