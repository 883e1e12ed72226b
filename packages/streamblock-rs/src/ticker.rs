// Ticker block: emits {"t": <RFC 3339 time>} on its outbound port every period

use crate::block::{Block, Outbound};
use crate::error::{BlockError, Result};
use crate::ids::{BlockId, IdAllocator};
use crate::types::BlockState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const KIND: &str = "ticker";

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

pub struct Ticker {
    id: BlockId,
    interval: Duration,
    ticks: u64,
}

impl Ticker {
    pub fn new(ids: &IdAllocator) -> Self {
        Self::with_interval(ids, DEFAULT_INTERVAL)
    }

    pub fn with_interval(ids: &IdAllocator, interval: Duration) -> Self {
        Self {
            id: ids.next_id(),
            interval,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick_message(&self) -> Value {
        json!({ "t": chrono::Utc::now().to_rfc3339() })
    }
}

#[async_trait]
impl Block for Ticker {
    fn id(&self) -> BlockId {
        self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn in_routes(&self) -> &'static [&'static str] {
        &[]
    }

    fn query_routes(&self) -> &'static [&'static str] {
        &[]
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.interval)
    }

    fn state(&self) -> BlockState {
        BlockState::Configured
    }

    async fn on_message(&mut self, route: &'static str, _msg: Value, _out: &Outbound) -> Result<()> {
        Err(BlockError::UnknownRoute(route.to_string()))
    }

    fn on_query(&mut self, route: &'static str) -> Result<Value> {
        Err(BlockError::UnknownRoute(route.to_string()))
    }

    async fn on_tick(&mut self, out: &Outbound) -> Result<()> {
        self.ticks += 1;
        log::debug!("{} {} tick {}", KIND, self.id, self.ticks);
        out.emit(self.tick_message()).await
    }
}
