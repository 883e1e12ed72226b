// Block driver: named ports, one event loop per block
//
// Every inbound route and every query route of a block feeds a single bounded
// queue, so events are serviced strictly in arrival order, one per loop
// iteration. Quit cancels a token: the queue stops accepting, every event it
// already holds is still serviced, then the loop exits. The block's state is
// only ever touched from inside the loop task, so blocks need no locks.
//
// Ports:
// - in routes: one-way JSON messages (`InRoute`)
// - query routes: request/response over a oneshot responder (`QueryRoute`)
// - outbound: bounded channel governed by `OverflowStrategy`
// - faults: every error a block reports, also logged

use crate::error::{BlockError, Result};
use crate::ids::BlockId;
use crate::settings::{BlockSettings, OverflowStrategy};
use crate::types::BlockState;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Behaviour plugged into the driver.
///
/// Route names handed to the callbacks are always members of
/// [`Block::in_routes`] / [`Block::query_routes`]; unknown names are rejected
/// when a route is looked up and never reach the loop.
#[async_trait]
pub trait Block: Send + 'static {
    fn id(&self) -> BlockId;

    /// Short type name, e.g. `"timeseries"`
    fn kind(&self) -> &'static str;

    fn in_routes(&self) -> &'static [&'static str];

    fn query_routes(&self) -> &'static [&'static str];

    /// Period of the built-in timer, if the block wants one
    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    fn state(&self) -> BlockState;

    /// Handle a one-way message
    async fn on_message(&mut self, route: &'static str, msg: Value, out: &Outbound) -> Result<()>;

    /// Answer a query; must not mutate observable state
    fn on_query(&mut self, route: &'static str) -> Result<Value>;

    async fn on_tick(&mut self, _out: &Outbound) -> Result<()> {
        Ok(())
    }
}

/// Error reported by a block while servicing an event
#[derive(Debug)]
pub struct BlockFault {
    pub block_id: BlockId,
    pub kind: &'static str,
    pub route: Option<&'static str>,
    pub error: BlockError,
}

impl std::fmt::Display for BlockFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.route {
            Some(route) => write!(f, "[{} {} @{}] {}", self.kind, self.block_id, route, self.error),
            None => write!(f, "[{} {}] {}", self.kind, self.block_id, self.error),
        }
    }
}

/// Sending side of the outbound port
pub struct Outbound {
    tx: mpsc::Sender<Value>,
    overflow: OverflowStrategy,
    cancel: CancellationToken,
}

impl Outbound {
    /// Under `Block`, a send parked on a full channel gives up with
    /// `Terminated` once the block has been told to quit.
    pub async fn emit(&self, msg: Value) -> Result<()> {
        match self.overflow {
            OverflowStrategy::Block => tokio::select! {
                biased;

                sent = self.tx.send(msg) => sent.map_err(|_| BlockError::ChannelClosed),
                _ = self.cancel.cancelled() => Err(BlockError::Terminated),
            },
            OverflowStrategy::DropNewest => self.tx.try_send(msg).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BlockError::OutboundFull,
                mpsc::error::TrySendError::Closed(_) => BlockError::ChannelClosed,
            }),
        }
    }

    pub fn overflow(&self) -> OverflowStrategy {
        self.overflow
    }
}

enum Envelope {
    Message {
        route: &'static str,
        msg: Value,
    },
    Query {
        route: &'static str,
        respond: oneshot::Sender<Result<Value>>,
    },
}

/// Receiving ends handed to whoever wires the block into a graph
pub struct BlockOutputs {
    pub outbound: mpsc::Receiver<Value>,
    pub faults: mpsc::UnboundedReceiver<BlockFault>,
    pub task: JoinHandle<()>,
}

/// Cloneable handle exposing a block's named ports
#[derive(Clone)]
pub struct BlockHandle {
    id: BlockId,
    kind: &'static str,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
    in_routes: &'static [&'static str],
    query_routes: &'static [&'static str],
    query_timeout: Option<Duration>,
    state: watch::Receiver<BlockState>,
}

impl BlockHandle {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn in_routes(&self) -> &'static [&'static str] {
        self.in_routes
    }

    pub fn query_routes(&self) -> &'static [&'static str] {
        self.query_routes
    }

    /// Look up a one-way inbound route by name
    pub fn in_route(&self, name: &str) -> Result<InRoute> {
        let route = lookup(self.in_routes, name)?;
        Ok(InRoute {
            route,
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        })
    }

    /// Look up a query route by name
    pub fn query_route(&self, name: &str) -> Result<QueryRoute> {
        let route = lookup(self.query_routes, name)?;
        Ok(QueryRoute {
            route,
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            timeout: self.query_timeout,
        })
    }

    pub async fn send(&self, route: &str, msg: Value) -> Result<()> {
        self.in_route(route)?.send(msg).await
    }

    pub async fn query(&self, route: &str) -> Result<Value> {
        self.query_route(route)?.request().await
    }

    /// Signal termination.
    ///
    /// Sends and queries issued afterwards fail with `Terminated`. Events the
    /// queue accepted before the signal are still serviced in order.
    pub fn quit(&self) {
        self.cancel.cancel();
    }

    /// Lifecycle state as of the last serviced event
    pub fn state(&self) -> BlockState {
        *self.state.borrow()
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

fn lookup(routes: &'static [&'static str], name: &str) -> Result<&'static str> {
    routes
        .iter()
        .copied()
        .find(|r| *r == name)
        .ok_or_else(|| BlockError::UnknownRoute(name.to_string()))
}

#[derive(Clone)]
pub struct InRoute {
    route: &'static str,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
}

impl InRoute {
    pub fn name(&self) -> &'static str {
        self.route
    }

    /// Enqueue a message; waits while the block's queue is full
    pub async fn send(&self, msg: Value) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(BlockError::Terminated);
        }
        self.tx
            .send(Envelope::Message {
                route: self.route,
                msg,
            })
            .await
            .map_err(|_| BlockError::Terminated)
    }
}

#[derive(Clone)]
pub struct QueryRoute {
    route: &'static str,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl QueryRoute {
    pub fn name(&self) -> &'static str {
        self.route
    }

    /// Round trip through the block's loop.
    ///
    /// Fails with `Terminated` if the block quits before answering, and with
    /// `Timeout` if a query timeout is configured and expires first. A timed
    /// out request stays queued; its eventual answer is discarded.
    pub async fn request(&self) -> Result<Value> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip())
                .await
                .map_err(|_| {
                    BlockError::Timeout(format!(
                        "query '{}' not answered within {:?}",
                        self.route, limit
                    ))
                })?,
            None => self.round_trip().await,
        }
    }

    async fn round_trip(&self) -> Result<Value> {
        if self.cancel.is_cancelled() {
            return Err(BlockError::Terminated);
        }

        let (respond, response) = oneshot::channel();
        self.tx
            .send(Envelope::Query {
                route: self.route,
                respond,
            })
            .await
            .map_err(|_| BlockError::Terminated)?;

        response.await.map_err(|_| BlockError::Terminated)?
    }
}

/// Spawn `block` on the current tokio runtime
pub fn spawn_block<B: Block>(block: B, settings: &BlockSettings) -> (BlockHandle, BlockOutputs) {
    let (tx, inbox) = mpsc::channel(settings.queue_capacity.max(1));
    let (out_tx, outbound) = mpsc::channel(settings.outbound_capacity.max(1));
    let (fault_tx, faults) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let (state_tx, state) = watch::channel(block.state());

    let handle = BlockHandle {
        id: block.id(),
        kind: block.kind(),
        tx,
        cancel: cancel.clone(),
        in_routes: block.in_routes(),
        query_routes: block.query_routes(),
        query_timeout: settings.query_timeout(),
        state,
    };

    let out = Outbound {
        tx: out_tx,
        overflow: settings.overflow,
        cancel: cancel.clone(),
    };

    let task = tokio::spawn(run_block(block, inbox, cancel, out, fault_tx, state_tx));

    (
        handle,
        BlockOutputs {
            outbound,
            faults,
            task,
        },
    )
}

async fn run_block<B: Block>(
    mut block: B,
    mut inbox: mpsc::Receiver<Envelope>,
    cancel: CancellationToken,
    out: Outbound,
    faults: mpsc::UnboundedSender<BlockFault>,
    state: watch::Sender<BlockState>,
) {
    let id = block.id();
    let kind = block.kind();
    log::info!("Starting {} block {}", kind, id);

    // First tick fires one full period after start
    let mut timer = block.tick_interval().map(|period| {
        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    });

    let report = |route: Option<&'static str>, error: BlockError| {
        let fault = BlockFault {
            block_id: id,
            kind,
            route,
            error,
        };
        log::warn!("{}", fault);
        // Nobody listening for faults is fine; the log line above remains
        let _ = faults.send(fault);
    };

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                log::info!("{} block {} received quit", kind, id);
                break;
            }

            envelope = inbox.recv() => {
                match envelope {
                    Some(envelope) => service(&mut block, envelope, &out, &report).await,
                    None => {
                        log::info!("All handles to {} block {} dropped", kind, id);
                        break;
                    }
                }
            }

            _ = next_tick(&mut timer) => {
                if let Err(e) = block.on_tick(&out).await {
                    report(None, e);
                }
            }
        }
        state.send_replace(block.state());
    }

    // Closing wakes senders still waiting for queue space with `Terminated`;
    // what the queue already holds was accepted before quit and is serviced.
    inbox.close();
    let mut drained = 0usize;
    while let Some(envelope) = inbox.recv().await {
        service(&mut block, envelope, &out, &report).await;
        drained += 1;
    }
    if drained > 0 {
        log::debug!("{} {} serviced {} queued events after quit", kind, id, drained);
    }

    log::info!("{} block {} stopped (state: {:?})", kind, id, block.state());
    state.send_replace(BlockState::Terminated);
}

async fn service<B: Block>(
    block: &mut B,
    envelope: Envelope,
    out: &Outbound,
    report: &impl Fn(Option<&'static str>, BlockError),
) {
    let kind = block.kind();
    let id = block.id();
    match envelope {
        Envelope::Message { route, msg } => {
            log::debug!("{} {} <- {}", kind, id, route);
            if let Err(e) = block.on_message(route, msg, out).await {
                report(Some(route), e);
            }
        }
        Envelope::Query { route, respond } => {
            log::debug!("{} {} query {}", kind, id, route);
            let reply = match block.on_query(route) {
                Ok(value) => Ok(value),
                Err(e) => {
                    let message = e.to_string();
                    report(Some(route), e);
                    Err(BlockError::Eval(message))
                }
            };
            if respond.send(reply).is_err() {
                log::debug!("{} {} query {} abandoned by caller", kind, id, route);
            }
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
