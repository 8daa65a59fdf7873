//! Route Actor
//!
//! This module provides an async actor that owns the switch gateway. All
//! device traffic flows through this single task, which keeps command
//! handling serialized and the store consistent with what the controller
//! last reported.
//!
//! The actor receives commands through a channel and emits events through
//! another. Callers get per-command results over oneshot channels; passive
//! observers watch the event stream and only ever see reconciled state.
//!
//! A set command never updates the store directly. After the controller
//! acks, the actor forces an out-of-cycle status read and stores whatever
//! the controller reports, which may differ from what was requested.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use coax_route::{actor, RouteConfig, SwitchGateway, DEFAULT_BAUD};
//!
//! let gateway = SwitchGateway::connect("/dev/ttyACM0", DEFAULT_BAUD, Duration::from_millis(200))?;
//! let (handle, mut events, _task) = actor::start(gateway, RouteConfig::default());
//!
//! // Issue commands through `handle`, watch `events` for state changes.
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use coax_protocol::{SwitchId, SwitchPosition};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::classify::{compute_path, PathResult};
use crate::error::{DeviceError, RouteError};
use crate::events::RouteEvent;
use crate::gateway::SwitchGateway;
use crate::store::{StoreView, SwitchStore};

/// Tuning for the route actor
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// How often the actor polls the controller for its positions.
    /// Also bounds each device exchange: a poll or set that takes longer
    /// than one interval is treated as a dead device.
    pub poll_interval: Duration,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Commands sent to the route actor
#[derive(Debug)]
pub enum RouteCommand {
    /// Move one relay, then reconcile by re-reading the controller
    SetSwitch {
        /// Which relay to move
        id: SwitchId,
        /// Target position
        position: SwitchPosition,
        /// Channel to send back the result
        respond: oneshot::Sender<Result<(), DeviceError>>,
    },

    /// Force an immediate status read outside the poll cycle
    Refresh {
        /// Channel to send back the reconciled view
        respond: oneshot::Sender<StoreView>,
    },

    /// Read the current view and path analysis without touching the device
    Query {
        /// Channel to send back the view and its path analysis
        respond: oneshot::Sender<(StoreView, PathResult)>,
    },

    /// Shutdown the actor
    Shutdown,
}

/// Switches with a set command in flight
///
/// Shared between the handle and the actor so a second set for the same
/// relay is rejected before it enters the queue.
#[derive(Debug, Clone, Default)]
pub struct PendingSets(Arc<Mutex<HashSet<SwitchId>>>);

impl PendingSets {
    /// Mark `id` pending. Returns false if it already was.
    fn begin(&self, id: SwitchId) -> bool {
        self.0.lock().unwrap().insert(id)
    }

    fn clear(&self, id: SwitchId) {
        self.0.lock().unwrap().remove(&id);
    }
}

/// Caller-side handle to the route actor
#[derive(Debug, Clone)]
pub struct RouteHandle {
    cmd_tx: mpsc::Sender<RouteCommand>,
    pending: PendingSets,
}

impl RouteHandle {
    /// Request a relay move and wait for the reconciled outcome
    ///
    /// Returns [`RouteError::ConflictingCommand`] if a set for the same
    /// relay is already in flight. Commands for different relays queue
    /// behind each other in the actor.
    pub async fn set_switch(
        &self,
        id: SwitchId,
        position: SwitchPosition,
    ) -> Result<(), RouteError> {
        if !self.pending.begin(id) {
            return Err(RouteError::ConflictingCommand(id));
        }

        let (respond, result) = oneshot::channel();
        if self
            .cmd_tx
            .send(RouteCommand::SetSwitch {
                id,
                position,
                respond,
            })
            .await
            .is_err()
        {
            self.pending.clear(id);
            return Err(RouteError::ActorGone);
        }

        match result.await {
            Ok(outcome) => outcome.map_err(RouteError::from),
            Err(_) => {
                self.pending.clear(id);
                Err(RouteError::ActorGone)
            }
        }
    }

    /// Force a status read now and return the resulting view
    pub async fn refresh(&self) -> Result<StoreView, RouteError> {
        let (respond, result) = oneshot::channel();
        self.cmd_tx
            .send(RouteCommand::Refresh { respond })
            .await
            .map_err(|_| RouteError::ActorGone)?;
        result.await.map_err(|_| RouteError::ActorGone)
    }

    /// Current view and path analysis, without any device traffic
    pub async fn query(&self) -> Result<(StoreView, PathResult), RouteError> {
        let (respond, result) = oneshot::channel();
        self.cmd_tx
            .send(RouteCommand::Query { respond })
            .await
            .map_err(|_| RouteError::ActorGone)?;
        result.await.map_err(|_| RouteError::ActorGone)
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RouteCommand::Shutdown).await;
    }
}

/// Spawn the route actor over a gateway
///
/// Returns the command handle, the event stream, and the actor task.
pub fn start<T>(
    gateway: SwitchGateway<T>,
    config: RouteConfig,
) -> (
    RouteHandle,
    mpsc::Receiver<RouteEvent>,
    tokio::task::JoinHandle<()>,
)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);
    let pending = PendingSets::default();

    let handle = RouteHandle {
        cmd_tx,
        pending: pending.clone(),
    };
    let task = tokio::spawn(run_route_actor(gateway, config, cmd_rx, event_tx, pending));

    (handle, event_rx, task)
}

/// Run the route actor
///
/// Polls the controller on the configured interval and processes commands
/// between ticks. Every store change goes out as a single
/// [`RouteEvent::StateChanged`] with the view and its path analysis.
pub async fn run_route_actor<T>(
    mut gateway: SwitchGateway<T>,
    config: RouteConfig,
    mut cmd_rx: mpsc::Receiver<RouteCommand>,
    event_tx: mpsc::Sender<RouteEvent>,
    pending: PendingSets,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut store = SwitchStore::new();
    info!("Route actor started");

    let mut poll_timer = interval(config.poll_interval);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    RouteCommand::SetSwitch { id, position, respond } => {
                        let outcome =
                            handle_set(&mut gateway, &config, &mut store, &event_tx, id, position)
                                .await;
                        pending.clear(id);
                        let _ = respond.send(outcome);
                    }

                    RouteCommand::Refresh { respond } => {
                        poll_once(&mut gateway, &config, &mut store, &event_tx).await;
                        let _ = respond.send(store.current());
                    }

                    RouteCommand::Query { respond } => {
                        let view = store.current();
                        let _ = respond.send((view, compute_path(&view)));
                    }

                    RouteCommand::Shutdown => {
                        info!("Route actor shutting down");
                        break;
                    }
                }
            }
            _ = poll_timer.tick() => {
                poll_once(&mut gateway, &config, &mut store, &event_tx).await;
            }
        }
    }

    let _ = event_tx.send(RouteEvent::Stopped).await;
    info!("Route actor stopped");
}

/// Read the controller once and reconcile the store
///
/// Any failure, including a read that outlives one poll interval, marks
/// the store disconnected.
async fn poll_once<T>(
    gateway: &mut SwitchGateway<T>,
    config: &RouteConfig,
    store: &mut SwitchStore,
    event_tx: &mpsc::Sender<RouteEvent>,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let view = match timeout(config.poll_interval, gateway.read_all()).await {
        Ok(Ok(snapshot)) => {
            if store.apply_snapshot(&snapshot) {
                notify(store, event_tx).await;
            }
            return;
        }
        Ok(Err(e)) => {
            warn!("Status read failed: {}", e);
            StoreView::Disconnected
        }
        Err(_) => {
            warn!("Status read timed out after {:?}", config.poll_interval);
            StoreView::Disconnected
        }
    };

    if store.apply(view) {
        notify(store, event_tx).await;
    }
}

/// Execute a set command and reconcile afterwards
///
/// The flow is send, ack, forced re-read. The store takes the re-read
/// result, never the requested position. Any device error along the way
/// drops the store to disconnected before the error goes back to the
/// caller; the periodic poll recovers the state once the device answers
/// again.
async fn handle_set<T>(
    gateway: &mut SwitchGateway<T>,
    config: &RouteConfig,
    store: &mut SwitchStore,
    event_tx: &mpsc::Sender<RouteEvent>,
    id: SwitchId,
    position: SwitchPosition,
) -> Result<(), DeviceError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    debug!("Setting {} to {}", id, position);

    let set_result = match timeout(config.poll_interval, gateway.set_switch(id, position)).await {
        Ok(result) => result,
        Err(_) => Err(DeviceError::Unreachable(format!(
            "set timed out after {:?}",
            config.poll_interval
        ))),
    };

    if let Err(e) = set_result {
        warn!("Set {} -> {} failed: {}", id, position, e);
        if store.apply(StoreView::Disconnected) {
            notify(store, event_tx).await;
        }
        return Err(e);
    }

    // Reconcile immediately rather than waiting for the next poll tick
    match timeout(config.poll_interval, gateway.read_all()).await {
        Ok(Ok(snapshot)) => {
            if store.apply_snapshot(&snapshot) {
                notify(store, event_tx).await;
            }
            Ok(())
        }
        Ok(Err(e)) => {
            warn!("Post-set read failed: {}", e);
            if store.apply(StoreView::Disconnected) {
                notify(store, event_tx).await;
            }
            Err(e)
        }
        Err(_) => {
            let e = DeviceError::Unreachable(format!(
                "post-set read timed out after {:?}",
                config.poll_interval
            ));
            warn!("{}", e);
            if store.apply(StoreView::Disconnected) {
                notify(store, event_tx).await;
            }
            Err(e)
        }
    }
}

async fn notify(store: &SwitchStore, event_tx: &mpsc::Sender<RouteEvent>) {
    let view = store.current();
    let _ = event_tx
        .send(RouteEvent::StateChanged {
            view,
            path: compute_path(&view),
        })
        .await;
}
