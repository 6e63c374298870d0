//! Async driver for one engine.
//!
//! DESIGN
//! ======
//! A single task owns the [`EngineCore`]. It waits on whichever comes first:
//! the next host input event, or the engine's next timer deadline. Events are
//! handled one at a time in arrival order, and every resulting [`Action`] is
//! forwarded to the host channel.
//!
//! Engine time is epoch milliseconds. The session pins an epoch origin to a
//! tokio [`Instant`] when it is created and derives later timestamps from the
//! monotonic clock, so deadlines follow tokio's (possibly paused) time.
//!
//! ERROR HANDLING
//! ==============
//! The loop ends when the input channel closes or the host drops the action
//! receiver. Either way the engine is torn down, which retracts this client's
//! presence entry, and handed back to the caller.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::clock;
use crate::engine::{Action, EngineCore, InputEvent};
use crate::store::BoardStore;
use crate::sync::StateContainer;
use crate::throttle::ThrottleConfig;

pub struct Session<C: StateContainer> {
    engine: EngineCore<C>,
    origin: Instant,
    origin_ms: i64,
}

impl<C: StateContainer> Session<C> {
    /// Build an engine for `store` starting at the current wall-clock time.
    pub fn start(store: BoardStore<C>, throttle_config: ThrottleConfig) -> Self {
        let now = clock::now_ms();
        Self::new(EngineCore::new(store, throttle_config, now), now)
    }

    /// Drive an existing engine whose clock currently reads `origin_ms`.
    pub fn new(engine: EngineCore<C>, origin_ms: i64) -> Self {
        Self { engine, origin: Instant::now(), origin_ms }
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore<C> {
        &self.engine
    }

    /// Current engine time in epoch milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }

    fn instant_at(&self, at_ms: i64) -> Instant {
        let offset = u64::try_from(at_ms - self.origin_ms).unwrap_or(0);
        self.origin + Duration::from_millis(offset)
    }

    /// Process input until either channel closes, then tear down and return
    /// the engine.
    pub async fn run(
        mut self,
        mut input_rx: UnboundedReceiver<InputEvent>,
        action_tx: UnboundedSender<Action>,
    ) -> EngineCore<C> {
        info!(board_id = %self.engine.store().board_id(), "session started");
        loop {
            let deadline = self.engine.next_deadline().map(|ms| self.instant_at(ms));
            let actions = tokio::select! {
                maybe_event = input_rx.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("input channel closed");
                        break;
                    };
                    let now = self.now_ms();
                    self.engine.handle(event, now)
                }
                () = sleep_until(deadline) => {
                    let now = self.now_ms();
                    self.engine.tick(now)
                }
            };
            if !forward(&action_tx, actions) {
                debug!("action receiver dropped");
                break;
            }
        }

        let now = self.now_ms();
        self.engine.teardown(now);
        info!(board_id = %self.engine.store().board_id(), "session stopped");
        self.engine
    }
}

impl<C: StateContainer + Send + 'static> Session<C> {
    /// Run the session on its own task. Returns the input sender, the action
    /// receiver and a handle that resolves to the torn-down engine.
    pub fn spawn(self) -> (UnboundedSender<InputEvent>, UnboundedReceiver<Action>, JoinHandle<EngineCore<C>>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(input_rx, action_tx));
        (input_tx, action_rx, handle)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Send every action. Returns `false` once the receiver is gone.
fn forward(tx: &UnboundedSender<Action>, actions: Vec<Action>) -> bool {
    actions.into_iter().all(|action| tx.send(action).is_ok())
}
