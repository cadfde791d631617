//! Session clock: drives a shared [`Session`] at a fixed period and announces
//! frames and per-box hide events to any number of listeners.
//!
//! Each run is tied to the session epoch it started under. Stopping cancels the
//! tick task and bumps the epoch under the session lock, so a tick that was
//! already queued finds a stale epoch and produces nothing. Hide events that are
//! already pending still fire; they only toggle visibility.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{CellSource, StimulusFrame};
use crate::error::Result;
use crate::prng::Prng;
use crate::session::Session;
use crate::settings::Settings;

pub type SharedSession<R = Prng> = Arc<RwLock<Session<R>>>;

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum SessionEvent {
    /// A turn was produced; light `cells[b]` in every box `b`.
    Frame { turn: u64, cells: Vec<usize> },
    /// The flash of one box from turn `turn` is over.
    Hide {
        turn: u64,
        box_index: usize,
        cell: usize,
    },
    Stopped,
}

struct Run {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct SessionClock {
    events: broadcast::Sender<SessionEvent>,
    run: Option<Run>,
}

impl SessionClock {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self::with_sender(events)
    }

    pub fn with_sender(events: broadcast::Sender<SessionEvent>) -> Self {
        Self { events, run: None }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Start a session and its tick stream.
    ///
    /// Turn 0 is produced and announced before this returns; later turns follow
    /// every `intervalMs`. A previous run is replaced, never doubled. If the
    /// settings are rejected, the previous run keeps going untouched.
    pub async fn start<R>(
        &mut self,
        session: &SharedSession<R>,
        raw: Option<Settings>,
    ) -> Result<StimulusFrame>
    where
        R: CellSource + Send + Sync + 'static,
    {
        let (frame, epoch, settings) = {
            let mut s = session.write().await;
            let frame = s.start_session(raw)?.clone();
            (frame, s.epoch(), *s.engine().settings())
        };
        self.cancel_run();

        let interval = Duration::from_millis(u64::from(settings.interval_ms));
        let flash = Duration::from_millis(u64::from(settings.flash_ms));
        emit_frame(&self.events, &frame, flash);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(tick_loop(
            Arc::clone(session),
            epoch,
            interval,
            flash,
            self.events.clone(),
            cancel.clone(),
        ));
        self.run = Some(Run { cancel, task });

        info!(
            epoch,
            n = settings.n,
            boxes = frame.box_count(),
            grid_res = settings.grid_res,
            interval_ms = settings.interval_ms,
            flash_ms = settings.flash_ms,
            "session started"
        );
        Ok(frame)
    }

    /// Stop ticking. Calling it with nothing running is a no-op apart from
    /// the session's own (idempotent) stop.
    pub async fn stop<R: CellSource>(&mut self, session: &SharedSession<R>) {
        let was_running = self.run.is_some();
        self.cancel_run();

        let mut s = session.write().await;
        let was_session_running = s.is_running();
        s.stop_session();
        drop(s);

        if was_running || was_session_running {
            let _ = self.events.send(SessionEvent::Stopped);
            info!("session stopped");
        }
    }

    fn cancel_run(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
            run.task.abort();
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.cancel_run();
    }
}

async fn tick_loop<R>(
    session: SharedSession<R>,
    epoch: u64,
    interval: Duration,
    flash: Duration,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
) where
    R: CellSource + Send + Sync + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let frame = {
            let mut s = session.write().await;
            if cancel.is_cancelled() {
                break;
            }
            match s.advance(epoch) {
                Some(frame) => frame,
                None => break,
            }
        };
        emit_frame(&events, &frame, flash);
    }

    debug!(epoch, "tick loop finished");
}

fn emit_frame(events: &broadcast::Sender<SessionEvent>, frame: &StimulusFrame, flash: Duration) {
    // No listeners is fine.
    let _ = events.send(SessionEvent::Frame {
        turn: frame.turn,
        cells: frame.cells.clone(),
    });

    let events = events.clone();
    let frame = frame.clone();
    tokio::spawn(async move {
        time::sleep(flash).await;
        for (box_index, &cell) in frame.cells.iter().enumerate() {
            let _ = events.send(SessionEvent::Hide {
                turn: frame.turn,
                box_index,
                cell,
            });
        }
    });
}
