//! Rebuild scheduling: debounce, serialization, and cancellation.
//!
//! Bursts of change events collapse into one rebuild per quiet window
//! (trailing edge: every request resets the window). At most one rebuild
//! runs at a time; a request arriving mid-flight is retained as a single
//! pending slot that runs immediately after the current one finishes.
//!
//! Cancellation uses a monotonic generation counter instead of cooperative
//! cancellation: a rebuild's result may only be applied when the generation
//! at completion still matches the generation at dispatch.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Executes one rebuild pass. Implementations check `generation` against
/// [`RebuildScheduler::generation`] before installing their result.
#[async_trait]
pub trait RebuildRunner: Send + Sync {
    async fn run_rebuild(&self, generation: u64);
}

#[derive(Debug, Default)]
struct SchedulerState {
    /// When the quiet window elapses; moved forward by every request.
    deadline: Option<Instant>,
    /// A rebuild is currently executing.
    in_flight: bool,
    /// Single-slot pending request collected while in flight.
    queued: bool,
}

struct Shared {
    quiet_window: Duration,
    notify: Notify,
    state: Mutex<SchedulerState>,
    generation: AtomicU64,
    running: RwLock<bool>,
}

pub struct RebuildScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RebuildScheduler {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                quiet_window,
                notify: Notify::new(),
                state: Mutex::new(SchedulerState::default()),
                generation: AtomicU64::new(0),
                running: RwLock::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker task. The runner is held weakly; the worker exits
    /// once the owning session is gone.
    pub fn start(&self, runner: Weak<dyn RebuildRunner>) {
        let mut running = self.shared.running.write();
        if *running {
            return;
        }
        *running = true;
        drop(running);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            Self::worker_loop(shared, runner).await;
        });
        *self.worker.lock() = Some(handle);
    }

    /// Request a rebuild. Calls within the quiet window coalesce into one
    /// execution; calls during an execution collapse into one pending slot.
    pub fn request_rebuild(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.in_flight {
                state.queued = true;
            } else {
                state.deadline = Some(Instant::now() + self.shared.quiet_window);
            }
        }
        self.shared.notify.notify_one();
        trace!("rebuild requested");
    }

    /// Current generation; results are only valid against this value.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Invalidate everything scheduled or in flight for the previous item
    /// session. Pending requests are dropped and in-flight results become
    /// unappliable. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut state = self.shared.state.lock();
        state.deadline = None;
        state.queued = false;
        debug!(generation, "scheduler invalidated");
        generation
    }

    /// Stop the worker. A rebuild in flight finishes first (its result is
    /// discarded by the generation check if `invalidate` was called).
    pub async fn stop(&self) {
        {
            let mut running = self.shared.running.write();
            if !*running {
                return;
            }
            *running = false;
        }
        self.shared.notify.notify_one();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn worker_loop(shared: Arc<Shared>, runner: Weak<dyn RebuildRunner>) {
        debug!("rebuild worker started");
        while *shared.running.read() {
            let deadline = shared.state.lock().deadline;
            let Some(deadline) = deadline else {
                shared.notify.notified().await;
                continue;
            };

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = shared.notify.notified() => {
                    // Window reset, invalidation, or shutdown; re-evaluate.
                    continue;
                }
            }

            let due = {
                let mut state = shared.state.lock();
                match state.deadline {
                    Some(current) if current <= Instant::now() => {
                        state.deadline = None;
                        state.in_flight = true;
                        true
                    }
                    _ => false,
                }
            };
            if !due {
                continue;
            }

            loop {
                let generation = shared.generation.load(Ordering::Acquire);
                let Some(runner) = runner.upgrade() else {
                    debug!("rebuild worker exiting, session dropped");
                    return;
                };
                runner.run_rebuild(generation).await;
                drop(runner);

                let again = {
                    let mut state = shared.state.lock();
                    state.in_flight = state.queued;
                    state.queued = false;
                    state.in_flight
                };
                if !again {
                    break;
                }
                debug!("running rebuild queued during execution");
            }
        }
        debug!("rebuild worker stopped");
    }
}
