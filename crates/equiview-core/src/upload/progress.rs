//! Cosmetic post-upload progress animation
//!
//! The transfer has already finished when this starts; the bar only tells the
//! user the server is still processing. It is a separate state machine
//! (idle → animating → settled) so it is never mistaken for real transfer
//! progress.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

/// Time between animation steps
pub const TICK: Duration = Duration::from_millis(100);

/// Upper bound (exclusive) of one random step, in percent
pub const MAX_STEP: f64 = 15.0;

/// The animation never goes past this value
pub const CEILING: f64 = 90.0;

/// Delay before a failed upload's bar is cleared
pub const FAILURE_RESET_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Idle,
    Animating,
    Settled,
}

/// Displayed progress and the phase that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub percent: f64,
    pub phase: AnimationPhase,
}

impl ProgressState {
    const IDLE: ProgressState = ProgressState {
        percent: 0.0,
        phase: AnimationPhase::Idle,
    };

    /// Whole-percent label, e.g. "42% Complete"
    pub fn label(&self) -> String {
        format!("{}% Complete", self.percent.floor() as u32)
    }
}

/// Timer-driven progress animation that can be cancelled at any point
///
/// At most one timer task exists; starting, resetting or cancelling aborts
/// the previous one, and dropping the animation aborts it too.
pub struct ProgressAnimation {
    state: watch::Sender<ProgressState>,
    task: Mutex<Option<JoinHandle<()>>>,
    seed: Option<u64>,
}

impl ProgressAnimation {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Animation with a reproducible sequence of steps
    pub fn with_seed(seed: u64) -> Self {
        Self::build(Some(seed))
    }

    fn build(seed: Option<u64>) -> Self {
        let (state, _) = watch::channel(ProgressState::IDLE);
        Self {
            state,
            task: Mutex::new(None),
            seed,
        }
    }

    pub fn current(&self) -> ProgressState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }

    /// Begin animating from 0 towards the ceiling
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.abort_task();
        self.state.send_replace(ProgressState {
            percent: 0.0,
            phase: AnimationPhase::Animating,
        });

        let state = self.state.clone();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            let mut progress = 0.0_f64;
            loop {
                ticker.tick().await;
                progress += rng.gen_range(0.0..MAX_STEP);
                let settled = progress >= CEILING;
                state.send_replace(ProgressState {
                    percent: progress.min(CEILING),
                    phase: if settled {
                        AnimationPhase::Settled
                    } else {
                        AnimationPhase::Animating
                    },
                });
                if settled {
                    tracing::debug!("Progress animation settled");
                    break;
                }
            }
        });
        self.replace_task(Some(handle));
    }

    /// Clear the bar after a delay, unless something else starts first
    pub fn reset_after(&self, delay: Duration) {
        self.abort_task();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            state.send_replace(ProgressState::IDLE);
        });
        self.replace_task(Some(handle));
    }

    /// Stop any timer and return to idle at 0
    pub fn cancel(&self) {
        self.abort_task();
        self.state.send_replace(ProgressState::IDLE);
    }

    fn abort_task(&self) {
        if let Some(handle) = self.replace_task(None) {
            handle.abort();
        }
    }

    fn replace_task(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *task, handle)
    }
}

impl Default for ProgressAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressAnimation {
    fn drop(&mut self) {
        self.abort_task();
    }
}
