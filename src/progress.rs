//! Progress estimation for long-running analysis calls.
//!
//! The remote service gives no byte-level progress, so the percentage shown to
//! the user is estimated. [`ProgressEstimator::track`] drives a future to
//! completion while emitting strictly increasing values that end at exactly 100.

use std::future::Future;
use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

pub const COMPLETE: f32 = 100.0;

const STAGED_START: f32 = 10.0;
const STAGED_PREPARED: f32 = 20.0;
const STAGED_STEP: f32 = 5.0;
const STAGED_UPLOAD_CEILING: f32 = 70.0;
const STAGED_RESPONDED: f32 = 75.0;
const STAGED_DECODED: f32 = 90.0;

const RANDOM_MAX_STEP: f32 = 5.0;

const STAGED_TICK: Duration = Duration::from_millis(500);
const RANDOM_TICK: Duration = Duration::from_millis(300);
const RANDOM_SETTLE: Duration = Duration::from_secs(1);

/// Phase boundaries of a remote call, reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request body is built and about to be sent
    Prepared,
    /// The service answered
    Responded,
    /// The answer was decoded
    Decoded,
}

/// Sending half handed to a client so it can announce phase boundaries.
#[derive(Debug, Clone)]
pub struct PhaseReporter {
    tx: Option<UnboundedSender<Phase>>,
}

impl PhaseReporter {
    /// A connected reporter and the receiver to pass to [`ProgressEstimator::track`].
    pub fn channel() -> (Self, UnboundedReceiver<Phase>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter nobody listens to.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, phase: Phase) {
        if let Some(tx) = &self.tx {
            // The estimator may already be gone
            let _ = tx.send(phase);
        }
    }
}

/// Which estimation strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPolicy {
    /// Fixed checkpoints tied to reported phases
    #[default]
    Staged,
    /// Random increments on a timer, phases ignored
    Randomized,
}

enum Strategy {
    Staged { uploading: bool },
    Randomized { rng: StdRng, settle: Duration },
}

pub struct ProgressEstimator {
    strategy: Strategy,
    tick: Duration,
    current: f32,
}

impl ProgressEstimator {
    pub fn new(policy: ProgressPolicy) -> Self {
        match policy {
            ProgressPolicy::Staged => Self::staged(),
            ProgressPolicy::Randomized => Self::randomized(),
        }
    }

    pub fn staged() -> Self {
        Self {
            strategy: Strategy::Staged { uploading: false },
            tick: STAGED_TICK,
            current: 0.0,
        }
    }

    pub fn randomized() -> Self {
        Self {
            strategy: Strategy::Randomized {
                rng: StdRng::from_entropy(),
                settle: RANDOM_SETTLE,
            },
            tick: RANDOM_TICK,
            current: 0.0,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    /// Replaces the random source with a seeded one. No effect on the staged policy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        if let Strategy::Randomized { rng, .. } = &mut self.strategy {
            *rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    pub fn policy(&self) -> ProgressPolicy {
        match self.strategy {
            Strategy::Staged { .. } => ProgressPolicy::Staged,
            Strategy::Randomized { .. } => ProgressPolicy::Randomized,
        }
    }

    /// Drives `work` to completion, calling `emit` with each new progress value.
    ///
    /// Values passed to `emit` strictly increase and the last one is always
    /// [`COMPLETE`]. Returns whatever `work` produced.
    pub async fn track<F, T>(
        mut self,
        work: F,
        mut phases: UnboundedReceiver<Phase>,
        mut emit: impl FnMut(f32),
    ) -> T
    where
        F: Future<Output = T>,
    {
        if let Strategy::Staged { .. } = self.strategy {
            self.advance(STAGED_START, &mut emit);
        }

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut phases_open = true;

        tokio::pin!(work);
        let output = loop {
            tokio::select! {
                out = &mut work => break out,
                phase = phases.recv(), if phases_open => match phase {
                    Some(phase) => self.on_phase(phase, &mut emit),
                    None => phases_open = false,
                },
                _ = ticker.tick() => self.on_tick(&mut emit),
            }
        };

        // Phases sent just before the work finished
        while let Ok(phase) = phases.try_recv() {
            self.on_phase(phase, &mut emit);
        }

        match self.strategy {
            Strategy::Staged { .. } => self.advance(COMPLETE, &mut emit),
            Strategy::Randomized { settle, .. } => {
                while self.current < COMPLETE {
                    ticker.tick().await;
                    self.on_tick(&mut emit);
                }
                sleep(settle).await;
            }
        }
        output
    }

    fn on_phase(&mut self, phase: Phase, emit: &mut impl FnMut(f32)) {
        let Strategy::Staged { uploading } = &mut self.strategy else {
            return;
        };
        let target = match phase {
            Phase::Prepared => {
                *uploading = true;
                STAGED_PREPARED
            }
            Phase::Responded => {
                *uploading = false;
                STAGED_RESPONDED
            }
            Phase::Decoded => {
                *uploading = false;
                STAGED_DECODED
            }
        };
        self.advance(target, emit);
    }

    fn on_tick(&mut self, emit: &mut impl FnMut(f32)) {
        let target = match &mut self.strategy {
            Strategy::Staged { uploading: true } if self.current < STAGED_UPLOAD_CEILING => {
                (self.current + STAGED_STEP).min(STAGED_UPLOAD_CEILING)
            }
            Strategy::Staged { .. } => return,
            Strategy::Randomized { rng, .. } => {
                self.current + rng.gen_range(0.0..RANDOM_MAX_STEP)
            }
        };
        self.advance(target, emit);
    }

    fn advance(&mut self, target: f32, emit: &mut impl FnMut(f32)) {
        let target = target.clamp(0.0, COMPLETE);
        if target > self.current {
            self.current = target;
            emit(target);
        }
    }
}
