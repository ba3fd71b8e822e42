use std::time::Duration;

use tokio::time::Instant;

/// Solving time for one attempt: time carried over from earlier sessions plus
/// monotonic time elapsed since the clock was last resumed. Never derived
/// from wall-clock timestamps.
#[derive(Debug, Clone)]
pub struct DurationTracker {
    accumulated: Duration,
    resumed_at: Option<Instant>,
}

impl DurationTracker {
    /// A paused tracker carrying `accumulated_secs` from a previous session.
    pub fn new(accumulated_secs: u64) -> Self {
        Self {
            accumulated: Duration::from_secs(accumulated_secs),
            resumed_at: None,
        }
    }

    pub fn started(accumulated_secs: u64) -> Self {
        let mut tracker = Self::new(accumulated_secs);
        tracker.resume();
        tracker
    }

    pub fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    /// Fold the running interval into the accumulated total.
    pub fn pause(&mut self) {
        if let Some(resumed_at) = self.resumed_at.take() {
            self.accumulated += resumed_at.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated
            + self
                .resumed_at
                .map(|resumed_at| resumed_at.elapsed())
                .unwrap_or_default()
    }

    pub fn seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

impl Default for DurationTracker {
    fn default() -> Self {
        Self::new(0)
    }
}
