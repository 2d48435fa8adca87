use std::time::{Duration, Instant};

/// Keeps consecutive ticks at least `budget` apart.
///
/// A tick that overruns its budget is not compensated for; the next one
/// just starts right away.
pub struct TickLimiter {
    budget: Duration,
    tick_timer: Instant,
    ticktime_smoothed: f64,
}

impl TickLimiter {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            tick_timer: Instant::now(),
            ticktime_smoothed: 0.,
        }
    }

    /// Smoothed ticks per second including the sleep.
    pub fn tps(&self) -> f64 {
        1. / self.ticktime_smoothed
    }

    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    /// Marks the start of a tick.
    pub fn start(&mut self) {
        self.tick_timer = Instant::now();
    }

    /// What is left of the budget since [`TickLimiter::start`].
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.tick_timer.elapsed())
    }

    /// Sleeps the remainder of the budget.
    pub async fn delay(&mut self) {
        let remaining = self.remaining();
        if remaining.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(remaining).await;
        }

        let ticktime = self.tick_timer.elapsed().as_secs_f64();
        self.ticktime_smoothed += (ticktime - self.ticktime_smoothed) * 0.1;
    }
}
