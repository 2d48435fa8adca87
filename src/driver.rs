//! Background loop that keeps stepping a [`Simulation`] and streams the
//! per-tick diffs to whoever renders them.

use crate::engine::ChangeRecord;
use crate::simulation::{Region, Simulation, TickReport};
use crate::utils::{Config, Speed, TickLimiter};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the loop should do before its next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

/// Owner of the simulation loop.
///
/// The simulation sits behind a mutex held for the whole of each tick, so
/// toggles and resets never interleave with a tick in flight. Pause and stop
/// requests are honoured between ticks only.
///
/// At most [`Config::REPORT_BACKLOG`] reports wait in the channel; once it is
/// full the loop does not start another tick until the renderer reads one.
pub struct Driver {
    simulation: Arc<Mutex<Simulation>>,
    state: watch::Sender<LoopState>,
    budget_ms: Arc<AtomicU64>,
    speed: Speed,
    task: Option<JoinHandle<Result<()>>>,
}

fn lock(simulation: &Mutex<Simulation>) -> MutexGuard<'_, Simulation> {
    simulation.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Driver {
    /// Spawns a paused loop on the current tokio runtime.
    ///
    /// Returns the driver and the stream of tick reports. Dropping the
    /// receiver stops the loop before its next tick.
    pub fn spawn(simulation: Simulation, speed: Speed) -> (Self, mpsc::Receiver<TickReport>) {
        let simulation = Arc::new(Mutex::new(simulation));
        let (state, state_rx) = watch::channel(LoopState::Paused);
        let (reports, reports_rx) = mpsc::channel(Config::REPORT_BACKLOG);
        let budget_ms = Arc::new(AtomicU64::new(speed.budget().as_millis() as u64));

        let task = tokio::spawn(run(
            Arc::clone(&simulation),
            state_rx,
            Arc::clone(&budget_ms),
            reports,
        ));
        let driver = Self {
            simulation,
            state,
            budget_ms,
            speed,
            task: Some(task),
        };
        (driver, reports_rx)
    }

    pub fn start(&self) {
        info!("simulation started");
        self.state.send_replace(LoopState::Running);
    }

    pub fn pause(&self) {
        info!("simulation paused");
        self.state.send_replace(LoopState::Paused);
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Minimum time between the starts of two ticks; 0 runs flat out.
    pub fn set_tick_budget_ms(&self, budget_ms: u64) {
        debug!(budget_ms, "tick budget changed");
        self.budget_ms.store(budget_ms, Ordering::Relaxed);
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms.load(Ordering::Relaxed))
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
        self.set_tick_budget_ms(speed.budget().as_millis() as u64);
    }

    /// Switches to the next speed preset and returns it.
    pub fn cycle_speed(&mut self) -> Speed {
        self.set_speed(self.speed.next());
        self.speed
    }

    /// Runs `f` on the blocking pool once no tick is in flight.
    ///
    /// Waiting for the lock can take a whole tick, so it never happens on a
    /// runtime worker.
    async fn locked<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut Simulation) -> R + Send + 'static,
    {
        let simulation = Arc::clone(&self.simulation);
        match tokio::task::spawn_blocking(move || f(&mut lock(&simulation))).await {
            Ok(value) => value,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Flips one cell; waits for a tick in flight to finish first.
    pub async fn toggle_cell(&self, row: usize, column: usize) -> crate::Result<bool> {
        self.locked(move |s| s.toggle_cell(row, column)).await
    }

    /// Pauses the loop and starts over with a fresh `width x height` grid.
    pub async fn reset(
        &self,
        width: usize,
        height: usize,
        cells: impl IntoIterator<Item = (usize, usize)>,
    ) -> crate::Result<()> {
        self.pause();
        let cells: Vec<_> = cells.into_iter().collect();
        self.locked(move |s| s.reset(width, height, cells)).await
    }

    /// Every live cell, for a full redraw.
    pub async fn materialize(&self) -> Vec<ChangeRecord> {
        self.locked(|s| s.live_cells()).await
    }

    /// Live cells of one window, for redrawing only the visible area.
    pub async fn materialize_region(&self, region: Region) -> Vec<ChangeRecord> {
        self.locked(move |s| s.live_cells_in(region)).await
    }

    /// Runs `f` against the simulation between ticks.
    pub async fn with_simulation<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&Simulation) -> R + Send + 'static,
    {
        self.locked(move |s| f(s)).await
    }

    /// Stops the loop after its current tick and waits for it to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        self.state.send_replace(LoopState::Stopped);
        match self.task.take() {
            Some(task) => task.await.context("simulation loop panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.state.send_replace(LoopState::Stopped);
    }
}

async fn run(
    simulation: Arc<Mutex<Simulation>>,
    mut state: watch::Receiver<LoopState>,
    budget_ms: Arc<AtomicU64>,
    reports: mpsc::Sender<TickReport>,
) -> Result<()> {
    let mut limiter = TickLimiter::new(Duration::from_millis(budget_ms.load(Ordering::Relaxed)));
    loop {
        let current = match state.wait_for(|s| *s != LoopState::Paused).await {
            Ok(s) => *s,
            Err(_) => break,
        };
        if current == LoopState::Stopped {
            break;
        }

        // a free slot in the channel is the renderer's go-ahead for one tick
        let mut stop = state.clone();
        let permit = tokio::select! {
            permit = reports.clone().reserve_owned() => permit,
            _ = async { stop.wait_for(|s| *s == LoopState::Stopped).await.is_ok() } => break,
        };
        let Ok(permit) = permit else {
            warn!("tick report receiver dropped, stopping");
            break;
        };

        limiter.set_budget(Duration::from_millis(budget_ms.load(Ordering::Relaxed)));
        limiter.start();
        let simulation = Arc::clone(&simulation);
        let requested = state.clone();
        // the report goes out under the lock, so a reset cannot overtake it
        tokio::task::spawn_blocking(move || -> crate::Result<()> {
            let mut simulation = lock(&simulation);
            // paused while waiting for the lock or for a free slot
            if *requested.borrow() != LoopState::Running {
                return Ok(());
            }
            permit.send(simulation.step()?);
            Ok(())
        })
        .await
        .context("tick panicked")??;

        limiter.delay().await;
    }
    info!(tps = limiter.tps(), "simulation loop exited");
    Ok(())
}
