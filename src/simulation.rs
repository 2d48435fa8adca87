use crate::engine::{ChangeRecord, Engine, FrontierEngine};
use crate::frontier::{create_conflict_set, FrontierSet};
use crate::grid::BitGrid;
use crate::utils::SimulationConfig;
use crate::{NiceInt, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the renderer learns about one tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Generation number reached by this tick, starting from 1.
    pub generation: u64,
    pub changed: Vec<ChangeRecord>,
    pub population_delta: i64,
    /// Number of alive cells after the tick.
    pub population: u64,
    /// Size of the frontier for the next tick.
    pub frontier_len: usize,
    pub elapsed: Duration,
}

/// Rectangular window of the grid, e.g. the part a renderer shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub row: usize,
    pub column: usize,
    pub height: usize,
    pub width: usize,
}

/// A running simulation: the grid, its frontier and the counters around them.
pub struct Simulation {
    grid: BitGrid,
    frontier: FrontierSet,
    engine: Box<dyn Engine + Send>,
    generation: u64,
    population: u64,
    resolution_scale: usize,
}

impl Simulation {
    /// Blank `width x height` simulation.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self::from_grid(BitGrid::new(width, height)?))
    }

    /// Simulation seeded with the given `(row, column)` live cells.
    pub fn with_live_cells(
        width: usize,
        height: usize,
        cells: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        Ok(Self::from_grid(BitGrid::with_live_cells(width, height, cells)?))
    }

    /// Simulation seeded with a random soup.
    pub fn random(width: usize, height: usize, fill_rate: f64, seed: Option<u64>) -> Result<Self> {
        Ok(Self::from_grid(BitGrid::random(width, height, fill_rate, seed)?))
    }

    /// Random soup sized, seeded and tuned by `config`.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let engine = match config.threads {
            Some(threads) => FrontierEngine::with_threads(threads)?,
            None => FrontierEngine::new(),
        };
        Ok(
            Self::random(config.width, config.height, config.fill_rate, config.seed)?
                .with_engine(engine)
                .with_resolution_scale(config.resolution_scale),
        )
    }

    /// Takes ownership of `grid` and seeds the frontier with a full scan.
    pub fn from_grid(grid: BitGrid) -> Self {
        let frontier = create_conflict_set(&grid);
        let population = grid.population();
        info!(
            width = grid.width(),
            height = grid.height(),
            population = %NiceInt::from(population),
            frontier = %NiceInt::from_usize(frontier.len()),
            "simulation seeded"
        );
        Self {
            grid,
            frontier,
            engine: Box::new(FrontierEngine::new()),
            generation: 0,
            population,
            resolution_scale: 1,
        }
    }

    /// Replaces the engine, e.g. with one running on a dedicated pool.
    pub fn with_engine(mut self, engine: impl Engine + Send + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Multiplier applied to the coordinates of emitted change records.
    pub fn with_resolution_scale(mut self, scale: usize) -> Self {
        self.resolution_scale = scale;
        self
    }

    /// Advances one generation over the current frontier.
    pub fn step(&mut self) -> Result<TickReport> {
        let timer = Instant::now();
        let generation = self
            .engine
            .execute(&mut self.grid, self.resolution_scale, &self.frontier)?;
        self.frontier = generation.next_frontier;
        self.generation += 1;
        self.population = self.population.saturating_add_signed(generation.population_delta);

        let report = TickReport {
            generation: self.generation,
            changed: generation.changed,
            population_delta: generation.population_delta,
            population: self.population,
            frontier_len: self.frontier.len(),
            elapsed: timer.elapsed(),
        };
        debug!(
            generation = report.generation,
            changed = report.changed.len(),
            population = report.population,
            frontier = report.frontier_len,
            elapsed_ms = report.elapsed.as_secs_f64() * 1e3,
            "tick"
        );
        Ok(report)
    }

    /// Flips one cell, returns its new state and schedules its block for the next tick.
    pub fn toggle_cell(&mut self, row: usize, column: usize) -> Result<bool> {
        let state = self.grid.toggle(row, column)?;
        if state {
            self.population += 1;
        } else {
            self.population -= 1;
        }
        let index = self.grid.index_of(row, column)?;
        self.frontier.add_neighborhood(&self.grid, index)?;
        Ok(state)
    }

    /// Discards grid and frontier and starts over from `cells`.
    ///
    /// The engine and resolution scale are kept.
    pub fn reset(
        &mut self,
        width: usize,
        height: usize,
        cells: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<()> {
        let grid = BitGrid::with_live_cells(width, height, cells)?;
        self.frontier = create_conflict_set(&grid);
        self.population = grid.population();
        self.grid = grid;
        self.generation = 0;
        info!(width, height, population = self.population, "simulation reset");
        Ok(())
    }

    /// Every live cell, for redrawing from scratch.
    pub fn live_cells(&self) -> Vec<ChangeRecord> {
        self.grid
            .live_indices()
            .map(|index| self.record(index))
            .collect()
    }

    /// Live cells inside `region`; parts of the region outside the grid are ignored.
    ///
    /// Rows are scanned only within the region, so a small viewport over a
    /// huge grid stays cheap.
    pub fn live_cells_in(&self, region: Region) -> Vec<ChangeRecord> {
        let rows = region.row..(region.row.saturating_add(region.height)).min(self.grid.height());
        let columns =
            region.column..(region.column.saturating_add(region.width)).min(self.grid.width());
        let mut cells = vec![];
        for row in rows {
            for column in columns.clone() {
                let index = crate::grid::index_of(row, column, self.grid.width());
                if self.grid.bit(index) {
                    cells.push(self.record(index));
                }
            }
        }
        cells
    }

    fn record(&self, index: usize) -> ChangeRecord {
        let (row, column) = crate::grid::coordinate_of(index, self.grid.width());
        ChangeRecord {
            row: row * self.resolution_scale,
            column: column * self.resolution_scale,
            is_alive: true,
        }
    }

    pub fn grid(&self) -> &BitGrid {
        &self.grid
    }

    pub fn frontier(&self) -> &FrontierSet {
        &self.frontier
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }
}
