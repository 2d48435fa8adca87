mod naive;
#[cfg(test)]
mod tests;

pub use naive::NaiveEngine;

use crate::frontier::FrontierSet;
use crate::grid::{coordinate_of, set_bits, BitGrid, CELLS_IN_WORD};
use crate::{LifeError, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, trace};

/// One cell whose state flipped during a tick, as handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeRecord {
    pub row: usize,
    pub column: usize,
    pub is_alive: bool,
}

/// Result of advancing a grid by one generation.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    /// Cells that flipped, with row/column multiplied by the resolution scale.
    pub changed: Vec<ChangeRecord>,
    /// Births minus deaths.
    pub population_delta: i64,
    /// Frontier to pass to the next tick.
    pub next_frontier: FrontierSet,
}

/// Game engine for Game of Life
pub trait Engine {
    /// Advances `grid` by exactly one generation.
    ///
    /// Only cells in `frontier` may be evaluated; an engine that ignores the
    /// frontier must still produce the same grid. `resolution_scale` multiplies
    /// the coordinates of the returned change records.
    fn execute(
        &self,
        grid: &mut BitGrid,
        resolution_scale: usize,
        frontier: &FrontierSet,
    ) -> Result<Generation>;

    /// Short name used in logs and benchmarks.
    fn name(&self) -> &'static str;
}

/// Neighbor count at which the outcome of [`rule`] stops changing.
pub const NEIGHBOR_COUNT_LIMIT: u8 = 4;

/// B3/S23: a live cell survives with 2 or 3 live neighbors, a dead cell is
/// born with exactly 3.
#[inline]
pub fn rule(is_alive: bool, live_neighbors: u8) -> bool {
    matches!((is_alive, live_neighbors), (true, 2) | (_, 3))
}

/// Next state of the cell at `(row, column)`.
pub fn next_state(grid: &BitGrid, row: usize, column: usize) -> Result<bool> {
    grid.index_of(row, column)?;
    Ok(evaluate(grid, row, column))
}

/// Unchecked [`next_state`]; `(row, column)` must lie inside `grid`.
#[inline]
pub(crate) fn evaluate(grid: &BitGrid, row: usize, column: usize) -> bool {
    let index = crate::grid::index_of(row, column, grid.width());
    rule(
        grid.bit(index),
        grid.count_live_neighbors(row, column, NEIGHBOR_COUNT_LIMIT),
    )
}

/// Incremental engine: evaluates only the frontier, in parallel.
///
/// Work is split by 64-cell words of the frontier mask. Runs on the global
/// rayon pool unless built with [`FrontierEngine::with_threads`].
#[derive(Default)]
pub struct FrontierEngine {
    pool: Option<rayon::ThreadPool>,
}

impl FrontierEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("life-worker-{i}"))
            .build()
            .map_err(|e| LifeError::InvalidConfig(format!("thread pool: {e}")))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Rejects a frontier holding cells past the end of `grid`.
    fn check_members(grid: &BitGrid, mask: &[u64]) -> Result<()> {
        let len = grid.len();
        let outside = mask
            .iter()
            .enumerate()
            .skip(len / CELLS_IN_WORD)
            .find_map(|(i, &m)| {
                set_bits(m)
                    .map(|bit| i * CELLS_IN_WORD + bit)
                    .find(|&index| index >= len)
            });
        match outside {
            Some(index) => {
                let (row, column) = coordinate_of(index, grid.width());
                Err(LifeError::InvalidFrontierMember { index, row, column })
            }
            None => Ok(()),
        }
    }

    fn execute_inner(
        grid: &mut BitGrid,
        resolution_scale: usize,
        frontier: &FrontierSet,
    ) -> Result<Generation> {
        let grid = &*grid;
        let width = grid.width();
        let mask = frontier.words();
        Self::check_members(grid, mask)?;

        // evaluation: read-only on the grid, one staged word per mask word
        let staged: Vec<u64> = mask
            .par_iter()
            .enumerate()
            .map(|(i, &m)| {
                let mut next = 0;
                for bit in set_bits(m) {
                    let (row, column) = coordinate_of(i * CELLS_IN_WORD + bit, width);
                    if evaluate(grid, row, column) {
                        next |= 1 << bit;
                    }
                }
                next
            })
            .collect();

        // commit: each task owns one word, the counter is the only shared value
        let population = AtomicI64::new(0);
        let flipped: Vec<u64> = mask
            .par_iter()
            .zip(staged.par_iter())
            .enumerate()
            .map(|(i, (&m, &next))| {
                if m == 0 {
                    return 0;
                }
                let diff = grid.commit_word(i, m, next);
                if diff != 0 {
                    let births = (diff & next).count_ones() as i64;
                    let deaths = (diff & !next).count_ones() as i64;
                    population.fetch_add(births - deaths, Ordering::Relaxed);
                }
                diff
            })
            .collect();

        let changed = flipped
            .par_iter()
            .zip(staged.par_iter())
            .enumerate()
            .flat_map_iter(|(i, (&diff, &next))| {
                set_bits(diff).map(move |bit| {
                    let (row, column) = coordinate_of(i * CELLS_IN_WORD + bit, width);
                    ChangeRecord {
                        row: row * resolution_scale,
                        column: column * resolution_scale,
                        is_alive: next >> bit & 1 != 0,
                    }
                })
            })
            .collect();

        let next_frontier = Self::next_frontier(grid, mask, &flipped);
        Ok(Generation {
            changed,
            population_delta: population.into_inner(),
            next_frontier,
        })
    }

    /// Union of the blocks around every changed cell and every member still
    /// alive after the commit.
    ///
    /// Live members stand in for the cells that survived; together with the
    /// births they cover every live cell, and changed cells that died cover
    /// the neighbors that lost a neighbor. Dead, unchanged members are
    /// dropped so the frontier tracks the pattern instead of growing a ring
    /// per tick.
    fn next_frontier(grid: &BitGrid, mask: &[u64], flipped: &[u64]) -> FrontierSet {
        FrontierSet::from_seeds(grid, |i| {
            let members = mask.get(i).copied().unwrap_or(0);
            let diff = flipped.get(i).copied().unwrap_or(0);
            diff | (members & grid.word(i))
        })
    }
}

impl Engine for FrontierEngine {
    fn execute(
        &self,
        grid: &mut BitGrid,
        resolution_scale: usize,
        frontier: &FrontierSet,
    ) -> Result<Generation> {
        trace!(frontier = frontier.len(), "evaluating frontier");
        let generation = match &self.pool {
            Some(pool) => pool.install(|| Self::execute_inner(grid, resolution_scale, frontier)),
            None => Self::execute_inner(grid, resolution_scale, frontier),
        }?;
        debug!(
            changed = generation.changed.len(),
            delta = generation.population_delta,
            next_frontier = generation.next_frontier.len(),
            "generation committed"
        );
        Ok(generation)
    }

    fn name(&self) -> &'static str {
        "frontier"
    }
}
