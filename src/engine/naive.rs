use super::{evaluate, ChangeRecord, Engine, Generation};
use crate::frontier::{create_conflict_set, FrontierSet};
use crate::grid::BitGrid;
use crate::Result;

/// Brute-force engine: evaluates every cell of the grid, ignoring the frontier.
///
/// Slow on large grids; serves as the reference the incremental engine is
/// checked against.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveEngine;

impl Engine for NaiveEngine {
    fn execute(
        &self,
        grid: &mut BitGrid,
        resolution_scale: usize,
        _frontier: &FrontierSet,
    ) -> Result<Generation> {
        let (width, height) = (grid.width(), grid.height());
        let mut cells_next = Vec::with_capacity(grid.len());
        for row in 0..height {
            for column in 0..width {
                cells_next.push(evaluate(grid, row, column));
            }
        }

        let mut changed = vec![];
        let mut population_delta = 0;
        for (index, &next) in cells_next.iter().enumerate() {
            if grid.bit(index) == next {
                continue;
            }
            grid.set(index, next)?;
            population_delta += if next { 1 } else { -1 };
            changed.push(ChangeRecord {
                row: index / width * resolution_scale,
                column: index % width * resolution_scale,
                is_alive: next,
            });
        }

        Ok(Generation {
            changed,
            population_delta,
            next_frontier: create_conflict_set(grid),
        })
    }

    fn name(&self) -> &'static str {
        "naive"
    }
}
