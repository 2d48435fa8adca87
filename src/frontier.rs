//! The conflict set: cells that may change state in the coming tick.
//!
//! A cell can only change if it or one of its 8 neighbors changed in the
//! previous tick. Every cell left out of the frontier is therefore assumed
//! stable and is never evaluated.

use crate::grid::{coordinate_of, neighborhood, set_bits, BitGrid, Coordinate, CELLS_IN_WORD};
use crate::Result;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Set of cells to evaluate in one tick, packed one bit per cell in the
/// same word layout as [`BitGrid`].
///
/// Members come out in ascending index order. Sets built by hand grow on
/// demand, so an empty set costs nothing.
#[derive(Clone, Debug, Default)]
pub struct FrontierSet {
    words: Vec<u64>,
    len: usize,
}

impl FrontierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / CELLS_IN_WORD)
            .is_some_and(|w| w >> (index % CELLS_IN_WORD) & 1 != 0)
    }

    /// Member indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(i, &w)| set_bits(w).map(move |bit| i * CELLS_IN_WORD + bit))
    }

    /// Members as coordinates carrying their current state in `grid`.
    ///
    /// Members outside `grid` are skipped.
    pub fn coordinates<'a>(&'a self, grid: &'a BitGrid) -> impl Iterator<Item = Coordinate> + 'a {
        self.indices()
            .take_while(|&index| index < grid.len())
            .map(|index| {
                let (row, column) = coordinate_of(index, grid.width());
                Coordinate {
                    index,
                    row,
                    column,
                    is_alive: grid.bit(index),
                }
            })
    }

    /// Adds `index`; returns `false` if it was already a member.
    ///
    /// The index is not checked against any grid; the engine rejects
    /// members outside the grid it runs on.
    pub fn insert(&mut self, index: usize) -> bool {
        let (i, bit) = (index / CELLS_IN_WORD, 1 << (index % CELLS_IN_WORD));
        if i >= self.words.len() {
            self.words.resize(i + 1, 0);
        }
        let word = &mut self.words[i];
        if *word & bit != 0 {
            return false;
        }
        *word |= bit;
        self.len += 1;
        true
    }

    /// Adds the in-bounds 3x3 block centred at `index`.
    pub fn add_neighborhood(&mut self, grid: &BitGrid, index: usize) -> Result<()> {
        let (row, column) = grid.coordinate_of(index)?;
        for (index, _, _) in neighborhood(row, column, grid.width(), grid.height()) {
            self.insert(index);
        }
        Ok(())
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Union of the 3x3 blocks around every bit set in `seeds(i)`, where
    /// `seeds(i)` is a word laid out like word `i` of `grid`.
    ///
    /// Words are processed in parallel on the current rayon pool; blocks
    /// crossing into a neighboring word are merged with `fetch_or`.
    pub(crate) fn from_seeds<F>(grid: &BitGrid, seeds: F) -> Self
    where
        F: Fn(usize) -> u64 + Sync,
    {
        let (width, height) = (grid.width(), grid.height());
        let mask: Vec<AtomicU64> = (0..grid.word_count()).map(|_| AtomicU64::new(0)).collect();
        (0..grid.word_count()).into_par_iter().for_each(|i| {
            for bit in set_bits(seeds(i)) {
                let (row, column) = coordinate_of(i * CELLS_IN_WORD + bit, width);
                for (index, _, _) in neighborhood(row, column, width, height) {
                    let word = &mask[index / CELLS_IN_WORD];
                    let flag = 1 << (index % CELLS_IN_WORD);
                    if word.load(Ordering::Relaxed) & flag == 0 {
                        word.fetch_or(flag, Ordering::Relaxed);
                    }
                }
            }
        });

        let words: Vec<u64> = mask.into_iter().map(AtomicU64::into_inner).collect();
        let len = words.iter().map(|w| w.count_ones() as usize).sum();
        Self { words, len }
    }
}

/// Seeds a frontier from scratch: the union of the 3x3 blocks of every live cell.
///
/// Costs a scan of the whole grid, so it is only meant for the start of a
/// simulation or after a reset.
pub fn create_conflict_set(grid: &BitGrid) -> FrontierSet {
    FrontierSet::from_seeds(grid, |i| grid.word(i))
}

/// Folds the cell at `index` and its neighbors into a running frontier, so a
/// manually toggled cell is evaluated on the next tick.
pub fn add_neighborhood(grid: &BitGrid, frontier: &mut FrontierSet, index: usize) -> Result<()> {
    frontier.add_neighborhood(grid, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LifeError;

    #[test]
    fn conflict_set_of_blank_grid_is_empty() {
        let grid = BitGrid::new(16, 16).unwrap();
        assert!(create_conflict_set(&grid).is_empty());
    }

    #[test]
    fn conflict_set_covers_blocks_without_duplicates() {
        // two live cells whose blocks overlap in one column
        let grid = BitGrid::with_live_cells(10, 10, [(4, 4), (4, 6)]).unwrap();
        let frontier = create_conflict_set(&grid);
        assert_eq!(frontier.len(), 15);
        for row in 3..=5 {
            for column in 3..=7 {
                assert!(frontier.contains(row * 10 + column));
            }
        }
        let alive: Vec<_> = frontier
            .coordinates(&grid)
            .filter(|c| c.is_alive)
            .map(|c| c.index)
            .collect();
        assert_eq!(alive, vec![44, 46]);
    }

    #[test]
    fn corner_cell_block_is_clipped() {
        let grid = BitGrid::with_live_cells(5, 5, [(4, 4)]).unwrap();
        let frontier = create_conflict_set(&grid);
        let indices: Vec<_> = frontier.indices().collect();
        assert_eq!(indices, vec![18, 19, 23, 24]);
    }

    #[test]
    fn add_neighborhood_extends_running_frontier() {
        let mut grid = BitGrid::new(8, 8).unwrap();
        let mut frontier = FrontierSet::new();
        grid.toggle(0, 7).unwrap();
        add_neighborhood(&grid, &mut frontier, 7).unwrap();
        assert_eq!(frontier.len(), 4);
        assert!(frontier.coordinates(&grid).any(|c| c.index == 7 && c.is_alive));

        add_neighborhood(&grid, &mut frontier, 7).unwrap();
        assert_eq!(frontier.len(), 4);

        assert!(matches!(
            add_neighborhood(&grid, &mut frontier, 64),
            Err(LifeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn insert_deduplicates_and_grows() {
        let mut frontier = FrontierSet::new();
        assert!(!frontier.contains(200));
        assert!(frontier.insert(200));
        assert!(!frontier.insert(200));
        assert!(frontier.insert(3));
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.indices().collect::<Vec<_>>(), vec![3, 200]);
    }

    #[test]
    fn parallel_seeding_matches_sequential_blocks() {
        // widths that do not divide 64 put row breaks inside words
        for (w, h) in [(37, 29), (64, 3), (130, 17)] {
            let grid = BitGrid::random(w, h, 0.2, Some(9)).unwrap();
            let mut expected = FrontierSet::new();
            for index in grid.live_indices() {
                expected.add_neighborhood(&grid, index).unwrap();
            }
            let frontier = create_conflict_set(&grid);
            assert_eq!(frontier.len(), expected.len());
            assert!(frontier.indices().eq(expected.indices()));
        }
    }

    #[test]
    fn frontier_memory_is_one_bit_per_cell() {
        let grid = BitGrid::random(1000, 1000, 0.3, Some(1)).unwrap();
        let frontier = create_conflict_set(&grid);
        assert_eq!(frontier.words().len(), grid.word_count());
        assert!(frontier.len() > 900_000);
    }
}
