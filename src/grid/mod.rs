mod index;

pub use index::{coordinate_of, index_of, neighborhood, neighbors, offset};

use crate::{LifeError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// A cell identity travelling together with its state.
///
/// Always copied; `is_alive` is a snapshot taken when the value was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub is_alive: bool,
}

/// Fixed-size rectangular bitset holding the state of every cell.
///
/// Cells are packed 64 per word, row-major. Words are atomics so that the
/// commit phase of an update can flip distinct cells sharing a word from
/// several threads; all `&mut self` methods bypass the atomics.
pub struct BitGrid {
    words: Vec<AtomicU64>,
    width: usize,
    height: usize,
}

pub(crate) const CELLS_IN_WORD: usize = 64;

/// Positions of the set bits of `word`, lowest first.
#[inline]
pub(crate) fn set_bits(mut word: u64) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if word == 0 {
            return None;
        }
        let bit = word.trailing_zeros() as usize;
        word &= word - 1;
        Some(bit)
    })
}

impl BitGrid {

    /// Creates a blank `width x height` grid.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let len = width
            .checked_mul(height)
            .filter(|&len| len > 0)
            .ok_or(LifeError::InvalidDimensions { width, height })?;
        let words = (0..len.div_ceil(CELLS_IN_WORD))
            .map(|_| AtomicU64::new(0))
            .collect();
        Ok(Self {
            words,
            width,
            height,
        })
    }

    /// Creates a grid with the given `(row, column)` cells alive.
    pub fn with_live_cells(
        width: usize,
        height: usize,
        cells: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let mut grid = Self::new(width, height)?;
        for (row, column) in cells {
            grid.set_at(row, column, true)?;
        }
        Ok(grid)
    }

    /// Creates a grid where each cell is alive with probability `fill_rate`.
    ///
    /// `seed` - random seed (if `None`, then random seed is generated)
    pub fn random(width: usize, height: usize, fill_rate: f64, seed: Option<u64>) -> Result<Self> {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        if !(0.0..=1.0).contains(&fill_rate) {
            return Err(LifeError::InvalidConfig(format!(
                "fill rate {fill_rate} is not a probability"
            )));
        }
        let mut rng = if let Some(x) = seed {
            ChaCha8Rng::seed_from_u64(x)
        } else {
            ChaCha8Rng::from_entropy()
        };
        let mut grid = Self::new(width, height)?;
        for index in 0..grid.len() {
            if rng.gen_bool(fill_rate) {
                grid.set_bit(index, true);
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells, `width * height`.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always `false`: a grid has at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        Ok(self.bit(index))
    }

    pub fn set(&mut self, index: usize, state: bool) -> Result<()> {
        self.check_index(index)?;
        self.set_bit(index, state);
        Ok(())
    }

    pub fn get_at(&self, row: usize, column: usize) -> Result<bool> {
        let index = self.index_of(row, column)?;
        Ok(self.bit(index))
    }

    pub fn set_at(&mut self, row: usize, column: usize, state: bool) -> Result<()> {
        let index = self.index_of(row, column)?;
        self.set_bit(index, state);
        Ok(())
    }

    /// Flips the cell and returns its new state.
    pub fn toggle(&mut self, row: usize, column: usize) -> Result<bool> {
        let index = self.index_of(row, column)?;
        let state = !self.bit(index);
        self.set_bit(index, state);
        Ok(state)
    }

    pub fn coordinate_of(&self, index: usize) -> Result<(usize, usize)> {
        self.check_index(index)?;
        Ok(coordinate_of(index, self.width))
    }

    pub fn index_of(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.height || column >= self.width {
            return Err(LifeError::OutOfRange {
                row,
                column,
                width: self.width,
                height: self.height,
            });
        }
        Ok(index_of(row, column, self.width))
    }

    /// Total number of alive cells.
    pub fn population(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as u64)
            .sum()
    }

    /// Indices of all alive cells in ascending order; empty words are skipped.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, w)| {
            set_bits(w.load(Ordering::Relaxed)).map(move |bit| i * CELLS_IN_WORD + bit)
        })
    }

    /// Number of alive neighbors of an in-bounds cell, counting stops at `limit`.
    pub fn count_live_neighbors(&self, row: usize, column: usize, limit: u8) -> u8 {
        let mut count = 0;
        for (index, _, _) in neighbors(row, column, self.width, self.height) {
            if self.bit(index) {
                count += 1;
                if count >= limit {
                    break;
                }
            }
        }
        count
    }

    /// Unchecked read; `index` must be below `len()`.
    #[inline]
    pub(crate) fn bit(&self, index: usize) -> bool {
        let word = self.words[index / CELLS_IN_WORD].load(Ordering::Relaxed);
        word >> (index % CELLS_IN_WORD) & 1 != 0
    }

    #[inline]
    fn set_bit(&mut self, index: usize, state: bool) {
        let mask = 1 << (index % CELLS_IN_WORD);
        let word = self.words[index / CELLS_IN_WORD].get_mut();
        if state {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Number of packed words; the last one may be partially used.
    #[inline]
    pub(crate) fn word_count(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub(crate) fn word(&self, i: usize) -> u64 {
        self.words[i].load(Ordering::Relaxed)
    }

    /// Copies the bits of `staged` selected by `mask` into word `i` through a
    /// shared reference and returns the bits that flipped.
    ///
    /// Concurrent calls on distinct words never interfere. Two calls on the
    /// same word at once are a caller bug.
    #[inline]
    pub(crate) fn commit_word(&self, i: usize, mask: u64, staged: u64) -> u64 {
        let word = &self.words[i];
        let diff = (word.load(Ordering::Relaxed) ^ staged) & mask;
        if diff != 0 {
            word.fetch_xor(diff, Ordering::Relaxed);
        }
        diff
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(LifeError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

impl Clone for BitGrid {
    fn clone(&self) -> Self {
        Self {
            words: self
                .words
                .iter()
                .map(|w| AtomicU64::new(w.load(Ordering::Relaxed)))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl PartialEq for BitGrid {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a.load(Ordering::Relaxed) == b.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for BitGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("population", &self.population())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_by_index_and_position() {
        let mut grid = BitGrid::new(100, 3).unwrap();
        grid.set(0, true).unwrap();
        grid.set_at(2, 99, true).unwrap();
        grid.set_at(1, 63, true).unwrap();
        assert!(grid.get_at(0, 0).unwrap());
        assert!(grid.get(299).unwrap());
        assert!(grid.get(163).unwrap());
        assert!(!grid.get(164).unwrap());
        assert_eq!(grid.population(), 3);
        assert_eq!(grid.live_indices().collect::<Vec<_>>(), vec![0, 163, 299]);

        grid.set(163, false).unwrap();
        assert_eq!(grid.population(), 2);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut grid = BitGrid::new(10, 5).unwrap();
        assert_eq!(
            grid.get(50),
            Err(LifeError::IndexOutOfRange { index: 50, len: 50 })
        );
        assert!(matches!(
            grid.set_at(5, 0, true),
            Err(LifeError::OutOfRange { row: 5, .. })
        ));
        // column past the edge must not spill into the next row
        assert!(grid.get_at(0, 10).is_err());
        assert!(grid.coordinate_of(50).is_err());
        assert_eq!(grid.coordinate_of(49).unwrap(), (4, 9));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            BitGrid::new(0, 10),
            Err(LifeError::InvalidDimensions { .. })
        ));
        assert!(BitGrid::new(10, 0).is_err());
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut grid = BitGrid::new(8, 8).unwrap();
        assert!(grid.toggle(3, 4).unwrap());
        assert!(!grid.toggle(3, 4).unwrap());
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn commit_touches_only_masked_bits() {
        let mut grid = BitGrid::new(70, 1).unwrap();
        grid.set(0, true).unwrap();
        grid.set(1, true).unwrap();
        // bit 0 stays outside the mask, bit 1 dies, bit 2 is born
        let diff = grid.commit_word(0, 0b110, 0b100);
        assert_eq!(diff, 0b110);
        assert_eq!(grid.live_indices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(grid.commit_word(0, 0b110, 0b100), 0);
        assert_eq!(grid.word_count(), 2);
    }

    #[test]
    fn shared_commits_to_distinct_words_do_not_collide() {
        let grid = BitGrid::new(64 * 8, 1).unwrap();
        std::thread::scope(|s| {
            for t in 0..4 {
                let g = &grid;
                s.spawn(move || {
                    for i in (t..8).step_by(4) {
                        assert_eq!(g.commit_word(i, u64::MAX, u64::MAX), u64::MAX);
                    }
                });
            }
        });
        assert_eq!(grid.population(), 64 * 8);
    }

    #[test]
    fn neighbor_count_stops_at_limit() {
        let cells = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 2), (2, 0)];
        let grid = BitGrid::with_live_cells(3, 3, cells).unwrap();
        assert_eq!(grid.count_live_neighbors(1, 1, 9), 6);
        assert_eq!(grid.count_live_neighbors(1, 1, 4), 4);
        assert_eq!(grid.count_live_neighbors(0, 0, 9), 2);
    }

    #[test]
    fn random_is_reproducible() {
        let a = BitGrid::random(50, 40, 0.3, Some(42)).unwrap();
        let b = BitGrid::random(50, 40, 0.3, Some(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.population() > 0);
    }
}
