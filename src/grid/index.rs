//! Flat index <-> (row, column) arithmetic for row-major grids.

/// Offsets of the 3x3 block around a cell, centre included, in row-major order.
const BLOCK: [(isize, isize); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// `index` -> `(row, column)` for a grid `width` cells wide.
#[inline]
pub fn coordinate_of(index: usize, width: usize) -> (usize, usize) {
    let row = index / width;
    (row, index - row * width)
}

/// `(row, column)` -> flat index for a grid `width` cells wide.
#[inline]
pub fn index_of(row: usize, column: usize, width: usize) -> usize {
    row * width + column
}

/// Shifts `(row, column)` by `(d_row, d_column)`, returning `None` when the
/// result leaves `[0, height) x [0, width)`.
///
/// Bounds are checked per axis: on a flat buffer `index - 1` of a cell in
/// column 0 is a legal index in the previous row, so raw index arithmetic
/// cannot tell "off the left edge" apart from a real neighbor.
#[inline]
pub fn offset(
    row: usize,
    column: usize,
    d_row: isize,
    d_column: isize,
    width: usize,
    height: usize,
) -> Option<(usize, usize)> {
    let r = row.checked_add_signed(d_row)?;
    let c = column.checked_add_signed(d_column)?;
    (r < height && c < width).then_some((r, c))
}

/// In-bounds cells of the 3x3 block centred at `(row, column)`, centre included.
///
/// Yields `(index, row, column)`; a corner cell yields 4 items, an edge cell 6.
pub fn neighborhood(
    row: usize,
    column: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize, usize)> {
    BLOCK.into_iter().filter_map(move |(dr, dc)| {
        let (r, c) = offset(row, column, dr, dc, width, height)?;
        Some((index_of(r, c, width), r, c))
    })
}

/// In-bounds neighbors of `(row, column)`, centre excluded.
pub fn neighbors(
    row: usize,
    column: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize, usize)> {
    neighborhood(row, column, width, height).filter(move |&(_, r, c)| (r, c) != (row, column))
}
