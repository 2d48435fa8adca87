use super::*;
use crate::frontier::create_conflict_set;

fn step(engine: &dyn Engine, grid: &mut BitGrid, frontier: &FrontierSet) -> Generation {
    engine.execute(grid, 1, frontier).unwrap()
}

fn sorted(mut records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    records.sort_by_key(|r| (r.row, r.column));
    records
}

#[test]
fn rule_matches_b3s23_table() {
    for n in 0..=8u8 {
        assert_eq!(rule(false, n), n == 3, "dead cell with {n} neighbors");
        assert_eq!(rule(true, n), n == 2 || n == 3, "live cell with {n} neighbors");
    }
}

#[test]
fn neighbor_limit_does_not_change_outcome() {
    for n in NEIGHBOR_COUNT_LIMIT..=8 {
        for alive in [false, true] {
            assert_eq!(rule(alive, n), rule(alive, NEIGHBOR_COUNT_LIMIT));
        }
    }
}

#[test]
fn full_corner_block_keeps_three_neighbors() {
    // every cell of the grid alive: a corner sees 3 neighbors and survives,
    // an edge cell sees 5 and dies
    let (w, h) = (4, 3);
    let cells = (0..h).flat_map(|r| (0..w).map(move |c| (r, c)));
    let mut grid = BitGrid::with_live_cells(w, h, cells).unwrap();
    let frontier = create_conflict_set(&grid);
    let generation = step(&FrontierEngine::new(), &mut grid, &frontier);

    assert!(grid.get_at(0, 0).unwrap());
    assert!(grid.get_at(h - 1, w - 1).unwrap());
    assert!(grid.get_at(0, w - 1).unwrap());
    assert!(!grid.get_at(0, 1).unwrap());
    assert!(!grid.get_at(1, 0).unwrap());
    assert_eq!(grid.population(), 4);
    assert_eq!(generation.population_delta, -8);
}

#[test]
fn blinker_oscillates() {
    let mut grid = BitGrid::with_live_cells(8, 8, [(1, 0), (1, 1), (1, 2)]).unwrap();
    let frontier = create_conflict_set(&grid);
    let generation = step(&FrontierEngine::new(), &mut grid, &frontier);

    assert_eq!(generation.population_delta, 0);
    let live: Vec<_> = grid.live_indices().map(|i| grid.coordinate_of(i).unwrap()).collect();
    assert_eq!(live, vec![(0, 1), (1, 1), (2, 1)]);
    assert_eq!(
        sorted(generation.changed),
        vec![
            ChangeRecord { row: 0, column: 1, is_alive: true },
            ChangeRecord { row: 1, column: 0, is_alive: false },
            ChangeRecord { row: 1, column: 2, is_alive: false },
            ChangeRecord { row: 2, column: 1, is_alive: true },
        ]
    );
}

#[test]
fn change_records_are_scaled() {
    let mut grid = BitGrid::with_live_cells(8, 8, [(3, 2), (3, 3), (3, 4)]).unwrap();
    let frontier = create_conflict_set(&grid);
    let generation = FrontierEngine::new().execute(&mut grid, 32, &frontier).unwrap();
    let births: Vec<_> = sorted(generation.changed)
        .into_iter()
        .filter(|r| r.is_alive)
        .map(|r| (r.row, r.column))
        .collect();
    assert_eq!(births, vec![(2 * 32, 3 * 32), (4 * 32, 3 * 32)]);
}

#[test]
fn cells_outside_frontier_are_not_evaluated() {
    // a lone cell that would die, but nobody asked to evaluate it
    let mut grid = BitGrid::with_live_cells(8, 8, [(4, 4)]).unwrap();
    let generation = step(&FrontierEngine::new(), &mut grid, &FrontierSet::new());
    assert!(generation.changed.is_empty());
    assert!(generation.next_frontier.is_empty());
    assert!(grid.get_at(4, 4).unwrap());
}

#[test]
fn empty_frontier_after_pattern_dies_out() {
    let mut grid = BitGrid::with_live_cells(8, 8, [(4, 4), (4, 5)]).unwrap();
    let engine = FrontierEngine::new();
    let frontier = create_conflict_set(&grid);
    let first = step(&engine, &mut grid, &frontier);
    assert_eq!(first.population_delta, -2);
    // the cells that just died still seed one more frontier
    assert!(!first.next_frontier.is_empty());
    let second = step(&engine, &mut grid, &first.next_frontier);
    assert!(second.changed.is_empty());
    assert!(second.next_frontier.is_empty());
}

#[test]
fn member_outside_grid_is_an_internal_fault() {
    let mut grid = BitGrid::new(10, 10).unwrap();
    let mut frontier = FrontierSet::new();
    frontier.insert(11);
    frontier.insert(103);
    let err = FrontierEngine::new().execute(&mut grid, 1, &frontier).unwrap_err();
    assert_eq!(
        err,
        LifeError::InvalidFrontierMember {
            index: 103,
            row: 10,
            column: 3
        }
    );

    let mut frontier = FrontierSet::new();
    frontier.insert(64 * 5);
    assert!(FrontierEngine::new().execute(&mut grid, 1, &frontier).is_err());
}

#[test]
fn next_state_checks_bounds() {
    let grid = BitGrid::with_live_cells(10, 10, [(0, 8), (0, 9), (1, 9)]).unwrap();
    assert_eq!(next_state(&grid, 0, 8), Ok(true));
    assert!(matches!(
        next_state(&grid, 100, 0),
        Err(LifeError::OutOfRange { row: 100, .. })
    ));
    // a column past the edge must not read the next row
    assert!(next_state(&grid, 0, 15).is_err());
}

#[test]
fn settled_soup_frontier_stays_small() {
    let mut grid = BitGrid::random(256, 256, 0.3, Some(21)).unwrap();
    let engine = FrontierEngine::new();
    let mut frontier = create_conflict_set(&grid);
    let seeded = frontier.len();
    for _ in 0..400 {
        frontier = step(&engine, &mut grid, &frontier).next_frontier;
    }
    // what is left is still lifes, oscillators and their rims
    assert!(frontier.len() < seeded / 2);
    assert_eq!(frontier.words().len(), grid.word_count());
}

#[test]
fn dedicated_pool_matches_global_pool() {
    let mut a = BitGrid::random(64, 48, 0.35, Some(7)).unwrap();
    let mut b = a.clone();
    let (global, pooled) = (FrontierEngine::new(), FrontierEngine::with_threads(2).unwrap());
    let (mut fa, mut fb) = (create_conflict_set(&a), create_conflict_set(&b));
    for _ in 0..20 {
        let ga = step(&global, &mut a, &fa);
        let gb = step(&pooled, &mut b, &fb);
        assert_eq!(ga.changed, gb.changed);
        (fa, fb) = (ga.next_frontier, gb.next_frontier);
    }
    assert_eq!(a, b);
}

#[test]
fn naive_engine_matches_on_small_soup() {
    let mut a = BitGrid::random(33, 17, 0.4, Some(3)).unwrap();
    let mut b = a.clone();
    let mut frontier = create_conflict_set(&a);
    for _ in 0..10 {
        let g = step(&FrontierEngine::new(), &mut a, &frontier);
        let n = step(&NaiveEngine, &mut b, &FrontierSet::new());
        assert_eq!(sorted(g.changed), sorted(n.changed));
        assert_eq!(g.population_delta, n.population_delta);
        frontier = g.next_frontier;
    }
    assert_eq!(a, b);
}
