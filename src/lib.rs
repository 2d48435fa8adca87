#![warn(clippy::all)]

mod driver;
mod engine;
mod error;
mod frontier;
mod grid;
mod simulation;
mod utils;

pub use driver::{Driver, LoopState};
pub use engine::{
    next_state, rule, ChangeRecord, Engine, FrontierEngine, Generation, NaiveEngine,
    NEIGHBOR_COUNT_LIMIT,
};
pub use error::{LifeError, Result};
pub use frontier::{add_neighborhood, create_conflict_set, FrontierSet};
pub use grid::{coordinate_of, index_of, neighborhood, neighbors, offset, BitGrid, Coordinate};
pub use simulation::{Region, Simulation, TickReport};
pub use utils::{Config, NiceInt, SimulationConfig, Speed, TickLimiter};
