mod config;
mod format_int;
mod tick_limit;

pub use config::{Config, SimulationConfig, Speed};
pub use format_int::NiceInt;
pub use tick_limit::TickLimiter;
