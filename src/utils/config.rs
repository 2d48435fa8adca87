use crate::{LifeError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub struct Config;

impl Config {
    pub const DEFAULT_SIDE: usize = 8000;
    pub const DEFAULT_FILL_RATE: f64 = 0.3;
    pub const DEFAULT_SEED: u64 = 42;

    /// Largest pixels-per-cell factor accepted for change records.
    pub const MAX_RESOLUTION: usize = 128;

    /// Tick reports the driver queues before it waits for the renderer.
    pub const REPORT_BACKLOG: usize = 8;
}

/// Named tick rates; each maps to a minimum delay between ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Normal,
    #[default]
    Fast,
    Faster,
}

impl Speed {
    pub fn budget(self) -> Duration {
        Duration::from_millis(match self {
            Self::Normal => 100,
            Self::Fast => 50,
            Self::Faster => 0,
        })
    }

    /// The next preset, wrapping from `Faster` back to `Normal`.
    pub fn next(self) -> Self {
        match self {
            Self::Normal => Self::Fast,
            Self::Fast => Self::Faster,
            Self::Faster => Self::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => ">",
            Self::Fast => ">>",
            Self::Faster => ">>>",
        }
    }
}

/// Runtime settings of a simulation and its driver, usually read from TOML.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub speed: Speed,
    /// Overrides the delay implied by `speed`.
    pub tick_budget_ms: Option<u64>,
    /// Multiplier for change record coordinates; 1 emits grid units.
    pub resolution_scale: usize,
    /// Worker threads for the engine; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    pub seed: Option<u64>,
    pub fill_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: Config::DEFAULT_SIDE,
            height: Config::DEFAULT_SIDE,
            speed: Speed::default(),
            tick_budget_ms: None,
            resolution_scale: 1,
            threads: None,
            seed: Some(Config::DEFAULT_SEED),
            fill_rate: Config::DEFAULT_FILL_RATE,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(data).map_err(|e| LifeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| LifeError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LifeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(0.0..=1.0).contains(&self.fill_rate) {
            return Err(LifeError::InvalidConfig(format!(
                "fill_rate {} is not within [0, 1]",
                self.fill_rate
            )));
        }
        if !(1..=Config::MAX_RESOLUTION).contains(&self.resolution_scale) {
            return Err(LifeError::InvalidConfig(format!(
                "resolution_scale {} is not within [1, {}]",
                self.resolution_scale,
                Config::MAX_RESOLUTION
            )));
        }
        if self.threads == Some(0) {
            return Err(LifeError::InvalidConfig(
                "threads must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay between tick starts.
    pub fn tick_budget(&self) -> Duration {
        self.tick_budget_ms
            .map_or(self.speed.budget(), Duration::from_millis)
    }
}
