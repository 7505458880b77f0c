//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub bomb: BombConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let grid = &self.grid;
        if grid.width < MIN_GRID_SIDE || grid.height < MIN_GRID_SIDE {
            anyhow::bail!(
                "grid must be at least {MIN_GRID_SIDE}x{MIN_GRID_SIDE}, got {}x{}",
                grid.width,
                grid.height
            );
        }
        if grid.level_multiplier == 0 {
            anyhow::bail!("grid.level_multiplier must be at least 1");
        }
        if self.movement.interval_ms == 0 || self.food.interval_ms == 0 || self.bomb.interval_ms == 0 {
            anyhow::bail!("tick intervals must be non-zero");
        }
        if self.food.probes == 0 {
            anyhow::bail!("food.probes must be at least 1");
        }
        if self.food.max_extra_per_spawn > MAX_EXTRA_FOOD {
            anyhow::bail!("food.max_extra_per_spawn must be at most {MAX_EXTRA_FOOD}");
        }
        let bomb = &self.bomb;
        if bomb.min_radius > bomb.max_radius {
            anyhow::bail!("bomb.min_radius is larger than bomb.max_radius");
        }
        if bomb.max_radius > grid.width.max(grid.height) {
            anyhow::bail!(
                "bomb.max_radius must not exceed the larger grid side ({})",
                grid.width.max(grid.height)
            );
        }
        if bomb.min_detonation_secs == 0 || bomb.min_detonation_secs > bomb.max_detonation_secs {
            anyhow::bail!("bomb detonation range must be non-empty and start at 1 or more");
        }
        Ok(())
    }
}

/// Worms spawn at least 5 cells from every wall.
pub const MIN_GRID_SIDE: u32 = 11;

/// Upper bound for `food.max_extra_per_spawn`.
pub const MAX_EXTRA_FOOD: u32 = 1024;

/// Networking settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    8001
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}

/// Grid dimensions and growth rate. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_width")]
    pub width: u32,
    #[serde(default = "default_grid_height")]
    pub height: u32,
    /// Food needed per segment of length before the next growth.
    #[serde(default = "default_level_multiplier")]
    pub level_multiplier: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
            level_multiplier: default_level_multiplier(),
        }
    }
}

fn default_grid_width() -> u32 {
    40
}
fn default_grid_height() -> u32 {
    30
}
fn default_level_multiplier() -> u32 {
    1
}

/// Worm movement tick.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovementConfig {
    #[serde(default = "default_move_interval")]
    pub interval_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_move_interval(),
        }
    }
}

fn default_move_interval() -> u64 {
    500
}

/// Food spawning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_interval")]
    pub interval_ms: u64,
    /// Items spawned per firing beyond the first (picked in `0..=max`).
    #[serde(default = "default_food_max_extra")]
    pub max_extra_per_spawn: u32,
    /// Random cells tried per item before giving up on it.
    #[serde(default = "default_food_probes")]
    pub probes: u32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_food_interval(),
            max_extra_per_spawn: default_food_max_extra(),
            probes: default_food_probes(),
        }
    }
}

fn default_food_interval() -> u64 {
    5000
}
fn default_food_max_extra() -> u32 {
    4
}
fn default_food_probes() -> u32 {
    5
}

/// Bomb spawning and detonation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BombConfig {
    #[serde(default = "default_bomb_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_bomb_min_radius")]
    pub min_radius: u32,
    #[serde(default = "default_bomb_max_radius")]
    pub max_radius: u32,
    #[serde(default = "default_bomb_min_detonation")]
    pub min_detonation_secs: u32,
    #[serde(default = "default_bomb_max_detonation")]
    pub max_detonation_secs: u32,
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_bomb_interval(),
            min_radius: default_bomb_min_radius(),
            max_radius: default_bomb_max_radius(),
            min_detonation_secs: default_bomb_min_detonation(),
            max_detonation_secs: default_bomb_max_detonation(),
        }
    }
}

fn default_bomb_interval() -> u64 {
    4000
}
fn default_bomb_min_radius() -> u32 {
    1
}
fn default_bomb_max_radius() -> u32 {
    3
}
fn default_bomb_min_detonation() -> u32 {
    5
}
fn default_bomb_max_detonation() -> u32 {
    12
}
