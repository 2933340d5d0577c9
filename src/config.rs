//! Configuration-time constants for a game session.

use std::time::Duration;
use thiserror::Error;

/// Board geometry and rule constants. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Playfield width in block cells.
    pub logical_width: usize,
    /// Playfield height in block cells.
    pub logical_height: usize,
    /// Each block cell crumbles into `particle_scale x particle_scale` particles.
    pub particle_scale: usize,
    /// Blast radius in block cells.
    pub bomb_radius: usize,
    /// Probability that the spawner hands out a bomb instead of a coloured block.
    pub special_block_chance: f64,
    /// Number of normal colours.
    pub palette_size: u8,
    /// Top block rows tinted as the danger zone (display only).
    pub danger_zone_rows: usize,
    /// Cleared regions needed per level.
    pub lines_per_level: u32,
    /// How long one settle frame stays on screen.
    pub settle_frame: Duration,
    /// How long clearing / exploding particles flash before removal.
    pub flash: Duration,
    /// Saved games older than this are discarded.
    pub snapshot_max_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logical_width: 12,
            logical_height: 20,
            particle_scale: 4,
            bomb_radius: 2,
            special_block_chance: 0.15,
            palette_size: 7,
            danger_zone_rows: 2,
            lines_per_level: 10,
            settle_frame: Duration::from_millis(20),
            flash: Duration::from_millis(500),
            snapshot_max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("playfield must be at least 2x2 blocks, got {0}x{1}")]
    Playfield(usize, usize),
    #[error("particle scale must be at least 1")]
    Scale,
    #[error("palette must hold between 1 and 64 colours, got {0}")]
    Palette(u8),
    #[error("special block chance must lie in [0, 1], got {0}")]
    Chance(f64),
}

impl Config {
    /// Particle columns.
    #[inline]
    pub fn grid_width(&self) -> usize {
        self.logical_width * self.particle_scale
    }

    /// Particle rows.
    #[inline]
    pub fn grid_height(&self) -> usize {
        self.logical_height * self.particle_scale
    }

    /// Blast radius in particles.
    #[inline]
    pub fn blast_radius(&self) -> usize {
        self.bomb_radius * self.particle_scale
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logical_width < 2 || self.logical_height < 2 {
            return Err(ConfigError::Playfield(self.logical_width, self.logical_height));
        }
        if self.particle_scale == 0 {
            return Err(ConfigError::Scale);
        }
        if self.palette_size == 0 || self.palette_size > 64 {
            return Err(ConfigError::Palette(self.palette_size));
        }
        if !(0.0..=1.0).contains(&self.special_block_chance) {
            return Err(ConfigError::Chance(self.special_block_chance));
        }
        Ok(())
    }
}
