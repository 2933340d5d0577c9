//! Save and restore a resting session as JSON.

use crate::block::Block;
use crate::config::Config;
use crate::grid::{Cell, GridError, Tag};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const DIR: &str = "sandblast";
const FILENAME: &str = "save.json";

/// Everything needed to resume a game between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Particle rows, top first.
    pub grid: Vec<Vec<Cell>>,
    pub current_block: Block,
    pub next_block: Block,
    pub score: u64,
    pub level: u32,
    pub lines_cleared: u32,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed save: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save is {}h old", .0.as_secs() / 3600)]
    Stale(Duration),
    #[error("saved grid is {found_w}x{found_h}, expected {width}x{height}")]
    Dimensions {
        width: usize,
        height: usize,
        found_w: usize,
        found_h: usize,
    },
    #[error("colour {0} is outside the palette")]
    InvalidTag(u8),
    #[error("saved block is malformed")]
    MalformedBlock,
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Milliseconds since the Unix epoch; zero for clocks set before it.
pub fn unix_millis(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Snapshot {
    /// Reject snapshots that are too old or do not fit `config`.
    pub fn validate(&self, config: &Config, now: SystemTime) -> Result<(), SnapshotError> {
        let age = Duration::from_millis(unix_millis(now).saturating_sub(self.timestamp));
        if age > config.snapshot_max_age {
            return Err(SnapshotError::Stale(age));
        }

        let (width, height) = (config.grid_width(), config.grid_height());
        let found_w = self.grid.first().map_or(0, Vec::len);
        if self.grid.len() != height || self.grid.iter().any(|r| r.len() != width) {
            return Err(SnapshotError::Dimensions {
                width,
                height,
                found_w,
                found_h: self.grid.len(),
            });
        }
        if let Some(c) = self
            .grid
            .iter()
            .flatten()
            .filter_map(|cell| cell.color())
            .find(|&c| c >= config.palette_size)
        {
            return Err(SnapshotError::InvalidTag(c));
        }

        for block in [&self.current_block, &self.next_block] {
            if !block.shape.is_well_formed() || !block.fits_board(config.logical_width, config.logical_height) {
                return Err(SnapshotError::MalformedBlock);
            }
            match block.tag {
                Tag::Color(c) if c >= config.palette_size => return Err(SnapshotError::InvalidTag(c)),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Save file location: `$XDG_CONFIG_HOME/sandblast/save.json`, falling back to `~/.config`.
pub fn save_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join(DIR).join(FILENAME)
}

pub fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Writes a sibling temp file, then renames it over `path`.
pub fn store(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Delete the save; a missing file is fine.
pub fn remove(path: &Path) -> Result<(), SnapshotError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TetrominoKind;

    fn snapshot(config: &Config, now: SystemTime) -> Snapshot {
        let mut grid = vec![vec![Cell::Empty; config.grid_width()]; config.grid_height()];
        grid[79][0] = Cell::Sand(3);
        grid[79][1] = Cell::Bomb;
        Snapshot {
            grid,
            current_block: Block::spawn(TetrominoKind::T.shape(), Tag::Color(2), 12),
            next_block: Block::bomb(12),
            score: 1234,
            level: 2,
            lines_cleared: 11,
            timestamp: unix_millis(now),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("sandblast-{}-{name}", std::process::id()))
            .join(FILENAME)
    }

    #[test]
    fn store_then_load() {
        let c = Config::default();
        let now = SystemTime::now();
        let snap = snapshot(&c, now);
        let path = temp_path("store");
        store(&path, &snap).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, snap);
        assert!(loaded.validate(&c, now).is_ok());
        remove(&path).unwrap();
        assert!(!path.exists());
        // Second removal is a no-op.
        remove(&path).unwrap();
    }

    #[test]
    fn stale_after_a_day() {
        let c = Config::default();
        let then = SystemTime::now();
        let snap = snapshot(&c, then);
        let later = then + Duration::from_secs(25 * 3600);
        assert!(matches!(snap.validate(&c, later), Err(SnapshotError::Stale(_))));
        let soon = then + Duration::from_secs(23 * 3600);
        assert!(snap.validate(&c, soon).is_ok());
    }

    #[test]
    fn wrong_dimensions_rejected() {
        let c = Config::default();
        let now = SystemTime::now();
        let mut snap = snapshot(&c, now);
        snap.grid.pop();
        assert!(matches!(
            snap.validate(&c, now),
            Err(SnapshotError::Dimensions { found_h: 79, .. })
        ));
    }

    #[test]
    fn colour_outside_palette_rejected() {
        let c = Config::default();
        let now = SystemTime::now();
        let mut snap = snapshot(&c, now);
        snap.grid[0][0] = Cell::Sand(9);
        assert!(matches!(snap.validate(&c, now), Err(SnapshotError::InvalidTag(9))));
    }

    #[test]
    fn empty_shape_rejected() {
        let c = Config::default();
        let now = SystemTime::now();
        let mut snap = snapshot(&c, now);
        snap.next_block.shape.0.clear();
        assert!(matches!(snap.validate(&c, now), Err(SnapshotError::MalformedBlock)));
    }

    #[test]
    fn block_far_below_the_board_rejected() {
        let c = Config::default();
        let now = SystemTime::now();
        let mut snap = snapshot(&c, now);
        snap.current_block.position.row = 1_073_741_824;
        assert!(matches!(snap.validate(&c, now), Err(SnapshotError::MalformedBlock)));

        let mut snap = snapshot(&c, now);
        snap.next_block.position.col = -1;
        assert!(matches!(snap.validate(&c, now), Err(SnapshotError::MalformedBlock)));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let path = temp_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Json(_))));
        remove(&path).unwrap();
    }
}
