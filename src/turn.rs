//! One turn: stamp the placed block, settle, explode, chain clears, spawn check.
//!
//! A [`Turn`] is a state machine that hands out one [`TurnFrame`] per call so a
//! front-end can pace the animation. Pulling frames until `None` runs the whole
//! turn; a turn cannot fail or be cancelled once begun.

use crate::block::Block;
use crate::bomb::resolve_explosions;
use crate::clear::find_clearable_regions;
use crate::collision::collides;
use crate::config::Config;
use crate::grid::{Cell, ParticleGrid, Tag};
use crate::sand::step_into;
use crate::scoring;
use rand::Rng;
use std::time::Duration;

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Resting,
    Exploding,
    Clearing,
    SpawnCheck,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum After {
    Explode,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Settle(After),
    Explode,
    Clear,
    SpawnCheck,
    Done,
}

/// One displayable moment of a turn. Grids are owned snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnFrame {
    /// The grid after one gravity step.
    Settle(ParticleGrid),
    /// Particles about to vanish in a blast; `grid` still contains them.
    Explode {
        grid: ParticleGrid,
        cells: Vec<(usize, usize)>,
        points: f64,
    },
    /// Regions about to clear; `grid` still contains them.
    Clear {
        grid: ParticleGrid,
        cells: Vec<(usize, usize)>,
        regions: u32,
        chain: u32,
        points: f64,
        message: Option<String>,
    },
}

impl TurnFrame {
    pub fn grid(&self) -> &ParticleGrid {
        match self {
            Self::Settle(grid) | Self::Explode { grid, .. } | Self::Clear { grid, .. } => grid,
        }
    }

    /// Particles to flash in this frame.
    pub fn highlighted(&self) -> &[(usize, usize)] {
        match self {
            Self::Settle(_) => &[],
            Self::Explode { cells, .. } | Self::Clear { cells, .. } => cells,
        }
    }

    /// How long the frame should stay on screen.
    pub fn hold(&self, config: &Config) -> Duration {
        match self {
            Self::Settle(_) => config.settle_frame,
            Self::Explode { .. } | Self::Clear { .. } => config.flash,
        }
    }
}

/// Outcome of a finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub grid: ParticleGrid,
    /// Score delta, rounded once at the end of the turn.
    pub score: u64,
    /// Regions cleared across all chain passes.
    pub lines_cleared: u32,
    /// Clearing passes in the chain.
    pub chains: u32,
    /// Particles destroyed by bombs (bomb particles excluded).
    pub blasted: usize,
    pub messages: Vec<String>,
    /// The queued block does not fit on the settled grid.
    pub game_over: bool,
}

#[derive(Debug, Clone)]
pub struct Turn {
    grid: ParticleGrid,
    scratch: ParticleGrid,
    phase: Phase,
    next: Block,
    level: u32,
    scale: usize,
    blast_radius: usize,
    score: f64,
    lines: u32,
    chain: u32,
    blasted: usize,
    messages: Vec<String>,
    game_over: bool,
}

impl Turn {
    /// Stamp `placed` into `grid` and start settling. `next` is the queued block
    /// checked for game over once everything has come to rest.
    pub fn begin(mut grid: ParticleGrid, placed: &Block, next: Block, level: u32, config: &Config) -> Self {
        let cell = Cell::from(placed.tag);
        for (row, col) in placed.particle_cells(config.particle_scale) {
            if row >= 0 && col >= 0 && grid.contains(row as usize, col as usize) {
                grid[(row as usize, col as usize)] = cell;
            }
        }
        let after = if placed.tag == Tag::Bomb {
            After::Explode
        } else {
            After::Clear
        };
        let scratch = ParticleGrid::new(grid.width(), grid.height());
        Self {
            grid,
            scratch,
            phase: Phase::Settle(after),
            next,
            level: level.max(1),
            scale: config.particle_scale,
            blast_radius: config.blast_radius(),
            score: 0.0,
            lines: 0,
            chain: 0,
            blasted: 0,
            messages: Vec::new(),
            game_over: false,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        match self.phase {
            Phase::Settle(_) => TurnPhase::Resting,
            Phase::Explode => TurnPhase::Exploding,
            Phase::Clear => TurnPhase::Clearing,
            Phase::SpawnCheck => TurnPhase::SpawnCheck,
            Phase::Done => TurnPhase::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Working grid as of the last frame.
    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    /// Advance to the next displayable frame; `None` once the turn is over.
    pub fn next_frame<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TurnFrame> {
        loop {
            match self.phase {
                Phase::Settle(after) => {
                    if step_into(&self.grid, &mut self.scratch, rng) {
                        std::mem::swap(&mut self.grid, &mut self.scratch);
                        return Some(TurnFrame::Settle(self.grid.clone()));
                    }
                    self.phase = match after {
                        After::Explode => Phase::Explode,
                        After::Clear => Phase::Clear,
                    };
                }
                Phase::Explode => {
                    let blast = resolve_explosions(&self.grid, self.blast_radius);
                    if blast.is_empty() {
                        self.phase = Phase::Clear;
                        continue;
                    }
                    let points = scoring::blast_points(blast.destroyed(), self.level);
                    self.score += points;
                    self.blasted += blast.destroyed();
                    let frame = TurnFrame::Explode {
                        grid: self.grid.clone(),
                        cells: blast.cells,
                        points,
                    };
                    self.remove(frame.highlighted());
                    self.phase = Phase::Settle(After::Clear);
                    return Some(frame);
                }
                Phase::Clear => {
                    let report = find_clearable_regions(&self.grid);
                    if report.is_empty() {
                        self.phase = Phase::SpawnCheck;
                        continue;
                    }
                    self.chain += 1;
                    self.lines += report.region_count;
                    let points = scoring::clear_points(report.cells.len(), self.level, report.region_count, self.chain);
                    self.score += points;
                    let message = scoring::combo_message(report.region_count, self.chain);
                    if let Some(m) = &message {
                        self.messages.push(m.clone());
                    }
                    let frame = TurnFrame::Clear {
                        grid: self.grid.clone(),
                        cells: report.cells,
                        regions: report.region_count,
                        chain: self.chain,
                        points,
                        message,
                    };
                    self.remove(frame.highlighted());
                    self.phase = Phase::Settle(After::Clear);
                    return Some(frame);
                }
                Phase::SpawnCheck => {
                    self.game_over = collides(&self.next, &self.grid, self.scale);
                    self.phase = Phase::Done;
                    log::debug!(
                        "turn done: score +{:.0}, {} regions over {} chains, {} blasted, game_over={}",
                        self.score,
                        self.lines,
                        self.chain,
                        self.blasted,
                        self.game_over
                    );
                }
                Phase::Done => return None,
            }
        }
    }

    fn remove(&mut self, cells: &[(usize, usize)]) {
        for &pos in cells {
            self.grid[pos] = Cell::Empty;
        }
    }

    /// Pull frames lazily with the given randomness source.
    pub fn frames<'a, R: Rng + ?Sized>(&'a mut self, rng: &'a mut R) -> TurnFrames<'a, R> {
        TurnFrames { turn: self, rng }
    }

    /// Run any remaining frames and return the outcome.
    pub fn finish<R: Rng + ?Sized>(mut self, rng: &mut R) -> TurnResult {
        while self.next_frame(rng).is_some() {}
        TurnResult {
            grid: self.grid,
            score: self.score.round() as u64,
            lines_cleared: self.lines,
            chains: self.chain,
            blasted: self.blasted,
            messages: self.messages,
            game_over: self.game_over,
        }
    }
}

pub struct TurnFrames<'a, R: ?Sized> {
    turn: &'a mut Turn,
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Iterator for TurnFrames<'_, R> {
    type Item = TurnFrame;

    fn next(&mut self) -> Option<TurnFrame> {
        self.turn.next_frame(&mut *self.rng)
    }
}
