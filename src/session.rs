//! Game session: the falling block, the resting grid, score and the turn in flight.
//!
//! Player commands are only accepted between turns. Placing a block starts a
//! [`Turn`]; the front-end pulls its frames through [`Session::advance`] and
//! the outcome is folded back into the session when the turn ends.

use crate::block::{Block, BlockSpawner};
use crate::collision::collides;
use crate::config::{Config, ConfigError};
use crate::grid::ParticleGrid;
use crate::scoring;
use crate::snapshot::{self, Snapshot, SnapshotError, unix_millis};
use crate::turn::{Turn, TurnFrame, TurnResult};
use rand::Rng;
use std::path::Path;
use std::time::SystemTime;

/// Player input the session understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    spawner: BlockSpawner,
    grid: ParticleGrid,
    current: Option<Block>,
    next: Block,
    score: u64,
    level: u32,
    lines_cleared: u32,
    turn: Option<Turn>,
    game_over: bool,
    messages: Vec<String>,
}

impl Session {
    /// Fresh game on an empty grid.
    pub fn new<R: Rng + ?Sized>(config: Config, level: u32, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let spawner = BlockSpawner::new(&config);
        let current = spawner.next_block(rng);
        let next = spawner.next_block(rng);
        Ok(Self {
            grid: ParticleGrid::new(config.grid_width(), config.grid_height()),
            spawner,
            current: Some(current),
            next,
            score: 0,
            level: level.max(1),
            lines_cleared: 0,
            turn: None,
            game_over: false,
            messages: Vec::new(),
            config,
        })
    }

    /// Resume from a saved game. The snapshot must be fresh and fit `config`.
    pub fn from_snapshot(config: Config, snap: Snapshot, now: SystemTime) -> Result<Self, SnapshotError> {
        snap.validate(&config, now)?;
        let grid = ParticleGrid::from_rows(&snap.grid)?;
        if collides(&snap.current_block, &grid, config.particle_scale) {
            return Err(SnapshotError::MalformedBlock);
        }
        Ok(Self {
            spawner: BlockSpawner::new(&config),
            grid,
            current: Some(snap.current_block),
            next: snap.next_block,
            score: snap.score,
            level: snap.level.max(1),
            lines_cleared: snap.lines_cleared,
            turn: None,
            game_over: false,
            messages: Vec::new(),
            config,
        })
    }

    /// Load the save at `path` if there is a usable one, otherwise start fresh.
    /// Unusable saves are deleted. The flag tells whether a save was restored.
    pub fn restore_or_new<R: Rng + ?Sized>(
        config: Config,
        level: u32,
        path: &Path,
        now: SystemTime,
        rng: &mut R,
    ) -> Result<(Self, bool), ConfigError> {
        config.validate()?;
        if path.exists() {
            match snapshot::load(path).and_then(|snap| Self::from_snapshot(config.clone(), snap, now)) {
                Ok(session) => {
                    log::info!("restored save from {}", path.display());
                    return Ok((session, true));
                }
                Err(e) => {
                    log::warn!("discarding save {}: {e}", path.display());
                    if let Err(e) = snapshot::remove(path) {
                        log::warn!("could not delete save: {e}");
                    }
                }
            }
        }
        Ok((Self::new(config, level, rng)?, false))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Grid to draw: the turn's working grid while one is running.
    pub fn grid(&self) -> &ParticleGrid {
        self.turn.as_ref().map_or(&self.grid, Turn::grid)
    }

    /// The falling block; `None` during a turn and after game over.
    pub fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    pub fn next(&self) -> &Block {
        &self.next
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    /// Combo and chain banners from the last finished turn.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_simulating(&self) -> bool {
        self.turn.is_some()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Apply a command. Returns whether it changed anything.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::Rotate => self.rotate(),
            Command::SoftDrop => self.soft_drop(),
            Command::HardDrop => self.hard_drop(),
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.try_shift(0, -1)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_shift(0, 1)
    }

    /// Clockwise, kept only if the turned block fits. Bombs never turn.
    pub fn rotate(&mut self) -> bool {
        let Some(turned) = self.accepting().and_then(Block::rotated) else {
            return false;
        };
        self.try_replace(turned)
    }

    /// One row down; placing the block when it cannot go further.
    pub fn soft_drop(&mut self) -> bool {
        if self.accepting().is_none() {
            return false;
        }
        if !self.try_shift(1, 0) {
            self.place();
        }
        true
    }

    /// Straight down until blocked, then place.
    pub fn hard_drop(&mut self) -> bool {
        if self.accepting().is_none() {
            return false;
        }
        while self.try_shift(1, 0) {}
        self.place();
        true
    }

    /// The falling block, if commands are accepted right now.
    fn accepting(&self) -> Option<&Block> {
        if self.game_over || self.turn.is_some() {
            log::trace!("command ignored: game_over={} simulating={}", self.game_over, self.turn.is_some());
            return None;
        }
        self.current.as_ref()
    }

    fn try_shift(&mut self, d_row: i32, d_col: i32) -> bool {
        let Some(moved) = self.accepting().map(|b| b.shifted(d_row, d_col)) else {
            return false;
        };
        self.try_replace(moved)
    }

    fn try_replace(&mut self, candidate: Block) -> bool {
        if collides(&candidate, &self.grid, self.config.particle_scale) {
            return false;
        }
        self.current = Some(candidate);
        true
    }

    fn place(&mut self) {
        let Some(block) = self.current.take() else {
            return;
        };
        log::debug!("placing {:?} at {:?}", block.tag, block.position);
        self.turn = Some(Turn::begin(
            self.grid.clone(),
            &block,
            self.next.clone(),
            self.level,
            &self.config,
        ));
    }

    /// Next frame of the running turn. Returns `None` when there is no turn,
    /// or when the turn just ended and its outcome has been applied.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TurnFrame> {
        let frame = self.turn.as_mut()?.next_frame(rng);
        if frame.is_none() {
            self.complete_turn(rng);
        }
        frame
    }

    /// Run the rest of the current turn without pacing and apply it.
    pub fn complete_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TurnResult> {
        let result = self.turn.take()?.finish(rng);
        self.apply_result(&result, rng);
        Some(result)
    }

    fn apply_result<R: Rng + ?Sized>(&mut self, result: &TurnResult, rng: &mut R) {
        self.grid = result.grid.clone();
        self.score += result.score;
        self.lines_cleared += result.lines_cleared;
        self.level = scoring::level_for_lines(self.lines_cleared, self.config.lines_per_level, self.level);
        self.messages.clone_from(&result.messages);

        if result.game_over {
            self.game_over = true;
            log::info!(
                "game over: score {} level {} lines {}",
                self.score,
                self.level,
                self.lines_cleared
            );
            return;
        }
        let upcoming = self.spawner.next_block(rng);
        self.current = Some(std::mem::replace(&mut self.next, upcoming));
    }

    /// Resumable state, or `None` mid-turn and after game over.
    pub fn snapshot(&self, now: SystemTime) -> Option<Snapshot> {
        if self.game_over || self.turn.is_some() {
            return None;
        }
        Some(Snapshot {
            grid: self.grid.rows(),
            current_block: self.current.clone()?,
            next_block: self.next.clone(),
            score: self.score,
            level: self.level,
            lines_cleared: self.lines_cleared,
            timestamp: unix_millis(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Position, TetrominoKind};
    use crate::grid::{Cell, Tag};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(11)
    }

    fn snapshot_with(grid: Vec<Vec<Cell>>, current: Block, next: Block) -> Snapshot {
        Snapshot {
            grid,
            current_block: current,
            next_block: next,
            score: 0,
            level: 1,
            lines_cleared: 0,
            timestamp: unix_millis(SystemTime::now()),
        }
    }

    fn o_block(tag: Tag) -> Block {
        Block::spawn(TetrominoKind::O.shape(), tag, 12)
    }

    #[test]
    fn new_session_starts_with_a_block_in_play() {
        let s = Session::new(Config::default(), 1, &mut rng()).unwrap();
        assert!(s.current().is_some());
        assert!(!s.is_simulating());
        assert!(!s.is_game_over());
        assert_eq!(s.grid().occupied_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config {
            particle_scale: 0,
            ..Config::default()
        };
        assert!(Session::new(config, 1, &mut rng()).is_err());
    }

    #[test]
    fn moves_stop_at_the_walls() {
        let empty = vec![vec![Cell::Empty; 48]; 80];
        let snap = snapshot_with(empty, o_block(Tag::Color(1)), o_block(Tag::Color(2)));
        let mut s = Session::from_snapshot(Config::default(), snap, SystemTime::now()).unwrap();
        let mut steps = 0;
        while s.move_left() {
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(s.current().unwrap().position, Position { row: 0, col: 0 });
        while s.move_right() {}
        assert_eq!(s.current().unwrap().position.col, 10);
    }

    #[test]
    fn commands_are_ignored_while_simulating() {
        let config = Config {
            special_block_chance: 0.0,
            ..Config::default()
        };
        let mut s = Session::new(config, 1, &mut rng()).unwrap();
        assert!(s.hard_drop());
        assert!(s.is_simulating());
        assert!(s.current().is_none());
        assert!(!s.move_left());
        assert!(!s.rotate());
        assert!(!s.soft_drop());
        assert!(!s.apply(Command::HardDrop));
        assert!(s.snapshot(SystemTime::now()).is_none());

        let mut r = rng();
        while s.advance(&mut r).is_some() {}
        assert!(!s.is_simulating());
        assert!(s.current().is_some());
        assert!(s.grid().occupied_count() > 0);
    }

    #[test]
    fn bomb_refuses_to_rotate() {
        let empty = vec![vec![Cell::Empty; 48]; 80];
        let snap = snapshot_with(empty, Block::bomb(12), o_block(Tag::Color(0)));
        let mut s = Session::from_snapshot(Config::default(), snap, SystemTime::now()).unwrap();
        assert!(!s.rotate());
        assert!(s.move_right());
    }

    #[test]
    fn next_block_is_promoted_after_a_turn() {
        let mut s = Session::new(Config::default(), 1, &mut rng()).unwrap();
        let queued = s.next().clone();
        s.hard_drop();
        s.complete_turn(&mut rng()).unwrap();
        assert_eq!(s.current(), Some(&queued));
    }

    #[test]
    fn full_spawn_area_ends_the_game() {
        // Inert bombs below the top two block rows; the placed block lands on
        // them and blocks the spawn area.
        let mut grid = vec![vec![Cell::Empty; 48]; 80];
        for row in grid.iter_mut().skip(8) {
            row.fill(Cell::Bomb);
        }
        let snap = snapshot_with(grid, o_block(Tag::Color(1)), o_block(Tag::Color(2)));
        let mut s = Session::from_snapshot(Config::default(), snap, SystemTime::now()).unwrap();
        assert!(s.hard_drop());
        let result = s.complete_turn(&mut rng()).unwrap();
        assert!(result.game_over);
        assert!(s.is_game_over());
        assert!(!s.move_left());
        assert!(s.snapshot(SystemTime::now()).is_none());
    }

    #[test]
    fn snapshot_resumes_the_same_game() {
        let mut s = Session::new(Config::default(), 3, &mut rng()).unwrap();
        s.hard_drop();
        s.complete_turn(&mut rng());
        let now = SystemTime::now();
        let snap = s.snapshot(now).unwrap();
        let resumed = Session::from_snapshot(Config::default(), snap, now).unwrap();
        assert_eq!(resumed.grid(), s.grid());
        assert_eq!(resumed.current(), s.current());
        assert_eq!(resumed.next(), s.next());
        assert_eq!(resumed.score(), s.score());
        assert_eq!(resumed.level(), 3);
    }

    #[test]
    fn restore_or_new_falls_back_and_deletes_bad_saves() {
        let path = std::env::temp_dir()
            .join(format!("sandblast-session-{}", std::process::id()))
            .join("save.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[]").unwrap();
        let (s, restored) =
            Session::restore_or_new(Config::default(), 1, &path, SystemTime::now(), &mut rng()).unwrap();
        assert!(!restored);
        assert!(!path.exists());
        assert_eq!(s.score(), 0);

        let snap = s.snapshot(SystemTime::now()).unwrap();
        snapshot::store(&path, &snap).unwrap();
        let (again, restored) =
            Session::restore_or_new(Config::default(), 1, &path, SystemTime::now(), &mut rng()).unwrap();
        assert!(restored);
        assert_eq!(again.current(), s.current());
        snapshot::remove(&path).unwrap();
    }

    #[test]
    fn save_with_block_outside_the_board_starts_fresh() {
        let path = std::env::temp_dir()
            .join(format!("sandblast-offboard-{}", std::process::id()))
            .join("save.json");
        let mut current = o_block(Tag::Color(1));
        current.position = Position { row: 1_073_741_824, col: 0 };
        let mut snap = snapshot_with(vec![vec![Cell::Empty; 48]; 80], current, o_block(Tag::Color(2)));
        snap.score = 999;
        assert!(matches!(
            Session::from_snapshot(Config::default(), snap.clone(), SystemTime::now()),
            Err(SnapshotError::MalformedBlock)
        ));

        snapshot::store(&path, &snap).unwrap();
        let (s, restored) =
            Session::restore_or_new(Config::default(), 1, &path, SystemTime::now(), &mut rng()).unwrap();
        assert!(!restored);
        assert!(!path.exists());
        assert_eq!(s.score(), 0);
        assert_eq!(s.current().unwrap().position.row, 0);
    }
}
