//! Falling blocks: shape catalog, rotation, spawning.

use crate::config::Config;
use crate::grid::Tag;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tetromino kinds (I, O, T, L, J, S, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::L, Self::J, Self::S, Self::Z];

    /// Spawn orientation, top row first.
    pub fn shape(self) -> Shape {
        let rows: &[&[u8]] = match self {
            Self::I => &[&[1, 1, 1, 1]],
            Self::O => &[&[1, 1], &[1, 1]],
            Self::T => &[&[0, 1, 0], &[1, 1, 1]],
            Self::L => &[&[0, 0, 1], &[1, 1, 1]],
            Self::J => &[&[1, 0, 0], &[1, 1, 1]],
            Self::S => &[&[0, 1, 1], &[1, 1, 0]],
            Self::Z => &[&[1, 1, 0], &[0, 1, 1]],
        };
        Shape(
            rows.iter()
                .map(|r| r.iter().map(|&b| b == 1).collect())
                .collect(),
        )
    }
}

/// Rectangular boolean footprint of a block in block cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape(pub Vec<Vec<bool>>);

impl Shape {
    /// 2x2 square used by every bomb.
    pub fn square() -> Self {
        TetrominoKind::O.shape()
    }

    pub fn height(&self) -> usize {
        self.0.len()
    }

    pub fn width(&self) -> usize {
        self.0.first().map_or(0, Vec::len)
    }

    /// Non-empty, rectangular and with at least one filled cell.
    pub fn is_well_formed(&self) -> bool {
        let w = self.width();
        w > 0 && self.0.iter().all(|r| r.len() == w) && self.0.iter().flatten().any(|&b| b)
    }

    /// Filled cells as `(row, col)` offsets.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, filled)| **filled)
                .map(move |(c, _)| (r, c))
        })
    }

    /// Quarter turn clockwise: column `c` of the old shape, read bottom-up, becomes row `c`.
    pub fn rotated_cw(&self) -> Self {
        let (h, w) = (self.height(), self.width());
        Self(
            (0..w)
                .map(|c| (0..h).rev().map(|r| self.0[r][c]).collect())
                .collect(),
        )
    }
}

/// Top-left corner of a block in block units. Row may be negative while spawning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub shape: Shape,
    pub tag: Tag,
    pub position: Position,
}

impl Block {
    /// Block centred horizontally on the top row.
    pub fn spawn(shape: Shape, tag: Tag, logical_width: usize) -> Self {
        let col = (logical_width.saturating_sub(shape.width()) / 2) as i32;
        Self {
            shape,
            tag,
            position: Position { row: 0, col },
        }
    }

    pub fn bomb(logical_width: usize) -> Self {
        Self::spawn(Shape::square(), Tag::Bomb, logical_width)
    }

    pub fn shifted(&self, d_row: i32, d_col: i32) -> Self {
        let mut b = self.clone();
        b.position.row += d_row;
        b.position.col += d_col;
        b
    }

    /// Whether the block lies within a `width x height` board of block cells,
    /// allowing it to hang above the top by at most its own height.
    pub fn fits_board(&self, width: usize, height: usize) -> bool {
        let (row, col) = (i64::from(self.position.row), i64::from(self.position.col));
        let (w, h) = (self.shape.width() as i64, self.shape.height() as i64);
        col >= 0 && col + w <= width as i64 && row >= -h && row + h <= height as i64
    }

    /// Clockwise turn, or `None` when the tag forbids rotation.
    pub fn rotated(&self) -> Option<Self> {
        self.tag.can_rotate().then(|| Self {
            shape: self.shape.rotated_cw(),
            tag: self.tag,
            position: self.position,
        })
    }

    /// Every particle coordinate `(row, col)` the block covers once each cell
    /// expands to a `scale x scale` square. Coordinates may lie off the grid.
    pub fn particle_cells(&self, scale: usize) -> impl Iterator<Item = (i32, i32)> + '_ {
        let s = i32::try_from(scale).unwrap_or(i32::MAX);
        let (base_r, base_c) = (self.position.row.saturating_mul(s), self.position.col.saturating_mul(s));
        self.shape.cells().flat_map(move |(r, c)| {
            let r0 = base_r.saturating_add((r as i32).saturating_mul(s));
            let c0 = base_c.saturating_add((c as i32).saturating_mul(s));
            (0..s).flat_map(move |p| (0..s).map(move |q| (r0.saturating_add(p), c0.saturating_add(q))))
        })
    }
}

/// Draws blocks uniformly from the shape catalog and palette.
#[derive(Debug, Clone)]
pub struct BlockSpawner {
    logical_width: usize,
    palette_size: u8,
    special_chance: f64,
}

impl BlockSpawner {
    pub fn new(config: &Config) -> Self {
        Self {
            logical_width: config.logical_width,
            palette_size: config.palette_size,
            special_chance: config.special_block_chance,
        }
    }

    pub fn next_block<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        if rng.random_bool(self.special_chance) {
            return Block::bomb(self.logical_width);
        }
        let kind = TetrominoKind::ALL[rng.random_range(0..TetrominoKind::ALL.len())];
        let color = rng.random_range(0..self.palette_size);
        Block::spawn(kind.shape(), Tag::Color(color), self.logical_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn t_rotates_clockwise() {
        let t = TetrominoKind::T.shape();
        let r = t.rotated_cw();
        // .#.    #.
        // ###    ##
        //        #.
        assert_eq!(
            r,
            Shape(vec![
                vec![true, false],
                vec![true, true],
                vec![true, false]
            ])
        );
        assert_eq!(r.rotated_cw().rotated_cw().rotated_cw(), t);
    }

    #[test]
    fn bomb_does_not_rotate() {
        let b = Block::bomb(12);
        assert!(b.rotated().is_none());
        assert_eq!(b.position, Position { row: 0, col: 5 });
    }

    #[test]
    fn spawn_centres_shape() {
        let i = Block::spawn(TetrominoKind::I.shape(), Tag::Color(0), 12);
        assert_eq!(i.position.col, 4);
        let t = Block::spawn(TetrominoKind::T.shape(), Tag::Color(0), 12);
        assert_eq!(t.position.col, 4);
    }

    #[test]
    fn particle_cells_expand_each_block_cell() {
        let mut b = Block::spawn(TetrominoKind::I.shape(), Tag::Color(1), 12);
        b.position = Position { row: 19, col: 0 };
        let cells: Vec<_> = b.particle_cells(4).collect();
        assert_eq!(cells.len(), 4 * 16);
        assert!(cells.iter().all(|&(r, c)| (76..80).contains(&r) && (0..16).contains(&c)));
    }

    #[test]
    fn far_off_board_positions_do_not_overflow() {
        let mut b = Block::spawn(TetrominoKind::I.shape(), Tag::Color(0), 12);
        b.position = Position { row: 1_073_741_824, col: i32::MAX };
        assert!(!b.fits_board(12, 20));
        assert!(b.particle_cells(4).all(|(r, c)| r == i32::MAX && c == i32::MAX));
    }

    #[test]
    fn fits_board_allows_hanging_above_the_top() {
        let mut b = Block::spawn(TetrominoKind::T.shape(), Tag::Color(0), 12);
        assert!(b.fits_board(12, 20));
        b.position = Position { row: -2, col: 0 };
        assert!(b.fits_board(12, 20));
        b.position.row = -3;
        assert!(!b.fits_board(12, 20));
        b.position = Position { row: 18, col: 9 };
        assert!(b.fits_board(12, 20));
        b.position.row = 19;
        assert!(!b.fits_board(12, 20));
        b.position = Position { row: 0, col: 10 };
        assert!(!b.fits_board(12, 20));
    }

    #[test]
    fn spawner_respects_palette_and_chance() {
        let config = Config {
            special_block_chance: 0.0,
            palette_size: 3,
            ..Config::default()
        };
        let spawner = BlockSpawner::new(&config);
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let b = spawner.next_block(&mut rng);
            assert!(matches!(b.tag, Tag::Color(c) if c < 3));
            assert!(b.shape.is_well_formed());
        }

        let always = BlockSpawner::new(&Config {
            special_block_chance: 1.0,
            ..Config::default()
        });
        assert_eq!(always.next_block(&mut rng), Block::bomb(12));
    }
}
