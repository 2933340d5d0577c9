//! Particle grid: fixed-size 2D array of cells. Row 0 is the top.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// What a block (and every particle it crumbles into) is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Palette colour index.
    Color(u8),
    /// Explodes after settling; never part of a colour region.
    Bomb,
}

impl Tag {
    /// Bomb blocks keep their square footprint.
    #[inline]
    pub fn can_rotate(self) -> bool {
        match self {
            Self::Color(_) => true,
            Self::Bomb => false,
        }
    }
}

/// Single particle cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Sand(u8),
    Bomb,
}

impl Cell {
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    /// Colour of a sand particle; `None` for empty cells and bombs.
    #[inline]
    pub fn color(self) -> Option<u8> {
        match self {
            Self::Sand(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Tag> for Cell {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Color(c) => Self::Sand(c),
            Tag::Bomb => Self::Bomb,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside the {height}x{width} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
    #[error("row {row} has {len} cells, expected {width}")]
    Ragged { row: usize, len: usize, width: usize },
    #[error("grid must have at least one row and one column")]
    Empty,
}

/// `height x width` particles stored row-major. Dimensions never change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl ParticleGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    /// Build from row vectors; every row must have the same length.
    pub fn from_rows(rows: &[Vec<Cell>]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, r) in rows.iter().enumerate() {
            if r.len() != width {
                return Err(GridError::Ragged {
                    row,
                    len: r.len(),
                    width,
                });
            }
            cells.extend_from_slice(r);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width
    }

    fn check(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if self.contains(row, col) {
            Ok(row * self.width + col)
        } else {
            Err(GridError::OutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Cell, GridError> {
        self.check(row, col).map(|i| self.cells[i])
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), GridError> {
        let i = self.check(row, col)?;
        self.cells[i] = cell;
        Ok(())
    }

    /// Signed lookup for neighbour scans; `None` off the board.
    #[inline]
    pub fn probe(&self, row: isize, col: isize) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        let (r, c) = (row as usize, col as usize);
        self.contains(r, c).then(|| self.cells[r * self.width + c])
    }

    /// Empty every cell in `positions`.
    pub fn remove(&mut self, positions: &[(usize, usize)]) -> Result<(), GridError> {
        for &(row, col) in positions {
            self.set(row, col, Cell::Empty)?;
        }
        Ok(())
    }

    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// `(row, col, cell)` for every non-empty cell in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(move |(i, c)| (i / w, i % w, *c))
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells.chunks(self.width).map(<[Cell]>::to_vec).collect()
    }
}

impl Index<(usize, usize)> for ParticleGrid {
    type Output = Cell;

    /// Panics outside the grid; use [`ParticleGrid::get`] for a checked read.
    fn index(&self, (row, col): (usize, usize)) -> &Cell {
        assert!(
            self.contains(row, col),
            "cell ({row}, {col}) outside {}x{} grid",
            self.height,
            self.width
        );
        &self.cells[row * self.width + col]
    }
}

impl IndexMut<(usize, usize)> for ParticleGrid {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Cell {
        assert!(
            self.contains(row, col),
            "cell ({row}, {col}) outside {}x{} grid",
            self.height,
            self.width
        );
        &mut self.cells[row * self.width + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_empty() {
        let g = ParticleGrid::new(48, 80);
        assert_eq!((g.width(), g.height()), (48, 80));
        assert_eq!(g.occupied_count(), 0);
        assert_eq!(g.get(79, 47), Ok(Cell::Empty));
    }

    #[test]
    fn get_and_set_fail_out_of_bounds() {
        let mut g = ParticleGrid::new(4, 3);
        assert!(matches!(g.get(3, 0), Err(GridError::OutOfBounds { row: 3, .. })));
        assert!(matches!(g.get(0, 4), Err(GridError::OutOfBounds { col: 4, .. })));
        assert!(g.set(3, 0, Cell::Sand(1)).is_err());
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn clone_is_deep() {
        let mut a = ParticleGrid::new(4, 4);
        a.set(1, 1, Cell::Sand(2)).unwrap();
        let mut b = a.clone();
        b.set(1, 1, Cell::Empty).unwrap();
        b.set(2, 2, Cell::Bomb).unwrap();
        assert_eq!(a[(1, 1)], Cell::Sand(2));
        assert_eq!(a[(2, 2)], Cell::Empty);
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let rows = vec![vec![Cell::Empty; 3], vec![Cell::Empty; 2]];
        assert_eq!(
            ParticleGrid::from_rows(&rows),
            Err(GridError::Ragged {
                row: 1,
                len: 2,
                width: 3
            })
        );
    }

    #[test]
    fn rows_round_trip() {
        let mut g = ParticleGrid::new(3, 2);
        g[(1, 2)] = Cell::Sand(0);
        let back = ParticleGrid::from_rows(&g.rows()).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn probe_handles_negative_coords() {
        let g = ParticleGrid::new(2, 2);
        assert_eq!(g.probe(-1, 0), None);
        assert_eq!(g.probe(0, 2), None);
        assert_eq!(g.probe(1, 1), Some(Cell::Empty));
    }

    #[test]
    fn bomb_tag_cannot_rotate() {
        assert!(Tag::Color(3).can_rotate());
        assert!(!Tag::Bomb.can_rotate());
        assert_eq!(Cell::from(Tag::Bomb), Cell::Bomb);
    }
}
