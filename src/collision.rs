//! Block-against-grid collision.

use crate::block::Block;
use crate::grid::ParticleGrid;

/// True if `block` cannot sit at its position: any expanded particle is left of
/// column 0, right of the last column, below the floor, or on an occupied cell.
/// Rows above the top are only bounds-checked so pieces can spawn partly hidden.
pub fn collides(block: &Block, grid: &ParticleGrid, scale: usize) -> bool {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    for (row, col) in block.particle_cells(scale) {
        if col < 0 || col >= w || row >= h {
            return true;
        }
        if row < 0 {
            continue;
        }
        if !grid[(row as usize, col as usize)].is_empty() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Position, TetrominoKind};
    use crate::grid::{Cell, Tag};

    fn i_block(row: i32, col: i32) -> Block {
        Block {
            shape: TetrominoKind::I.shape(),
            tag: Tag::Color(0),
            position: Position { row, col },
        }
    }

    #[test]
    fn out_of_bounds_always_collides() {
        let g = ParticleGrid::new(48, 80);
        assert!(collides(&i_block(0, -1), &g, 4));
        assert!(collides(&i_block(0, 9), &g, 4));
        assert!(collides(&i_block(20, 0), &g, 4));
        assert!(!collides(&i_block(19, 8), &g, 4));
    }

    #[test]
    fn rows_above_top_are_not_checked_against_cells() {
        let mut g = ParticleGrid::new(48, 80);
        g.fill(Cell::Sand(2));
        // Entirely above the visible board: only bounds matter.
        assert!(!collides(&i_block(-1, 0), &g, 4));
        // Still rejected when horizontally out of range.
        assert!(collides(&i_block(-1, -1), &g, 4));
    }

    #[test]
    fn occupied_particle_collides() {
        let mut g = ParticleGrid::new(48, 80);
        g.set(79, 15, Cell::Sand(1)).unwrap();
        assert!(collides(&i_block(19, 0), &g, 4));
        assert!(!collides(&i_block(19, 4), &g, 4));
        assert!(!collides(&i_block(18, 0), &g, 4));
    }
}
