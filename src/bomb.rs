//! Bomb blasts: every particle within the blast radius of any bomb particle.

use crate::grid::{Cell, ParticleGrid};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlastReport {
    /// Union of all blasts, bombs included; every coordinate appears once.
    pub cells: Vec<(usize, usize)>,
    /// Bomb particles that went off.
    pub bomb_count: usize,
}

impl BlastReport {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Blasted particles that were not bombs themselves.
    pub fn destroyed(&self) -> usize {
        self.cells.len().saturating_sub(self.bomb_count)
    }
}

/// Collect every non-empty cell whose Euclidean distance to some bomb is at
/// most `radius` particles. Overlapping blasts are merged.
pub fn resolve_explosions(grid: &ParticleGrid, radius: usize) -> BlastReport {
    let bombs: Vec<(usize, usize)> = grid
        .occupied()
        .filter(|&(_, _, cell)| cell == Cell::Bomb)
        .map(|(r, c, _)| (r, c))
        .collect();
    if bombs.is_empty() {
        return BlastReport::default();
    }

    let (w, h) = (grid.width(), grid.height());
    let r2 = radius * radius;
    let mut hit = vec![false; w * h];
    for &(br, bc) in &bombs {
        let rows = br.saturating_sub(radius)..=(br + radius).min(h - 1);
        for row in rows {
            let cols = bc.saturating_sub(radius)..=(bc + radius).min(w - 1);
            for col in cols {
                let (dr, dc) = (row.abs_diff(br), col.abs_diff(bc));
                if dr * dr + dc * dc <= r2 && !grid[(row, col)].is_empty() {
                    hit[row * w + col] = true;
                }
            }
        }
    }

    let cells = hit
        .iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .map(|(i, _)| (i / w, i % w))
        .collect();
    BlastReport {
        cells,
        bomb_count: bombs.len(),
    }
}
