//! Region clearing: 8-connected same-colour components that reach the right wall.

use crate::grid::{Cell, ParticleGrid};
use std::collections::VecDeque;

const NEIGHBOURS_8: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Particles to remove in one clearing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Union of all clearable components; every coordinate appears once.
    pub cells: Vec<(usize, usize)>,
    /// Number of clearable components found.
    pub region_count: u32,
}

impl ClearReport {
    pub fn is_empty(&self) -> bool {
        self.region_count == 0
    }
}

/// Flood-fill every sand component (bombs excluded) in row-major order and keep
/// the ones with at least one particle in the last column.
pub fn find_clearable_regions(grid: &ParticleGrid) -> ClearReport {
    let (w, h) = (grid.width(), grid.height());
    let mut visited = vec![false; w * h];
    let mut report = ClearReport::default();
    let mut queue = VecDeque::new();
    let mut component = Vec::new();

    for row in 0..h {
        for col in 0..w {
            let Cell::Sand(color) = grid[(row, col)] else {
                continue;
            };
            if visited[row * w + col] {
                continue;
            }

            component.clear();
            visited[row * w + col] = true;
            queue.push_back((row, col));
            let mut touches_right = false;

            while let Some((r, c)) = queue.pop_front() {
                component.push((r, c));
                touches_right |= c == w - 1;
                for (dr, dc) in NEIGHBOURS_8 {
                    let (nr, nc) = (r as isize + dr, c as isize + dc);
                    if grid.probe(nr, nc) != Some(Cell::Sand(color)) {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if !visited[nr * w + nc] {
                        visited[nr * w + nc] = true;
                        queue.push_back((nr, nc));
                    }
                }
            }

            if touches_right {
                report.region_count += 1;
                report.cells.extend_from_slice(&component);
            }
        }
    }
    report
}
