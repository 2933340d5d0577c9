//! Sand fall: one discrete gravity step, and settling to rest.
//!
//! A step reads only the pre-step grid and writes into a second buffer, so a
//! particle that arrived this step never moves again within it, and a
//! destination can be claimed by at most one particle. Particles only ever move
//! to a higher row, so repeated steps always reach a step with no movement.

use crate::grid::{Cell, ParticleGrid};
use rand::Rng;

/// Advance `src` by one step into `dst` (same dimensions). Returns whether any particle moved.
///
/// Rows are scanned bottom-up, columns left to right. Each particle falls
/// straight down if it can, otherwise slides to a free lower diagonal (fair coin
/// when both are free), otherwise stays.
pub fn step_into<R: Rng + ?Sized>(src: &ParticleGrid, dst: &mut ParticleGrid, rng: &mut R) -> bool {
    debug_assert_eq!((src.width(), src.height()), (dst.width(), dst.height()));
    let (w, h) = (src.width(), src.height());
    dst.fill(Cell::Empty);
    if h == 0 {
        return false;
    }

    // Floor row cannot fall further.
    for col in 0..w {
        dst[(h - 1, col)] = src[(h - 1, col)];
    }

    let mut moved = false;
    for row in (0..h - 1).rev() {
        for col in 0..w {
            let cell = src[(row, col)];
            if cell.is_empty() {
                continue;
            }
            let below = row + 1;
            let target = if is_free(src, dst, below, col) {
                Some(col)
            } else {
                let left = col > 0 && is_free(src, dst, below, col - 1);
                let right = col + 1 < w && is_free(src, dst, below, col + 1);
                match (left, right) {
                    (true, true) => Some(if rng.random_bool(0.5) { col - 1 } else { col + 1 }),
                    (true, false) => Some(col - 1),
                    (false, true) => Some(col + 1),
                    (false, false) => None,
                }
            };

            match target {
                Some(c) => {
                    dst[(below, c)] = cell;
                    moved = true;
                }
                None => dst[(row, col)] = cell,
            }
        }
    }
    moved
}

/// Empty before the step and not yet claimed during it.
#[inline]
fn is_free(src: &ParticleGrid, dst: &ParticleGrid, row: usize, col: usize) -> bool {
    src[(row, col)].is_empty() && dst[(row, col)].is_empty()
}

/// One step into a fresh grid.
pub fn step_once<R: Rng + ?Sized>(grid: &ParticleGrid, rng: &mut R) -> (ParticleGrid, bool) {
    let mut next = ParticleGrid::new(grid.width(), grid.height());
    let moved = step_into(grid, &mut next, rng);
    (next, moved)
}

/// Step until nothing moves; returns the resting grid.
pub fn run_to_rest<R: Rng + ?Sized>(grid: ParticleGrid, rng: &mut R) -> ParticleGrid {
    let mut frames = settle(grid, rng);
    while frames.advance() {}
    frames.into_grid()
}

/// Lazy sequence of intermediate grids, one per step that moved something.
/// The sequence ends at the first quiescent step; each call starts a new one.
pub fn settle<R: Rng + ?Sized>(grid: ParticleGrid, rng: &mut R) -> Settle<'_, R> {
    let scratch = ParticleGrid::new(grid.width(), grid.height());
    Settle {
        current: grid,
        scratch,
        rng,
        done: false,
    }
}

/// Double-buffered settling iterator. Yields owned snapshots, never touched again after yielding.
pub struct Settle<'r, R: ?Sized> {
    current: ParticleGrid,
    scratch: ParticleGrid,
    rng: &'r mut R,
    done: bool,
}

impl<R: Rng + ?Sized> Settle<'_, R> {
    fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        if step_into(&self.current, &mut self.scratch, &mut *self.rng) {
            std::mem::swap(&mut self.current, &mut self.scratch);
            true
        } else {
            self.done = true;
            false
        }
    }

    /// Latest grid (the resting grid once the iterator is exhausted).
    pub fn grid(&self) -> &ParticleGrid {
        &self.current
    }

    pub fn into_grid(self) -> ParticleGrid {
        self.current
    }
}

impl<R: Rng + ?Sized> Iterator for Settle<'_, R> {
    type Item = ParticleGrid;

    fn next(&mut self) -> Option<ParticleGrid> {
        self.advance().then(|| self.current.clone())
    }
}
