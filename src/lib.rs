//! Sandblast core: a falling-block puzzle where placed blocks crumble into
//! coloured sand.
//!
//! Blocks are dropped onto a particle grid. Once placed, each block cell
//! becomes a square of particles that settle under gravity. Same-colour
//! regions reaching the right wall are cleared, bombs blast everything nearby,
//! and clears chain until the grid is quiet. The terminal front-end lives in
//! the binary; everything here is deterministic given a random source.

pub mod block;
pub mod bomb;
pub mod clear;
pub mod collision;
pub mod config;
pub mod grid;
pub mod sand;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod turn;

pub use config::Config;
pub use grid::{Cell, ParticleGrid, Tag};
pub use session::{Command, Session};
