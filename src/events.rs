//! Change events emitted by [`Grid`](crate::engine::Grid) for presentation layers.
//!
//! Events are buffered in emission order and taken with
//! [`Grid::drain_events`](crate::engine::Grid::drain_events). `Moved` and
//! `ValueChanged` are only emitted when the new value differs from the old one.

use crate::engine::{Coord, TileId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    /// A tile entered the grid (dealt or loaded from a save).
    Created { id: TileId, coord: Coord, value: u8 },
    /// A tile slid during a move.
    Moved { id: TileId, from: Coord, to: Coord },
    /// A tile's exponent grew through a merge.
    ValueChanged { id: TileId, value: u8 },
    /// A tile left the grid (merged away or cleared on restart).
    Removed { id: TileId },
    ScoreChanged { score: u64, best_score: u64 },
    /// No legal move remains.
    GameOver { score: u64, best_score: u64 },
}
