//! tile-merge: the grid engine of a 4x4 sliding-tile merge puzzle (2048-style)
//!
//! This crate provides:
//! - A tile-list `Grid` engine (`engine` module): sliding, merge-once resolution,
//!   uniform tile dealing, score/best score and game-over detection
//! - A change-event stream for presentation layers (`events` module)
//! - Save-game persistence behind a `SaveStore` trait (`serialization` module)
//! - TOML-backed engine settings (`config` module) and text input mapping (`input` module)
//!
//! Quick start:
//! ```
//! use tile_merge::config::EngineConfig;
//! use tile_merge::engine::{Grid, Move};
//! use tile_merge::serialization::MemoryStore;
//!
//! // Seeded config for a reproducible game; saves go to memory
//! let store = MemoryStore::default();
//! let mut grid = Grid::open(EngineConfig::seeded(42), Box::new(store.clone()));
//! assert_eq!(grid.tiles().len(), 2);
//!
//! let outcome = grid.submit_direction(Move::Left);
//! assert!(grid.best_score() >= grid.score());
//! if outcome.moved {
//!     assert_eq!(store.contents(), Some(grid.snapshot()));
//! }
//!
//! // Presentation layers consume what changed
//! for event in grid.drain_events() {
//!     println!("{event:?}");
//! }
//! ```
//!
pub mod config;
pub mod engine;
pub mod events;
pub mod input;
pub mod serialization;
