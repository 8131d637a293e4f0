//! A bounded-depth agent for playing the board game 'Connect 4'
//!
//! This agent runs a depth-limited minimax search with alpha-beta pruning
//! over a heuristic evaluation, reusing work between turns through a
//! transposition cache that can be persisted to disk.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_bot::{bitboard::{BitBoard, Side}, search::SearchEngine};
//! use connect4_bot::transposition_table::TranspositionCache;
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = BitBoard::from_moves("", Side::Bot)?;
//! let mut engine = SearchEngine::new(TranspositionCache::new());
//! let result = engine.search(&board, 1);
//!
//! assert_eq!(result.column, Some(3));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod config;

pub mod bitboard;

pub mod evaluator;

pub mod transposition_table;

pub mod search;

pub mod scheduler;


pub use bitboard::{BitBoard, Cell, Side};
pub use config::EngineConfig;
pub use error::{BoardError, EngineError};
pub use scheduler::{DepthScheduler, MoveSource, TurnReport};
pub use search::{SearchEngine, SearchResult};
pub use transposition_table::{Bound, CacheEntry, CacheKey, TranspositionCache};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// the move encoding in the cache file stores a column in a single byte
const_assert!(WIDTH < u8::MAX as usize);
