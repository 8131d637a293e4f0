//! A depth-limited game tree search for Connect 4

use anyhow::Result;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bitboard::{BitBoard, Side};
use crate::evaluator;
use crate::transposition_table::{Bound, CacheEntry, TranspositionCache};

/// The score of a position the bot has won
pub const BOT_WIN_SCORE: i64 = 100_000_000_000_000;
/// The score of a position the opponent has won
pub const OPPONENT_WIN_SCORE: i64 = -10_000_000_000_000;
/// The score of a full board with no winner
pub const DRAW_SCORE: i64 = 0;

/// The outcome of a search
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SearchResult {
    /// the best column, `None` for positions with no move to make
    pub column: Option<usize>,
    pub score: i64,
    /// the depth the score was computed at, which is deeper than requested
    /// when it comes from the cache
    pub depth: u32,
}

/// A minimax agent with alpha-beta pruning and a transposition cache
///
/// # Notes
/// Scores are always from the bot's point of view: the bot is the maximizing
/// side and the opponent the minimizing side. Leaves are scored with
/// [`evaluator::score`] for the bot, even inside the opponent's subtrees.
///
/// Columns are searched left to right and a later column only replaces the
/// current best move if it scores strictly better, so ties go to the lowest
/// column.
pub struct SearchEngine {
    cache: TranspositionCache,
    stop: Arc<AtomicBool>,
    interruptible: bool,

    /// The number of nodes searched by this `SearchEngine` so far (for diagnostics only)
    pub node_count: usize,
}

impl SearchEngine {
    /// Creates a new `SearchEngine` searching with the given cache
    pub fn new(cache: TranspositionCache) -> Self {
        Self {
            cache,
            stop: Arc::new(AtomicBool::new(false)),
            interruptible: false,
            node_count: 0,
        }
    }

    pub fn cache(&self) -> &TranspositionCache {
        &self.cache
    }

    /// Persists the cache to the file it was loaded from
    pub fn save_cache(&self) -> Result<()> {
        self.cache.save()
    }

    /// The flag that interrupts [`try_search`](Self::try_search) once raised
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Searches `board` to `depth` with the bot to move
    pub fn search(&mut self, board: &BitBoard, depth: u32) -> SearchResult {
        self.pick_move(board, depth, i64::MIN, i64::MAX, true, false)
    }

    /// Performs a full search of `board` within the window `alpha..beta`
    ///
    /// `lazy` accepts cached results from any depth. This search ignores the stop flag.
    pub fn pick_move(
        &mut self,
        board: &BitBoard,
        depth: u32,
        alpha: i64,
        beta: i64,
        maximizing: bool,
        lazy: bool,
    ) -> SearchResult {
        self.interruptible = false;
        let mut board = *board;
        match self.alphabeta(&mut board, depth, alpha, beta, maximizing, lazy) {
            Some(result) => result,
            None => unreachable!("an uninterruptible search always completes"),
        }
    }

    /// Searches `board` to `depth` with the bot to move, giving up once the stop flag is raised
    ///
    /// Returns `None` if the search was interrupted. Nodes left unfinished are not cached.
    pub fn try_search(&mut self, board: &BitBoard, depth: u32, lazy: bool) -> Option<SearchResult> {
        self.interruptible = true;
        let mut board = *board;
        let result = self.alphabeta(&mut board, depth, i64::MIN, i64::MAX, true, lazy);
        self.interruptible = false;
        result
    }

    /// Performs game tree search
    ///
    /// Returns `None` only when interrupted.
    fn alphabeta(
        &mut self,
        board: &mut BitBoard,
        depth: u32,
        mut alpha: i64,
        mut beta: i64,
        maximizing: bool,
        lazy: bool,
    ) -> Option<SearchResult> {
        if self.interruptible && self.stop.load(Ordering::Relaxed) {
            return None;
        }
        self.node_count += 1;

        let key = board.key();
        let to_move = if maximizing { Side::Bot } else { Side::Opponent };

        // a cached result short-circuits the whole subtree
        if let Some(entry) = self.cache.lookup(key, depth, lazy) {
            let usable = entry.to_move == to_move
                && match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => entry.score >= beta,
                    Bound::Upper => entry.score <= alpha,
                };
            if usable {
                return Some(SearchResult {
                    column: entry.column,
                    score: entry.score,
                    depth: entry.depth,
                });
            }
        }

        // a decided game takes precedence over the depth limit
        if board.is_terminal() {
            let score = if board.has_four_in_a_row(Side::Bot) {
                BOT_WIN_SCORE
            } else if board.has_four_in_a_row(Side::Opponent) {
                OPPONENT_WIN_SCORE
            } else {
                DRAW_SCORE
            };
            return Some(SearchResult {
                column: None,
                score,
                depth,
            });
        }

        if depth == 0 {
            return Some(SearchResult {
                column: None,
                score: evaluator::score(board, Side::Bot),
                depth,
            });
        }

        let (alpha_orig, beta_orig) = (alpha, beta);
        let moves = board.valid_moves();
        let mut column = board.valid_moves().next();
        let mut value = if maximizing { i64::MIN } else { i64::MAX };

        for candidate in moves {
            board.play(candidate, to_move);
            let child = self.alphabeta(board, depth - 1, alpha, beta, !maximizing, lazy);
            board.undo(candidate);
            let score = child?.score;

            if maximizing {
                if score > value {
                    value = score;
                    column = Some(candidate);
                }
                alpha = alpha.max(value);
            } else {
                if score < value {
                    value = score;
                    column = Some(candidate);
                }
                beta = beta.min(value);
            }
            // the other side will never allow this branch
            if alpha >= beta {
                break;
            }
        }

        let bound = if value <= alpha_orig {
            Bound::Upper
        } else if value >= beta_orig {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.cache.store(
            key,
            CacheEntry {
                score: value,
                depth,
                column,
                bound,
                to_move,
            },
        );

        Some(SearchResult {
            column,
            score: value,
            depth,
        })
    }
}

/// Picks the move whose resulting position scores best for `side`, without looking further ahead
///
/// Ties go to the lowest column. Returns `None` if the board is full.
pub fn pick_greedy_move(board: &BitBoard, side: Side) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for column in board.valid_moves() {
        let mut next = *board;
        next.play(column, side);
        let score = evaluator::score(&next, side);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((column, score)),
        }
    }
    best.map(|(column, _)| column)
}
