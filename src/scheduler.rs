//! Turn-level control of the search: how deep to look and how long to take
//!
//! Each turn deepens the search one ply at a time up to a depth chosen from
//! how far the game has progressed. A watchdog thread raises the engine's stop
//! flag once the turn's time budget runs out, and the deepest search that
//! finished supplies the move.

use log::{debug, info, warn};
use rand::seq::IteratorRandom;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::bitboard::BitBoard;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::search::{SearchEngine, SearchResult, BOT_WIN_SCORE, OPPONENT_WIN_SCORE};

/// The search depth for a position `ply` half-moves into the game
///
/// Later positions have fewer continuations, so they can be searched deeper.
pub fn target_depth(ply: usize) -> u32 {
    match ply {
        0..=7 => 7,
        8..=13 => 9,
        14..=19 => 11,
        20..=23 => 13,
        24..=27 => 15,
        _ => 17,
    }
}

fn is_decisive(score: i64) -> bool {
    score >= BOT_WIN_SCORE || score <= OPPONENT_WIN_SCORE
}

/// Where the move of a turn came from
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MoveSource {
    /// the deepest finished iteration of the main search
    Search,
    /// the shallow lazy search run when the main search produced nothing in time
    Fallback,
    /// a random open column, when even the fallback produced nothing
    Random,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TurnReport {
    pub column: usize,
    /// `None` for a random move
    pub score: Option<i64>,
    pub depth: u32,
    pub source: MoveSource,
    pub elapsed: Duration,
}

/// Allows exactly one move to be committed per turn
#[derive(Default, Debug)]
pub struct TurnGuard {
    committed: AtomicBool,
}

impl TurnGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the turn's move, returns false if it was already claimed
    pub fn try_commit(&self) -> bool {
        self.committed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }
}

/// A thread that raises a stop flag once its budget has elapsed
pub struct Watchdog {
    handle: Option<JoinHandle<()>>,
    disarmed: Arc<AtomicBool>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn spawn(budget: Duration, poll_interval: Duration, stop: Arc<AtomicBool>) -> Self {
        let disarmed = Arc::new(AtomicBool::new(false));
        let fired = Arc::new(AtomicBool::new(false));

        let handle = {
            let disarmed = disarmed.clone();
            let fired = fired.clone();
            thread::spawn(move || {
                let start = Instant::now();
                loop {
                    if disarmed.load(Ordering::Acquire) {
                        return;
                    }
                    let elapsed = start.elapsed();
                    if elapsed >= budget {
                        fired.store(true, Ordering::Release);
                        stop.store(true, Ordering::Release);
                        return;
                    }
                    // woken early by `disarm`
                    thread::park_timeout(poll_interval.min(budget - elapsed));
                }
            })
        };

        Self {
            handle: Some(handle),
            disarmed,
            fired,
        }
    }

    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Stops the watchdog, returning whether it fired
    pub fn disarm(mut self) -> bool {
        self.shutdown();
        self.fired()
    }

    fn shutdown(&mut self) {
        self.disarmed.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Picks the bot's move each turn of a game
pub struct DepthScheduler {
    config: EngineConfig,
    solved: bool,
}

impl DepthScheduler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            solved: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True once a forced win for the bot has been found this game
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn new_game(&mut self) {
        self.solved = false;
    }

    /// Picks the bot's move for `board` within the configured time budget
    ///
    /// The search deepens one ply at a time up to the target depth. Once a
    /// forced win has been found this game, a single lazy search at the target
    /// depth replaces the deepening, so cached nodes along the won line cut the
    /// tree short while the rest is still searched in full.
    ///
    /// The main search and the fallback run one after the other on the calling
    /// thread, and the move they produce is committed once through a [`TurnGuard`].
    pub fn play_turn(
        &mut self,
        engine: &mut SearchEngine,
        board: &BitBoard,
    ) -> Result<TurnReport, EngineError> {
        if board.is_terminal() {
            return Err(EngineError::GameOver);
        }

        let start = Instant::now();
        let target = target_depth(board.num_moves());
        let (first, lazy) = if self.solved { (target, true) } else { (1, false) };
        let guard = TurnGuard::new();

        let stop = engine.stop_handle();
        stop.store(false, Ordering::Release);
        let watchdog = Watchdog::spawn(
            self.config.soft_budget(),
            self.config.poll_interval,
            stop.clone(),
        );

        let mut best: Option<SearchResult> = None;
        for depth in first..=target {
            let nodes = engine.node_count;
            match engine.try_search(board, depth, lazy) {
                Some(result) => {
                    debug!(
                        "depth {}/{}: column {:?}, score {}, {} nodes, {:?}",
                        depth,
                        target,
                        result.column,
                        result.score,
                        engine.node_count - nodes,
                        start.elapsed()
                    );
                    best = Some(result);
                    if is_decisive(result.score) {
                        break;
                    }
                }
                None => break,
            }
        }

        if watchdog.disarm() {
            warn!(
                "search stopped after {:?}, best finished depth: {:?}",
                start.elapsed(),
                best.map(|result| result.depth)
            );
        }
        stop.store(false, Ordering::Release);

        if best.map_or(false, |result| result.score == BOT_WIN_SCORE) {
            self.solved = true;
        }

        let report = match best.and_then(|result| result.column.map(|column| (column, result))) {
            Some((column, result)) => TurnReport {
                column,
                score: Some(result.score),
                depth: result.depth,
                source: MoveSource::Search,
                elapsed: start.elapsed(),
            },
            None => self.fallback_move(engine, board, start)?,
        };

        let committed = guard.try_commit();
        debug_assert!(committed, "one move per turn");
        info!(
            "Depth: {} | Score: {:?} | Move#: {} | Column: {} | Source: {:?} | Time: {:?}",
            report.depth,
            report.score,
            board.num_moves(),
            report.column,
            report.source,
            report.elapsed
        );
        Ok(report)
    }

    /// Picks a move for `board` from whatever the cache already knows
    ///
    /// Runs a lazy search at the fallback depth, bounded by the safe time, and
    /// plays a random open column if that does not finish either. A stop flag
    /// that is already raised skips straight to the random column.
    pub fn fallback_move(
        &self,
        engine: &mut SearchEngine,
        board: &BitBoard,
        start: Instant,
    ) -> Result<TurnReport, EngineError> {
        let stop = engine.stop_handle();
        let watchdog = Watchdog::spawn(self.config.safe_time, self.config.poll_interval, stop.clone());
        let fallback = engine.try_search(board, self.config.fallback_depth, true);
        watchdog.disarm();
        stop.store(false, Ordering::Release);

        if let Some(result) = fallback {
            if let Some(column) = result.column {
                return Ok(TurnReport {
                    column,
                    score: Some(result.score),
                    depth: result.depth,
                    source: MoveSource::Fallback,
                    elapsed: start.elapsed(),
                });
            }
        }

        let column = board
            .valid_moves()
            .choose(&mut rand::thread_rng())
            .ok_or(EngineError::GameOver)?;
        warn!("no move found in time, playing random column {}", column);
        Ok(TurnReport {
            column,
            score: None,
            depth: 0,
            source: MoveSource::Random,
            elapsed: start.elapsed(),
        })
    }
}
