//! Static heuristic for positions the search cannot see to the end of
//!
//! Every run of 4 cells (a window) along a row, a column or either diagonal
//! is scored by how many tiles each side has in it, plus a bonus for tiles
//! in the center column. The constants are tuned to the search and changing
//! them changes which moves get picked.

use crate::bitboard::{BitBoard, Side};
use crate::{HEIGHT, WIDTH};

/// Bonus for each tile in the center column
pub const CENTER_WEIGHT: i64 = 3;
/// A completed window
pub const FOUR_WEIGHT: i64 = 100;
/// Three tiles and an empty cell
pub const THREE_WEIGHT: i64 = 5;
/// Two tiles and two empty cells
pub const TWO_WEIGHT: i64 = 2;
/// The opponent has three tiles and an empty cell
pub const OPPONENT_THREE_WEIGHT: i64 = -4;

/// The number of 4-cell windows on the board
pub const NUM_WINDOWS: usize =
    HEIGHT * (WIDTH - 3) + WIDTH * (HEIGHT - 3) + 2 * (WIDTH - 3) * (HEIGHT - 3);

const fn tile(column: usize, row: usize) -> u64 {
    1 << (column * (HEIGHT + 1) + row)
}

const fn window_masks() -> [u64; NUM_WINDOWS] {
    let mut windows = [0; NUM_WINDOWS];
    let mut n = 0;

    // horizontal
    let mut row = 0;
    while row < HEIGHT {
        let mut column = 0;
        while column + 3 < WIDTH {
            let mut i = 0;
            while i < 4 {
                windows[n] |= tile(column + i, row);
                i += 1;
            }
            n += 1;
            column += 1;
        }
        row += 1;
    }

    // vertical
    let mut column = 0;
    while column < WIDTH {
        let mut row = 0;
        while row + 3 < HEIGHT {
            let mut i = 0;
            while i < 4 {
                windows[n] |= tile(column, row + i);
                i += 1;
            }
            n += 1;
            row += 1;
        }
        column += 1;
    }

    // diagonal /
    let mut row = 0;
    while row + 3 < HEIGHT {
        let mut column = 0;
        while column + 3 < WIDTH {
            let mut i = 0;
            while i < 4 {
                windows[n] |= tile(column + i, row + i);
                i += 1;
            }
            n += 1;
            column += 1;
        }
        row += 1;
    }

    // diagonal \
    let mut row = 3;
    while row < HEIGHT {
        let mut column = 0;
        while column + 3 < WIDTH {
            let mut i = 0;
            while i < 4 {
                windows[n] |= tile(column + i, row - i);
                i += 1;
            }
            n += 1;
            column += 1;
        }
        row += 1;
    }

    windows
}

/// Every 4-cell window of the board as a tile mask
pub const WINDOWS: [u64; NUM_WINDOWS] = window_masks();

/// Scores a single window from the tile counts of the scoring side and its opponent
pub fn evaluate_window(own: u32, opponent: u32) -> i64 {
    let empty = 4 - own - opponent;
    let mut score = 0;

    if own == 4 {
        score += FOUR_WEIGHT;
    } else if own == 3 && empty == 1 {
        score += THREE_WEIGHT;
    } else if own == 2 && empty == 2 {
        score += TWO_WEIGHT;
    }

    if opponent == 3 && empty == 1 {
        score += OPPONENT_THREE_WEIGHT;
    }

    score
}

/// Scores `board` from the point of view of `side`
pub fn score(board: &BitBoard, side: Side) -> i64 {
    let own = board.side_mask(side);
    let opponent = board.side_mask(side.other());

    let center = BitBoard::column_mask(WIDTH / 2);
    let mut score = (own & center).count_ones() as i64 * CENTER_WEIGHT;

    for &window in WINDOWS.iter() {
        score += evaluate_window((own & window).count_ones(), (opponent & window).count_ones());
    }
    score
}
