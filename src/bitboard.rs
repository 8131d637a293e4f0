use std::fmt;

use crate::error::BoardError;
use crate::transposition_table::CacheKey;
use crate::{HEIGHT, WIDTH};

pub(crate) mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// One of the two players. The search maximizes for `Bot` and minimizes for `Opponent`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Side {
    Bot,
    Opponent,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Bot => Side::Opponent,
            Side::Opponent => Side::Bot,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Cell {
    Bot,
    Opponent,
    Empty,
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Bot => 'X',
            Cell::Opponent => 'O',
            Cell::Empty => '.',
        }
    }
}

/// The open columns of a board, in ascending order
#[derive(Copy, Clone, Debug)]
pub struct ValidMoves {
    columns: u32,
}

impl Iterator for ValidMoves {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self.columns {
            0 => None,
            columns => {
                // pop the lowest open column
                self.columns &= columns - 1;
                Some(columns.trailing_zeros() as usize)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.columns.count_ones() as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for ValidMoves {}

/// A Connect 4 grid stored as two bitmasks
///
/// Each column takes `HEIGHT + 1` bits, bottom cell first, with an always-empty
/// sentinel bit on top. Row 0 is the bottom row.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BitBoard {
    // mask of the bot's tiles
    bot_mask: u64,
    // mask of all tiles
    board_mask: u64,
    num_moves: usize,
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            bot_mask: 0,
            board_mask: 0,
            num_moves: 0,
        }
    }

    /// Builds a board from a string of 1-indexed columns, sides alternating from `first`
    pub fn from_moves<S: AsRef<str>>(moves: S, first: Side) -> Result<Self, BoardError> {
        let mut board = Self::new();
        let mut side = first;

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    // abort if the position is won at any point
                    if board.is_decided() {
                        return Err(BoardError::GameDecided);
                    }
                    board.apply(column - 1, side)?;
                    side = side.other();
                }
                _ => return Err(BoardError::InvalidMove(column_char)),
            }
        }
        Ok(board)
    }

    /// Builds a board from a snapshot of its rows, top row first
    ///
    /// `X` marks a bot tile, `O` an opponent tile and `.` an empty cell.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, BoardError> {
        if rows.len() != HEIGHT {
            return Err(BoardError::BadShape {
                expected: HEIGHT,
                found: format!("{} rows", rows.len()),
            });
        }

        let mut board = Self::new();
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != WIDTH {
                return Err(BoardError::BadShape {
                    expected: HEIGHT,
                    found: format!("row '{}'", row),
                });
            }
            let height = HEIGHT - 1 - index;
            for (column, symbol) in row.chars().enumerate() {
                let tile = 1 << (column * (HEIGHT + 1) + height);
                match symbol {
                    'X' | 'x' => {
                        board.bot_mask |= tile;
                        board.board_mask |= tile;
                    }
                    'O' | 'o' => board.board_mask |= tile,
                    '.' => {}
                    other => return Err(BoardError::InvalidCell(other)),
                }
            }
        }

        // every column must be filled from the bottom without gaps
        for column in 0..WIDTH {
            let mut seen_empty = false;
            for row in 0..HEIGHT {
                match board.cell(row, column) {
                    Cell::Empty => seen_empty = true,
                    _ if seen_empty => return Err(BoardError::FloatingStone { row, column }),
                    _ => {}
                }
            }
        }

        board.num_moves = board.board_mask.count_ones() as usize;
        Ok(board)
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// Mask of the tiles owned by `side`
    pub fn side_mask(&self, side: Side) -> u64 {
        match side {
            Side::Bot => self.bot_mask,
            Side::Opponent => self.bot_mask ^ self.board_mask,
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell {
        let tile = 1 << (column * (HEIGHT + 1) + row);
        if self.board_mask & tile == 0 {
            Cell::Empty
        } else if self.bot_mask & tile != 0 {
            Cell::Bot
        } else {
            Cell::Opponent
        }
    }

    /// The number of tiles on the board
    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn count(&self, side: Side) -> usize {
        self.side_mask(side).count_ones() as usize
    }

    pub fn playable(&self, column: usize) -> bool {
        column < WIDTH && Self::top_mask(column) & self.board_mask == 0
    }

    pub fn valid_moves(&self) -> ValidMoves {
        let mut columns = 0;
        for column in 0..WIDTH {
            if self.playable(column) {
                columns |= 1 << column;
            }
        }
        ValidMoves { columns }
    }

    /// Drops a tile for `side` into `column`, rejecting the move if the column is unavailable
    pub fn apply(&mut self, column: usize, side: Side) -> Result<(), BoardError> {
        if column >= WIDTH {
            return Err(BoardError::ColumnOutOfRange(column));
        }
        if !self.playable(column) {
            return Err(BoardError::ColumnFull(column));
        }
        self.play(column, side);
        Ok(())
    }

    /// Drops a tile into a column known to be playable
    pub fn play(&mut self, column: usize, side: Side) {
        debug_assert!(self.playable(column));
        let move_bitmap = (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column);
        self.board_mask |= move_bitmap;
        if side == Side::Bot {
            self.bot_mask |= move_bitmap;
        }
        self.num_moves += 1;
    }

    /// Removes the top tile of a non-empty column
    pub fn undo(&mut self, column: usize) {
        debug_assert!(self.board_mask & Self::column_mask(column) != 0);
        let next = (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column);
        // a full column carries into the sentinel bit
        let top = if next == 0 {
            Self::top_mask(column)
        } else {
            next >> 1
        };
        self.board_mask &= !top;
        self.bot_mask &= !top;
        self.num_moves -= 1;
    }

    pub fn has_four_in_a_row(&self, side: Side) -> bool {
        let pos = self.side_mask(side);

        // check horizontal alignment
        // mark all horizontal runs of 2
        let mut m = pos & (pos >> (HEIGHT + 1));
        // check for runs of 2 * (runs of 2)
        if m & (m >> (2 * (HEIGHT + 1))) != 0 {
            return true;
        }

        // check diagonal alignment 1
        m = pos & (pos >> HEIGHT);
        if m & (m >> (2 * HEIGHT)) != 0 {
            return true;
        }

        // check diagonal alignment 2
        m = pos & (pos >> (HEIGHT + 2));
        if m & (m >> (2 * (HEIGHT + 2))) != 0 {
            return true;
        }

        // check vertical alignment
        m = pos & (pos >> 1);
        if m & (m >> 2) != 0 {
            return true;
        }

        // no alignments
        false
    }

    pub fn is_full(&self) -> bool {
        self.board_mask == static_masks::full_board_mask()
    }

    fn is_decided(&self) -> bool {
        self.has_four_in_a_row(Side::Bot) || self.has_four_in_a_row(Side::Opponent)
    }

    /// True if either side has four in a row or no column is open
    pub fn is_terminal(&self) -> bool {
        self.is_decided() || self.is_full()
    }

    pub fn winner(&self) -> Option<Side> {
        if self.has_four_in_a_row(Side::Bot) {
            Some(Side::Bot)
        } else if self.has_four_in_a_row(Side::Opponent) {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    // key for transposition table
    pub fn key(&self) -> CacheKey {
        CacheKey(self.bot_mask + self.board_mask)
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            let line: String = (0..WIDTH).map(|column| self.cell(row, column).symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
