use crate::WIDTH;

/// Errors raised when building or mutating a board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("column {0} out of range, columns must be between 0 and {max}", max = WIDTH - 1)]
    ColumnOutOfRange(usize),

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("could not parse '{0}' as a valid move")]
    InvalidMove(char),

    #[error("invalid position, the game is already decided")]
    GameDecided,

    #[error("expected {expected} rows of {width} cells, found {found}", width = WIDTH)]
    BadShape { expected: usize, found: String },

    #[error("unknown cell '{0}', expected 'X', 'O' or '.'")]
    InvalidCell(char),

    #[error("floating stone at row {row}, column {column}")]
    FloatingStone { row: usize, column: usize },
}

/// Errors raised by the engine when asked to pick a move.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no move to pick, the game is over")]
    GameOver,

    #[error("board error: {0}")]
    Board(#[from] BoardError),
}
