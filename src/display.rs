use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use connect4_bot::{BitBoard, Cell, HEIGHT, WIDTH};

/// Draws the board below the cursor, bot tiles in red and opponent tiles in yellow
pub fn draw(board: &BitBoard) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
    stdout.queue(PrintStyledContent(style(cols + "\n")))?;
    for _ in 0..HEIGHT {
        stdout.queue(PrintStyledContent(style("\n")))?;
    }
    stdout.flush()?;

    let (origin_x, origin_y) = crossterm::cursor::position()?;

    for row in 0..HEIGHT {
        for column in 0..WIDTH {
            let (pos_x, pos_y) = (origin_x + column as u16, origin_y - 1 - row as u16);

            stdout
                .queue(MoveTo(pos_x, pos_y))?
                .queue(PrintStyledContent(
                    style("O")
                        .attribute(Attribute::Bold)
                        .on(Color::DarkBlue)
                        .with(match board.cell(row, column) {
                            Cell::Bot => Color::Red,
                            Cell::Opponent => Color::Yellow,
                            Cell::Empty => Color::DarkBlue,
                        }),
                ))?;
        }
    }
    stdout
        .queue(MoveTo(origin_x, origin_y))?
        .queue(PrintStyledContent(style("\n")))?;
    stdout.flush()?;
    Ok(())
}
