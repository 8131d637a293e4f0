use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use std::io::{stdin, stdout, Stdin, Write};

use connect4_bot::*;

mod display;

fn ask_yes_no(stdin: &Stdin, question: &str) -> Result<bool> {
    loop {
        let mut buffer = String::new();
        print!("{} y/n: ", question);
        stdout().flush().context("failed to flush to stdout")?;
        stdin.read_line(&mut buffer)?;
        match buffer.to_lowercase().chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}

fn engine_turn(
    scheduler: &mut DepthScheduler,
    engine: &mut SearchEngine,
    board: &BitBoard,
) -> Result<TurnReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]"));
    spinner.set_message("AI is thinking...");
    spinner.enable_steady_tick(100);

    let report = scheduler.play_turn(engine, board);
    spinner.finish_and_clear();
    Ok(report?)
}

fn play_game(
    stdin: &Stdin,
    scheduler: &mut DepthScheduler,
    engine: &mut SearchEngine,
    bot_first: bool,
) -> Result<Option<Side>> {
    let mut board = BitBoard::new();
    let mut side = if bot_first { Side::Bot } else { Side::Opponent };
    scheduler.new_game();

    loop {
        display::draw(&board)?;

        if board.is_terminal() {
            return Ok(board.winner());
        }

        match side {
            Side::Bot => {
                let report = engine_turn(scheduler, engine, &board)?;
                let tag = match report.source {
                    MoveSource::Search => "",
                    MoveSource::Fallback => "[TIME] ",
                    MoveSource::Random => "[RANDOM] ",
                };
                println!(
                    "{}Depth: {} | Score: {} | Move#: {} | Time: {:.2?}",
                    tag,
                    report.depth,
                    report.score.map_or_else(|| "-".to_string(), |s| s.to_string()),
                    board.num_moves(),
                    report.elapsed
                );
                println!("Best move: {}", report.column + 1);
                board.apply(report.column, Side::Bot)?;
            }
            Side::Opponent => {
                print!("Move input > ");
                stdout().flush().context("failed to flush to stdout")?;
                let mut input_str = String::new();
                stdin.read_line(&mut input_str)?;

                let column = match input_str.trim().parse::<usize>() {
                    Ok(column @ 1..=WIDTH) => column - 1,
                    _ => {
                        println!("Invalid column: {}, columns must be between 1 and {}", input_str.trim(), WIDTH);
                        continue;
                    }
                };
                if let Err(err) = board.apply(column, Side::Opponent) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }
        }
        side = side.other();
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = EngineConfig::from_env()?;

    let stdin = stdin();

    println!("Welcome to Connect 4\n");

    // keep the cache out here so it is reused between games
    let cache = TranspositionCache::load(&config.cache_path);
    println!(
        "Loaded {} cached positions from {}",
        cache.len(),
        config.cache_path.display()
    );
    let mut engine = SearchEngine::new(cache);
    let mut scheduler = DepthScheduler::new(config);

    let mut games_played = 0;
    let mut games_won = 0;

    loop {
        let bot_first = ask_yes_no(&stdin, "Should the AI move first?")?;

        match play_game(&stdin, &mut scheduler, &mut engine, bot_first)? {
            Some(Side::Bot) => {
                println!("AI wins!");
                games_won += 1;
            }
            Some(Side::Opponent) => println!("You win!"),
            None => println!("Draw!"),
        }
        games_played += 1;

        engine.save_cache()?;
        println!("Transposition table updated ({} positions)", engine.cache().len());
        println!("AI won {} of {} games", games_won, games_played);

        if !ask_yes_no(&stdin, "Play again?")? {
            break;
        }
    }
    Ok(())
}
