use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tile_merge::config::EngineConfig;
use tile_merge::engine::Grid;
use tile_merge::input::{parse_command, Command};
use tile_merge::serialization::{FileStore, NullStore, SaveStore};

const DEFAULT_SAVE: &str = "tile-merge.sav";

#[derive(Parser, Debug)]
#[command(about = "Play the 4x4 tile-merge puzzle in the terminal")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for tile placement (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Save file location (overrides the config)
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Play without reading or writing a save file
    #[arg(long, conflicts_with = "save")]
    no_save: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let store: Box<dyn SaveStore> = if args.no_save {
        Box::new(NullStore)
    } else {
        let path = args
            .save
            .clone()
            .or_else(|| config.save_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE));
        info!("using save file {}", path.display());
        Box::new(FileStore::new(path))
    };

    let mut grid = Grid::open(config, store);
    print_grid(&grid);
    println!("Move with w/a/s/d (or h/j/k/l, or words), r to restart, q to quit.");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read input")?;
        match parse_command(&line) {
            Some(Command::Move(dir)) => {
                let outcome = grid.submit_direction(dir);
                for event in grid.drain_events() {
                    debug!("{event:?}");
                }
                if outcome.game_over {
                    println!("Game over!");
                }
                if outcome.moved {
                    print_grid(&grid);
                }
            }
            Some(Command::Restart) => {
                grid.restart();
                grid.drain_events();
                print_grid(&grid);
            }
            Some(Command::Quit) => break,
            None if line.trim().is_empty() => {}
            None => println!("unrecognized input: {:?}", line.trim()),
        }
        io::stdout().flush().context("failed to flush stdout")?;
    }
    Ok(())
}

fn print_grid(grid: &Grid) {
    println!("{grid}");
    println!("Score: {} | Top score: {}", grid.score(), grid.best_score());
}
