//! Play oracle-driven social deduction games from the command line.
//!
//! Configuration lives in `skeld.toml` (see `skeld init`). Each team's
//! oracle is an external command that reads a prompt on stdin and answers
//! with a JSON decision.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use skeld::core::win::MAX_ROUNDS;
use skeld::engine::{Game, PhaseAdvance};
use skeld::io::config::{DEFAULT_CONFIG_PATH, GameConfig, load_config, write_config};
use skeld::io::oracle::OracleSet;
use skeld::logging;
use skeld::looping::run_game;

#[derive(Parser)]
#[command(
    name = "skeld",
    version,
    about = "Social deduction games between oracle-driven players"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
    /// Load and validate the config file.
    Check {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
    /// Play one game to the end, printing events as they happen.
    Play {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
        /// Override the configured seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Print a JSON snapshot per phase instead of event lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force, path } => cmd_init(&path, force),
        Command::Check { path } => cmd_check(&path),
        Command::Play { path, seed, json } => cmd_play(&path, seed, json),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &GameConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!(
        "ok: {} players, {} teams",
        config.players.len(),
        config.teams.len()
    );
    Ok(())
}

fn cmd_play(path: &Path, seed: Option<u64>, json: bool) -> Result<()> {
    let mut config = load_config(path)?;
    if seed.is_some() {
        config.seed = seed;
    }
    let oracles = OracleSet::from_config(&config);
    let mut game = Game::start(&config, oracles).context("start game")?;

    let mut printed = Ok(());
    let finished = run_game(&mut game, |advance| {
        if printed.is_ok() {
            printed = print_advance(advance, json);
        }
    })
    .context("play game")?;
    printed?;

    let outcome = finished.outcome;
    println!(
        "{} win ({}) after {} rounds",
        outcome.winner,
        outcome.reason,
        finished.final_round.min(MAX_ROUNDS)
    );
    Ok(())
}

fn print_advance(advance: &PhaseAdvance, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(advance).context("serialize phase advance")?;
        println!("{line}");
    } else {
        for event in &advance.new_events {
            println!("{event}");
        }
    }
    Ok(())
}
