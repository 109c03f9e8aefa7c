mod commands;
mod services;

use clap::Parser;
use commands::{parse_line, ReplCommand};
use ledger::ledger_manager;
use ledger::store::DEFAULT_FILE_NAME;
use ledger::{Ledger, RandomSource, SeededRandom, SnapshotStore, StoreConfig, ThreadRandom};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "saltybet")]
#[command(about = "Salty Bet - bet WrestleBucks on fake wrestling matches", long_about = None)]
struct Cli {
    /// Store user data in this file instead of searching for a writable location
    #[arg(long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    /// File name to use when searching for a writable location
    #[arg(long, default_value = DEFAULT_FILE_NAME)]
    file_name: String,

    /// Seed for the bankruptcy relief draws, for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose; logs go to stderr to keep the session readable
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = SnapshotStore::resolve(&StoreConfig {
        data_file: cli.data_file,
        file_name: cli.file_name,
    });
    let random: Box<dyn RandomSource + Send> = match cli.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };
    let ledger = Ledger::open_with_random(store, random);
    let (handle, manager) = ledger_manager::channel(ledger, 32);
    let manager_task = tokio::spawn(manager.manage());

    println!("Welcome to Salty Bet! Type 'help' for commands.");
    println!("User data: {}", handle.data_file().await?.display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(command)) => {
                debug!(?command, "running command");
                match services::execute(&handle, command).await {
                    Ok(output) => println!("{output}"),
                    Err(e) => println!("Error: {e}"),
                }
            }
            // clap renders help and usage errors itself
            Err(message) => println!("{}", message.trim_end()),
        }
    }

    drop(handle);
    manager_task.await?;
    Ok(())
}
