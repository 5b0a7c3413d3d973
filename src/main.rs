use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use simple_row_store::repl;
use simple_row_store::table::Table;

/// A single-table row store behind a line-oriented shell.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Backing file. Without it the table only lives in memory.
    filename: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let table = match &args.filename {
        Some(path) => Table::open_db(path)
            .with_context(|| format!("Unable to open file {}", path.display()))?,
        None => Table::in_memory(),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    repl::run(stdin.lock(), &mut stdout, table).context("database failure")?;
    Ok(())
}
