use std::io::{BufRead, Write};

use log::debug;
use thiserror::Error;

use super::compiler::{prepare_statement, PrepareError};
use super::error::Result;
use super::table::Table;
use super::vm::{execute_statement, ExecuteError};

pub const PROMPT: &str = "db > ";

// Non-SQL statements like .exit are called "meta-commands".
enum MetaCommand {
    Exit,
}

#[derive(Error, Debug)]
pub enum MetaCommandError {
    #[error("Unrecognized command '{0}'.")]
    Unrecognized(String),
}

fn do_meta_command(command: &str) -> std::result::Result<MetaCommand, MetaCommandError> {
    match command {
        ".exit" => Ok(MetaCommand::Exit),
        _ => Err(MetaCommandError::Unrecognized(command.to_owned())),
    }
}

/// Drives the shell until `.exit` or end of input, then flushes the table.
/// Rejected statements are reported on `out` and the loop carries on; only
/// I/O and storage failures end it early. The table is closed on every
/// path out of the loop; the first error wins.
pub fn run<R, W>(mut input: R, out: &mut W, mut table: Table) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let result = run_loop(&mut input, out, &mut table);
    let closed = table.close_db();
    result.and(closed)
}

fn run_loop<R, W>(input: &mut R, out: &mut W, table: &mut Table) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut buffer = Vec::new();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        buffer.clear();
        if input.read_until(b'\n', &mut buffer)? == 0 {
            debug!("end of input");
            break;
        }
        let command = match std::str::from_utf8(&buffer) {
            Ok(line) => line.trim_end_matches(['\n', '\r']),
            Err(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let err = PrepareError::UnrecognizedStatement(
                    line.trim_end_matches(['\n', '\r']).to_owned(),
                );
                writeln!(out, "{err}")?;
                continue;
            }
        };

        if command.starts_with('.') {
            match do_meta_command(command) {
                Ok(MetaCommand::Exit) => break,
                Err(e) => writeln!(out, "{e}")?,
            }
            continue;
        }

        match prepare_statement(command) {
            Ok(stmt) => match execute_statement(stmt, table, out) {
                Ok(()) => writeln!(out, "Executed.")?,
                Err(e @ ExecuteError::TableFull) => writeln!(out, "{e}")?,
                Err(ExecuteError::Storage(e)) => return Err(e),
            },
            Err(e) => writeln!(out, "{e}")?,
        }
    }
    out.flush()?;
    Ok(())
}
