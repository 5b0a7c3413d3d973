use std::io::Write;

use thiserror::Error;

use super::compiler::Statement;
use super::error::StorageError;
use super::row::Row;
use super::table::Table;

#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Error: Table full.")]
    TableFull,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub fn execute_statement<W: Write>(
    stmt: Statement,
    table: &mut Table,
    out: &mut W,
) -> Result<(), ExecuteError> {
    match stmt {
        Statement::Insert(row) => execute_insert(&row, table),
        Statement::Select => execute_select(table, out),
    }
}

fn execute_insert(row: &Row, table: &mut Table) -> Result<(), ExecuteError> {
    table.insert(row)
}

fn execute_select<W: Write>(table: &mut Table, out: &mut W) -> Result<(), ExecuteError> {
    for row in table.select() {
        writeln!(out, "{}", row?).map_err(StorageError::from)?;
    }
    Ok(())
}
