use thiserror::Error;

use super::row::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

/// Reasons a line is rejected before it touches the table. The display
/// strings are what the shell prints back.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,
    #[error("ID must be positive.")]
    InvalidId,
    #[error("String is too long.")]
    StringTooLong,
}

fn prepare_insert(args: &[&str]) -> Result<Statement, PrepareError> {
    use PrepareError::*;
    let [id, username, email] = args else {
        return Err(SyntaxError);
    };
    // zero is accepted; negative, non-numeric and out of range ids are not
    let id: u32 = id.parse().map_err(|_| InvalidId)?;
    let row_to_insert = Row::new(id, username, email).map_err(|_| StringTooLong)?;
    Ok(Statement::Insert(row_to_insert))
}

pub fn prepare_statement(command: &str) -> Result<Statement, PrepareError> {
    use PrepareError::*;
    let args: Vec<_> = command.split_whitespace().collect();
    match args.split_first() {
        Some((&"insert", rest)) => prepare_insert(rest),
        Some((&"select", [])) => Ok(Statement::Select),
        Some((&"select", _)) => Err(SyntaxError),
        _ => Err(UnrecognizedStatement(command.to_owned())),
    }
}
