pub mod compiler;
mod cursor;
pub mod error;
pub mod pager;
pub mod repl;
pub mod row;
pub mod table;
pub mod vm;

pub use pager::{PAGE_SIZE, TABLE_MAX_PAGES};
pub use row::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, ROW_SIZE};

pub const ROWS_PER_PAGE: usize = PAGE_SIZE / ROW_SIZE;
pub const TABLE_MAX_ROWS: usize = ROWS_PER_PAGE * TABLE_MAX_PAGES;
