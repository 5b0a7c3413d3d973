use std::path::Path;

use log::{debug, info, warn};

use super::cursor::Cursor;
use super::error::{Result, StorageError};
use super::pager::{Pager, PAGE_SIZE, TABLE_MAX_PAGES};
use super::row::{Row, ROW_SIZE};
use super::vm::ExecuteError;
use super::{ROWS_PER_PAGE, TABLE_MAX_ROWS};

pub struct Table {
    pub num_rows: usize,
    pub(crate) pager: Pager,
}

impl Table {
    /// Opens (creating if needed) a backing file and recovers the row count
    /// from its length.
    pub fn open_db<P>(fname: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let pager = Pager::open(fname)?;
        if pager.num_pages() > TABLE_MAX_PAGES {
            return Err(StorageError::TooManyPages {
                pages: pager.num_pages(),
                max: TABLE_MAX_PAGES,
            });
        }
        let num_rows = rows_in(pager.file_length);
        info!("recovered {} rows", num_rows);
        Ok(Table { num_rows, pager })
    }

    pub fn in_memory() -> Self {
        Table {
            num_rows: 0,
            pager: Pager::in_memory(),
        }
    }

    /// Maps a row number to its page and the byte offset inside that page.
    pub fn row_slot(row_num: usize) -> (usize, usize) {
        let page_num = row_num / ROWS_PER_PAGE;
        let row_offset = row_num % ROWS_PER_PAGE;
        (page_num, row_offset * ROW_SIZE)
    }

    pub fn is_full(&self) -> bool {
        self.num_rows >= TABLE_MAX_ROWS
    }

    pub fn insert(&mut self, row: &Row) -> std::result::Result<(), ExecuteError> {
        if self.is_full() {
            return Err(ExecuteError::TableFull);
        }
        let mut cursor = Cursor::table_end(self);
        row.serialize(cursor.value_mut()?).map_err(StorageError::from)?;
        self.num_rows += 1;
        Ok(())
    }

    /// Rows in insertion order, decoded one at a time.
    pub fn select(&mut self) -> Rows<'_> {
        Rows {
            cursor: Cursor::table_start(self),
        }
    }

    pub fn close_db(mut self) -> Result<()> {
        let pager = &mut self.pager;
        let num_full_pages = self.num_rows / ROWS_PER_PAGE;
        for i in 0..num_full_pages {
            if pager.is_dirty(i) {
                pager.flush(i, PAGE_SIZE)?;
            }
            pager.evict(i);
        }

        let num_additional_rows = self.num_rows % ROWS_PER_PAGE;
        if num_additional_rows > 0 {
            let page_num = num_full_pages;
            if pager.is_dirty(page_num) {
                pager.flush(page_num, num_additional_rows * ROW_SIZE)?;
            }
            pager.evict(page_num);
        }

        pager.close()?;
        debug!("closed table with {} rows", self.num_rows);
        Ok(())
    }
}

/// Row count held by a file of `file_length` bytes. Full pages carry
/// `ROWS_PER_PAGE` rows plus unused tail padding; a trailing partial page
/// carries as many whole rows as fit in it.
fn rows_in(file_length: usize) -> usize {
    let tail = file_length % PAGE_SIZE;
    if tail % ROW_SIZE != 0 {
        warn!(
            "ignoring {} trailing bytes that do not form a whole row",
            tail % ROW_SIZE
        );
    }
    (file_length / PAGE_SIZE) * ROWS_PER_PAGE + tail / ROW_SIZE
}

pub struct Rows<'a> {
    cursor: Cursor<'a>,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.end_of_table {
            return None;
        }
        let row = self
            .cursor
            .value()
            .and_then(|buf| Row::deserialize(buf).map_err(StorageError::from));
        self.cursor.advance();
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(i: u32) -> Row {
        Row::new(i, &format!("user{i}"), &format!("person{i}@example.com")).unwrap()
    }

    #[test]
    fn test_row_slot() {
        assert_eq!(ROWS_PER_PAGE, 14);
        assert_eq!(Table::row_slot(0), (0, 0));
        assert_eq!(Table::row_slot(13), (0, 13 * ROW_SIZE));
        assert_eq!(Table::row_slot(14), (1, 0));
        assert_eq!(Table::row_slot(34), (2, 6 * ROW_SIZE));
    }

    #[test]
    fn test_rows_in_skips_page_padding() {
        assert_eq!(rows_in(0), 0);
        assert_eq!(rows_in(3 * ROW_SIZE), 3);
        assert_eq!(rows_in(PAGE_SIZE), ROWS_PER_PAGE);
        assert_eq!(rows_in(50 * PAGE_SIZE), 50 * ROWS_PER_PAGE);
        assert_eq!(rows_in(2 * PAGE_SIZE + 5 * ROW_SIZE), 2 * ROWS_PER_PAGE + 5);
        assert_eq!(rows_in(2 * ROW_SIZE + 10), 2);
    }

    #[test]
    fn test_select_empty_table() {
        let mut table = Table::in_memory();
        assert_eq!(table.select().count(), 0);
    }

    #[test]
    fn test_insert_then_select_is_restartable() {
        let mut table = Table::in_memory();
        for i in 0..30 {
            table.insert(&user(i)).unwrap();
        }
        assert_eq!(table.num_rows, 30);

        for _ in 0..2 {
            let rows: Vec<Row> = table.select().collect::<Result<_>>().unwrap();
            assert_eq!(rows, (0..30).map(user).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_table_full() {
        let mut table = Table::in_memory();
        for i in 0..TABLE_MAX_ROWS as u32 {
            table.insert(&user(i)).unwrap();
        }
        assert!(matches!(
            table.insert(&user(0)),
            Err(ExecuteError::TableFull)
        ));
        assert_eq!(table.num_rows, TABLE_MAX_ROWS);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.db");

        let mut table = Table::open_db(&path).unwrap();
        for i in 0..20 {
            table.insert(&user(i)).unwrap();
        }
        table.close_db().unwrap();
        let len = std::fs::metadata(&path).unwrap().len() as usize;
        assert_eq!(len, PAGE_SIZE + 6 * ROW_SIZE);

        let mut table = Table::open_db(&path).unwrap();
        assert_eq!(table.num_rows, 20);
        table.insert(&user(20)).unwrap();
        table.close_db().unwrap();

        let mut table = Table::open_db(&path).unwrap();
        let rows: Vec<Row> = table.select().collect::<Result<_>>().unwrap();
        assert_eq!(rows, (0..21).map(user).collect::<Vec<_>>());
    }

    #[test]
    fn test_full_table_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full.db");

        let mut table = Table::open_db(&path).unwrap();
        for i in 0..TABLE_MAX_ROWS as u32 {
            table.insert(&user(i)).unwrap();
        }
        table.close_db().unwrap();

        let table = Table::open_db(&path).unwrap();
        assert_eq!(table.num_rows, TABLE_MAX_ROWS);
        assert!(table.is_full());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.db");
        std::fs::write(&path, vec![0u8; (TABLE_MAX_PAGES + 1) * PAGE_SIZE]).unwrap();

        assert!(matches!(
            Table::open_db(&path),
            Err(StorageError::TooManyPages { .. })
        ));
    }
}
