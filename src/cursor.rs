use super::error::Result;
use super::row::ROW_SIZE;
use super::table::Table;

/// A position in the table, addressed by row number.
pub struct Cursor<'a> {
    table: &'a mut Table,
    pub row_num: usize,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    pub fn table_start(table: &'a mut Table) -> Self {
        let end_of_table = table.num_rows == 0;
        Self {
            table,
            row_num: 0,
            end_of_table,
        }
    }

    pub fn table_end(table: &'a mut Table) -> Self {
        let row_num = table.num_rows;
        Self {
            table,
            row_num,
            end_of_table: true,
        }
    }

    pub fn value(&mut self) -> Result<&[u8]> {
        let (page_num, byte_offset) = Table::row_slot(self.row_num);
        let page = self.table.pager.get_page(page_num)?;
        Ok(&page[byte_offset..byte_offset + ROW_SIZE])
    }

    pub fn value_mut(&mut self) -> Result<&mut [u8]> {
        let (page_num, byte_offset) = Table::row_slot(self.row_num);
        let page = self.table.pager.get_page_mut(page_num)?;
        Ok(&mut page[byte_offset..byte_offset + ROW_SIZE])
    }

    pub fn advance(&mut self) {
        self.row_num += 1;
        if self.row_num >= self.table.num_rows {
            self.end_of_table = true;
        }
    }
}
