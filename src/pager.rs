use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
};

use bytes::BytesMut;
use log::{debug, info};

use super::error::{Result, StorageError};

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;

struct Page {
    data: BytesMut,
    dirty: bool,
}

impl Page {
    fn zeroed() -> Self {
        Self {
            data: BytesMut::zeroed(PAGE_SIZE),
            dirty: false,
        }
    }
}

/// Page cache in front of an optional backing file. Without a file the
/// pager is a plain arena of pages that lives as long as the process.
pub struct Pager {
    file_handle: Option<File>,
    pub file_length: usize,
    pages: Vec<Option<Page>>,
}

impl Pager {
    pub fn open<P>(fname: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file_handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(fname.as_ref())?;
        let file_length = file_handle.metadata()?.len() as usize;
        info!(
            "opened {} ({} bytes, {} pages)",
            fname.as_ref().display(),
            file_length,
            pages_in(file_length)
        );
        Ok(Self {
            file_handle: Some(file_handle),
            file_length,
            pages: Self::empty_cache(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            file_handle: None,
            file_length: 0,
            pages: Self::empty_cache(),
        }
    }

    fn empty_cache() -> Vec<Option<Page>> {
        (0..TABLE_MAX_PAGES).map(|_| None).collect()
    }

    /// Number of pages present in the backing file, counting a trailing
    /// partial page.
    pub fn num_pages(&self) -> usize {
        pages_in(self.file_length)
    }

    pub fn is_cached(&self, page_num: usize) -> bool {
        self.pages.get(page_num).is_some_and(Option::is_some)
    }

    pub fn is_dirty(&self, page_num: usize) -> bool {
        self.pages
            .get(page_num)
            .and_then(Option::as_ref)
            .is_some_and(|p| p.dirty)
    }

    pub fn get_page(&mut self, page_num: usize) -> Result<&[u8]> {
        Ok(&self.load(page_num)?.data[..])
    }

    /// Like `get_page`, but marks the page for flushing on close.
    pub fn get_page_mut(&mut self, page_num: usize) -> Result<&mut [u8]> {
        let page = self.load(page_num)?;
        page.dirty = true;
        Ok(&mut page.data[..])
    }

    fn load(&mut self, page_num: usize) -> Result<&mut Page> {
        if page_num >= TABLE_MAX_PAGES {
            return Err(StorageError::PageOutOfBounds {
                page_num,
                max: TABLE_MAX_PAGES,
            });
        }
        let page = match &mut self.pages[page_num] {
            Some(page) => page,
            slot => {
                let mut page = Page::zeroed();
                match self.file_handle.as_mut() {
                    Some(file) if page_num < pages_in(self.file_length) => {
                        read_page(file, self.file_length, page_num, &mut page.data)?
                    }
                    _ => debug!("allocating new page {}", page_num),
                }
                slot.insert(page)
            }
        };
        Ok(page)
    }

    /// Writes the first `page_size` bytes of a cached page at its file
    /// offset. A no-op for in-memory pagers.
    pub fn flush(&mut self, page_num: usize, page_size: usize) -> Result<()> {
        let page = self
            .pages
            .get_mut(page_num)
            .and_then(Option::as_mut)
            .ok_or(StorageError::FlushUncachedPage(page_num))?;
        let Some(file) = self.file_handle.as_mut() else {
            page.dirty = false;
            return Ok(());
        };
        let offset = page_num * PAGE_SIZE;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(&page.data[..page_size])?;
        page.dirty = false;
        self.file_length = self.file_length.max(offset + page_size);
        debug!("flushed page {} ({} bytes)", page_num, page_size);
        Ok(())
    }

    pub fn evict(&mut self, page_num: usize) {
        if let Some(slot) = self.pages.get_mut(page_num) {
            *slot = None;
        }
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file_handle.take() {
            file.sync_all()?;
        }
        self.pages.iter_mut().for_each(|p| *p = None);
        Ok(())
    }
}

fn read_page(
    file: &mut File,
    file_length: usize,
    page_num: usize,
    buf: &mut [u8],
) -> Result<()> {
    let offset = page_num * PAGE_SIZE;
    // the last page of the file may be partial
    let expected = PAGE_SIZE.min(file_length - offset);
    file.seek(SeekFrom::Start(offset as u64))?;
    match file.read_exact(&mut buf[..expected]) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            let actual = file.metadata()?.len().saturating_sub(offset as u64) as usize;
            return Err(StorageError::ShortRead {
                page_num,
                expected,
                actual,
            });
        }
        Err(e) => return Err(e.into()),
    }
    debug!("read page {} ({} bytes)", page_num, expected);
    Ok(())
}

fn pages_in(file_length: usize) -> usize {
    file_length.div_ceil(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_page_is_zeroed_and_clean() {
        let mut pager = Pager::in_memory();
        assert!(pager.get_page(3).unwrap().iter().all(|&b| b == 0));
        assert!(pager.is_cached(3));
        assert!(!pager.is_dirty(3));
    }

    #[test]
    fn test_page_out_of_bounds() {
        let mut pager = Pager::in_memory();
        assert!(pager.get_page(TABLE_MAX_PAGES - 1).is_ok());
        assert!(matches!(
            pager.get_page(TABLE_MAX_PAGES),
            Err(StorageError::PageOutOfBounds { page_num, .. }) if page_num == TABLE_MAX_PAGES
        ));
    }

    #[test]
    fn test_cached_page_is_shared_between_calls() {
        let mut pager = Pager::in_memory();
        pager.get_page_mut(0).unwrap()[10] = 42;
        assert_eq!(pager.get_page(0).unwrap()[10], 42);
        assert!(pager.is_dirty(0));
    }

    #[test]
    fn test_flush_uncached_page() {
        let mut pager = Pager::in_memory();
        assert!(matches!(
            pager.flush(1, PAGE_SIZE),
            Err(StorageError::FlushUncachedPage(1))
        ));
    }

    #[test]
    fn test_flush_and_reload_partial_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pager.db");

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.file_length, 0);
        pager.get_page_mut(0).unwrap()[..4].copy_from_slice(b"full");
        pager.get_page_mut(1).unwrap()[..4].copy_from_slice(b"part");
        pager.flush(0, PAGE_SIZE).unwrap();
        pager.flush(1, 100).unwrap();
        assert!(!pager.is_dirty(1));
        pager.close().unwrap();

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.file_length, PAGE_SIZE + 100);
        assert_eq!(pager.num_pages(), 2);
        assert_eq!(&pager.get_page(0).unwrap()[..4], b"full");
        let page = pager.get_page(1).unwrap();
        assert_eq!(&page[..4], b"part");
        assert!(page[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_file_truncated_behind_pager_is_a_short_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pager.db");
        std::fs::write(&path, vec![1u8; 2 * PAGE_SIZE]).unwrap();

        let mut pager = Pager::open(&path).unwrap();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len((PAGE_SIZE + 10) as u64)
            .unwrap();

        assert!(pager.get_page(0).is_ok());
        assert!(matches!(
            pager.get_page(1),
            Err(StorageError::ShortRead {
                page_num: 1,
                expected: PAGE_SIZE,
                actual: 10,
            })
        ));
        assert!(!pager.is_cached(1));
    }

    #[test]
    fn test_page_past_end_of_file_is_not_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pager.db");
        std::fs::write(&path, vec![7u8; PAGE_SIZE]).unwrap();

        let mut pager = Pager::open(&path).unwrap();
        assert!(pager.get_page(0).unwrap().iter().all(|&b| b == 7));
        assert!(pager.get_page(1).unwrap().iter().all(|&b| b == 0));
    }
}
