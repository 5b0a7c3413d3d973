use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

pub const COLUMN_ID_SIZE: usize = std::mem::size_of::<u32>();
pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + COLUMN_ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + COLUMN_USERNAME_SIZE;
pub const ROW_SIZE: usize = COLUMN_ID_SIZE + COLUMN_USERNAME_SIZE + COLUMN_EMAIL_SIZE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("{column} is {len} bytes, the column holds at most {max}")]
    StringTooLong {
        column: &'static str,
        len: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: u32,
    username: String,
    email: String,
}

impl Row {
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, RowError> {
        let row = Row {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
        };
        row.check_lengths()?;
        Ok(row)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    fn check_lengths(&self) -> Result<(), RowError> {
        check_column("username", &self.username, COLUMN_USERNAME_SIZE)?;
        check_column("email", &self.email, COLUMN_EMAIL_SIZE)
    }

    /// Writes the row into a `ROW_SIZE` slot. Text columns are NUL padded
    /// to their full width so stale bytes never leak into a later decode.
    pub fn serialize(&self, buf: &mut [u8]) -> io::Result<()> {
        self.check_lengths()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut cur = io::Cursor::new(&mut buf[..ROW_SIZE]);
        cur.write_u32::<LittleEndian>(self.id)?;
        write_padded(&mut cur, self.username.as_bytes(), COLUMN_USERNAME_SIZE)?;
        write_padded(&mut cur, self.email.as_bytes(), COLUMN_EMAIL_SIZE)?;
        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> io::Result<Self> {
        let mut cur = io::Cursor::new(&buf[..ROW_SIZE]);
        let id = cur.read_u32::<LittleEndian>()?;
        let username = read_padded(&mut cur, COLUMN_USERNAME_SIZE)?;
        let email = read_padded(&mut cur, COLUMN_EMAIL_SIZE)?;
        Ok(Self {
            id,
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn check_column(column: &'static str, value: &str, max: usize) -> Result<(), RowError> {
    if value.len() > max {
        return Err(RowError::StringTooLong {
            column,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn write_padded<W: Write>(w: &mut W, bytes: &[u8], width: usize) -> io::Result<()> {
    w.write_all(bytes)?;
    w.write_all(&vec![0; width - bytes.len()])
}

fn read_padded<R: Read>(r: &mut R, width: usize) -> io::Result<String> {
    let mut field = vec![0; width];
    r.read_exact(&mut field)?;
    let len = field.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&field[..len]).into_owned())
}
