//! Byte-level reading primitives.

use std::io::{self, ErrorKind};

use crate::Error;

/// A `Cursor` contains a slice of a buffer still to be read.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct Cursor<'a> {
    /// Slice representing the remaining data to be read
    remaining: &'a [u8],
}

impl<'a> Cursor<'a> {
    /// Construct a new `Cursor` from remaining data
    pub(crate) fn new(remaining: &'a [u8]) -> Self {
        Self { remaining }
    }

    /// Returns `true` if no data is remaining
    pub(crate) fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Read exactly `count` bytes, reducing remaining data
    pub(crate) fn read_exact(&mut self, count: usize) -> Result<&'a [u8], Error> {
        match (self.remaining.get(..count), self.remaining.get(count..)) {
            (Some(result), Some(remaining)) => {
                self.remaining = remaining;
                Ok(result)
            }
            _ => Err(Error::Io(io::Error::from(ErrorKind::UnexpectedEof))),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_exact(1)?[0])
    }

    pub(crate) fn read_be_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes(self.read_exact(2)?.try_into()?))
    }

    pub(crate) fn read_be_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.read_exact(4)?.try_into()?))
    }

    pub(crate) fn read_be_i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_be_bytes(self.read_exact(4)?.try_into()?))
    }

    pub(crate) fn read_be_i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_be_bytes(self.read_exact(8)?.try_into()?))
    }
}
