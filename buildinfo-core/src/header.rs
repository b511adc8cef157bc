pub mod elf;
pub mod macho;

use crate::reader::ByteRangeReader;
use crate::Result;
use byteorder::ByteOrder;
use std::io::{Read, Seek};

/// A fixed-size on-disk record decoded with an explicit byte order.
pub trait Header: std::fmt::Debug + Sized {
    /// Size of the record on disk, in bytes.
    const SIZE: u64;

    /// Decodes the record from a buffer of at least `SIZE` bytes.
    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<Self>;

    /// Reads and decodes the record stored at `offset`.
    fn read_at<E: ByteOrder, R: Read + Seek>(
        reader: &mut ByteRangeReader<R>,
        offset: u64,
    ) -> Result<Self> {
        let bytes = reader.read_exact_at(offset, Self::SIZE)?;
        Self::parse::<E>(&bytes)
    }
}

/// Returns the bytes of a fixed-width name field up to its first NUL.
///
/// A name that fills the whole field has no terminator and is returned as is.
pub(crate) fn fixed_name(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}
