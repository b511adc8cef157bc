use crate::{Error, Result};
use log::trace;
use std::io::{self, Read, Seek, SeekFrom};

/// Bounds-checked positional reads over a seekable stream.
///
/// The stream length is measured once when the reader is created and every
/// read is validated against it before any buffer is allocated, so header
/// fields claiming huge counts or offsets fail with
/// [`Error::TruncatedFile`] instead of exhausting memory.
#[derive(Debug)]
pub struct ByteRangeReader<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> ByteRangeReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        trace!("ByteRangeReader::new: {len} bytes");
        Ok(Self { inner, len })
    }

    /// Total length of the underlying stream.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads exactly `length` bytes starting at absolute `offset`.
    pub fn read_exact_at(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        trace!("ByteRangeReader::read_exact_at @{offset:#x} : {length} bytes");
        let end = offset.checked_add(length).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "range of {length} bytes at offset {offset:#x} overflows"
            ))
        })?;
        let count = usize::try_from(length).map_err(|_| {
            Error::InvalidArgument(format!("{length} bytes exceeds the addressable range"))
        })?;
        let file_len = self.len;
        let truncated = || Error::TruncatedFile {
            offset,
            length,
            file_len,
        };
        if end > file_len {
            return Err(truncated());
        }

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; count];
        self.inner.read_exact(&mut buf).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                truncated()
            } else {
                Error::Io(source)
            }
        })?;
        Ok(buf)
    }
}

/// One-shot form of [`ByteRangeReader::read_exact_at`].
pub fn read_exact_at<R: Read + Seek>(stream: &mut R, offset: u64, length: u64) -> Result<Vec<u8>> {
    ByteRangeReader::new(stream)?.read_exact_at(offset, length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Cursor;

    fn stream() -> Cursor<Vec<u8>> {
        Cursor::new((0u8..32).collect())
    }

    #[test]
    fn reads_the_requested_range() {
        let mut s = stream();
        assert_eq!(read_exact_at(&mut s, 4, 3).unwrap(), vec![4, 5, 6]);
        assert_eq!(read_exact_at(&mut s, 0, 32).unwrap().len(), 32);
    }

    #[test]
    fn empty_read_at_end_of_file_is_allowed() {
        let mut s = stream();
        assert!(read_exact_at(&mut s, 32, 0).unwrap().is_empty());
    }

    #[test]
    fn short_reads_are_truncation() {
        let mut s = stream();
        let err = read_exact_at(&mut s, 30, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedFile);

        let err = read_exact_at(&mut s, 33, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedFile);
    }

    #[test]
    fn oversized_lengths_fail_before_allocating() {
        let mut s = stream();
        let err = read_exact_at(&mut s, 0, u64::MAX / 2).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::TruncatedFile | ErrorKind::InvalidArgument
        ));
    }

    #[test]
    fn overflowing_ranges_are_invalid_arguments() {
        let mut s = stream();
        let err = read_exact_at(&mut s, u64::MAX, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn reader_reports_stream_length() {
        let reader = ByteRangeReader::new(stream()).unwrap();
        assert_eq!(reader.len(), 32);
        assert!(!reader.is_empty());
        assert!(ByteRangeReader::new(Cursor::new(Vec::new())).unwrap().is_empty());
    }
}
