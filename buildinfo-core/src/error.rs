use std::path::PathBuf;

/// Coarse failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Magic bytes unrecognized or inconsistent with the declared type.
    InvalidFormat,
    /// A read would run past the actual end of the file.
    TruncatedFile,
    /// Internally inconsistent structure (bad index, name offset past the string table).
    CorruptData,
    /// Well-formed file without a section of the requested name.
    SectionNotFound,
    /// Filesystem-level failure.
    Io,
    /// Malformed request, e.g. a range that overflows the address space.
    InvalidArgument,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidFormat(String),
    #[error("read of {length} bytes at offset {offset:#x} runs past end of file ({file_len} bytes)")]
    TruncatedFile {
        offset: u64,
        length: u64,
        file_len: u64,
    },
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("no {name} section found in binary")]
    SectionNotFound { name: String },
    #[error("failed to open {}", .path.display())]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read the magic bytes of {}", .path.display())]
    ReadMagic {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::TruncatedFile { .. } => ErrorKind::TruncatedFile,
            Error::CorruptData(_) => ErrorKind::CorruptData,
            Error::SectionNotFound { .. } => ErrorKind::SectionNotFound,
            Error::OpenFile { .. } | Error::ReadMagic { .. } | Error::Io(_) => ErrorKind::Io,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
