use crate::format::{detect, BinaryFormat};
use crate::sections::{extract_as, list_sections_as, SectionDescriptor};
use crate::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// An object file opened for section extraction.
///
/// The format is classified once on open; the file handle is released when
/// the `Binary` is dropped.
#[derive(Debug)]
pub struct Binary {
    path: PathBuf,
    file: File,
    format: BinaryFormat,
}

impl Binary {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| Error::OpenFile {
            path: path.into(),
            source,
        })?;
        let format = detect(&mut file).map_err(|err| match err {
            Error::Io(source) => Error::ReadMagic {
                path: path.into(),
                source,
            },
            other => other,
        })?;
        log::info!("{}: {format}", path.display());

        Ok(Self {
            path: path.into(),
            file,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> BinaryFormat {
        self.format
    }

    /// Reads the contents of section `name`, or of the format's default
    /// section when `name` is `None`.
    pub fn extract(&mut self, name: Option<&str>) -> Result<Vec<u8>> {
        extract_as(&mut self.file, self.format, name)
    }

    pub fn sections(&mut self) -> Result<Vec<SectionDescriptor>> {
        list_sections_as(&mut self.file, self.format)
    }
}
