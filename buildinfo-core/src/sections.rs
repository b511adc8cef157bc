use crate::elf::{extract_elf, list_elf_sections};
use crate::format::{detect, BinaryFormat};
use crate::macho::{extract_macho, list_macho_sections};
use crate::{Error, Result};
use std::io::{Read, Seek};

/// Where a section's contents live in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub name: String,
    pub file_offset: u64,
    pub size: u64,
}

fn unsupported() -> Error {
    Error::InvalidFormat("unknown or unsupported binary format".into())
}

/// Extracts section `name` from a stream already classified as `format`.
///
/// With `name` unset the format's default section is read.
pub fn extract_as<R: Read + Seek>(
    stream: &mut R,
    format: BinaryFormat,
    name: Option<&str>,
) -> Result<Vec<u8>> {
    let name = name
        .or_else(|| format.default_section_name())
        .ok_or_else(unsupported)?;

    match format {
        BinaryFormat::Elf64 => extract_elf(stream, name),
        BinaryFormat::MachO64BigEndian | BinaryFormat::MachO64LittleEndian => {
            extract_macho(stream, name)
        }
        BinaryFormat::Unknown => Err(unsupported()),
    }
}

/// Detects the format of `stream` and extracts section `name` from it.
pub fn extract_section<R: Read + Seek>(stream: &mut R, name: Option<&str>) -> Result<Vec<u8>> {
    let format = detect(stream)?;
    extract_as(stream, format, name)
}

pub fn list_sections_as<R: Read + Seek>(
    stream: &mut R,
    format: BinaryFormat,
) -> Result<Vec<SectionDescriptor>> {
    match format {
        BinaryFormat::Elf64 => list_elf_sections(stream),
        BinaryFormat::MachO64BigEndian | BinaryFormat::MachO64LittleEndian => {
            list_macho_sections(stream)
        }
        BinaryFormat::Unknown => Err(unsupported()),
    }
}

/// Detects the format of `stream` and lists all of its sections.
pub fn list_sections<R: Read + Seek>(stream: &mut R) -> Result<Vec<SectionDescriptor>> {
    let format = detect(stream)?;
    list_sections_as(stream, format)
}
