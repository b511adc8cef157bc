//! Reads the raw bytes of a named section out of 64-bit ELF and Mach-O
//! object files.
//!
//! All file access goes through [`ByteRangeReader`], which checks every
//! offset and length taken from the file against the file's real size.

pub mod binary;
pub mod elf;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod format;
pub mod header;
pub mod macho;
pub mod reader;
pub mod sections;

pub use binary::*;
pub use elf::{extract_elf, list_elf_sections, ElfSectionTable};
pub use error::*;
pub use format::*;
pub use macho::{extract_macho, list_macho_sections};
pub use reader::*;
pub use sections::*;
