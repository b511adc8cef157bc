use crate::Result;
use goblin::elf::header::ELFMAG;
use goblin::mach::header::MH_MAGIC_64;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

/// Section read by the compatibility mode on ELF binaries.
pub const ELF_BUILDINFO_SECTION: &str = ".buildinfo";

/// Section read by the compatibility mode on Mach-O binaries.
pub const MACHO_BUILDINFO_SECTION: &str = "__buildinfo";

/// Container format, classified from the first four bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryFormat {
    Elf64,
    MachO64BigEndian,
    MachO64LittleEndian,
    Unknown,
}

impl BinaryFormat {
    /// Classifies a file from its leading magic bytes.
    ///
    /// A 32-bit ELF shares its magic with ELF64 and is reported as
    /// [`BinaryFormat::Elf64`]; the class mismatch is rejected when the
    /// full header is parsed.
    pub fn from_magic(magic: [u8; 4]) -> Self {
        if &magic == ELFMAG {
            BinaryFormat::Elf64
        } else if u32::from_le_bytes(magic) == MH_MAGIC_64 {
            BinaryFormat::MachO64LittleEndian
        } else if u32::from_be_bytes(magic) == MH_MAGIC_64 {
            BinaryFormat::MachO64BigEndian
        } else {
            BinaryFormat::Unknown
        }
    }

    /// Name of the section extracted when the caller does not ask for one.
    pub fn default_section_name(&self) -> Option<&'static str> {
        match self {
            BinaryFormat::Elf64 => Some(ELF_BUILDINFO_SECTION),
            BinaryFormat::MachO64BigEndian | BinaryFormat::MachO64LittleEndian => {
                Some(MACHO_BUILDINFO_SECTION)
            }
            BinaryFormat::Unknown => None,
        }
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryFormat::Elf64 => "ELF64",
            BinaryFormat::MachO64BigEndian => "Mach-O 64 (big-endian)",
            BinaryFormat::MachO64LittleEndian => "Mach-O 64 (little-endian)",
            BinaryFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Rewinds `stream` and classifies it from its first four bytes.
///
/// Fails with an I/O error only when fewer than four bytes are available.
pub fn detect<R: Read + Seek>(stream: &mut R) -> Result<BinaryFormat> {
    stream.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    stream.read_exact(&mut magic)?;

    let format = BinaryFormat::from_magic(magic);
    log::debug!("detected {format} from magic {magic:02x?}");
    Ok(format)
}
