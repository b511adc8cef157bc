use crate::header::Header;
use crate::Result;
use byteorder::{ByteOrder, ReadBytesExt};
use std::io::{Cursor, Read};

/// Represents the ELF header of a 64-bit object file (`Elf64_Ehdr`).
///
/// It appears at the very beginning of every ELF file and locates the
/// section header table this crate scans.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf64Ehdr {
    /// ELF identification bytes.
    ///
    /// The first 4 bytes are `0x7F`, `'E'`, `'L'`, `'F'`; byte 4 holds the
    /// class (32/64-bit) and byte 5 the data encoding (byte order).
    pub e_ident: [u8; 16],

    /// Object file type (relocatable, executable, shared, core).
    pub e_type: u16,

    /// Target architecture, e.g. `EM_X86_64` (62) or `EM_AARCH64` (183).
    pub e_machine: u16,

    pub e_version: u32,

    /// Virtual address of the program entry point.
    pub e_entry: u64,

    /// File offset of the program header table.
    pub e_phoff: u64,

    /// File offset of the section header table.
    pub e_shoff: u64,

    pub e_flags: u32,

    /// Size of this header (`64` for ELF64).
    pub e_ehsize: u16,

    pub e_phentsize: u16,

    pub e_phnum: u16,

    /// Size of one entry in the section header table.
    pub e_shentsize: u16,

    /// Number of entries in the section header table.
    pub e_shnum: u16,

    /// Index of the section header string table.
    ///
    /// This section contains the names of all other sections.
    pub e_shstrndx: u16,
}

impl Header for Elf64Ehdr {
    const SIZE: u64 = 64;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<Elf64Ehdr> {
        let mut cur = Cursor::new(bytes);
        let mut e_ident = [0u8; 16];
        cur.read_exact(&mut e_ident)?;

        Ok(Elf64Ehdr {
            e_ident,
            e_type: cur.read_u16::<E>()?,
            e_machine: cur.read_u16::<E>()?,
            e_version: cur.read_u32::<E>()?,
            e_entry: cur.read_u64::<E>()?,
            e_phoff: cur.read_u64::<E>()?,
            e_shoff: cur.read_u64::<E>()?,
            e_flags: cur.read_u32::<E>()?,
            e_ehsize: cur.read_u16::<E>()?,
            e_phentsize: cur.read_u16::<E>()?,
            e_phnum: cur.read_u16::<E>()?,
            e_shentsize: cur.read_u16::<E>()?,
            e_shnum: cur.read_u16::<E>()?,
            e_shstrndx: cur.read_u16::<E>()?,
        })
    }
}

/// One entry of the ELF64 section header table (`Elf64_Shdr`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf64Shdr {
    /// Offset of this section's name in the section header string table.
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    /// File offset of the section contents.
    pub sh_offset: u64,
    /// Size of the section contents in bytes.
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

impl Header for Elf64Shdr {
    const SIZE: u64 = 64;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<Elf64Shdr> {
        let mut cur = Cursor::new(bytes);
        Ok(Elf64Shdr {
            sh_name: cur.read_u32::<E>()?,
            sh_type: cur.read_u32::<E>()?,
            sh_flags: cur.read_u64::<E>()?,
            sh_addr: cur.read_u64::<E>()?,
            sh_offset: cur.read_u64::<E>()?,
            sh_size: cur.read_u64::<E>()?,
            sh_link: cur.read_u32::<E>()?,
            sh_info: cur.read_u32::<E>()?,
            sh_addralign: cur.read_u64::<E>()?,
            sh_entsize: cur.read_u64::<E>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn header_fields_follow_the_byte_order() {
        let mut raw = vec![0u8; Elf64Ehdr::SIZE as usize];
        raw[..4].copy_from_slice(b"\x7fELF");
        raw[40..48].copy_from_slice(&0x1122u64.to_be_bytes());
        raw[60..62].copy_from_slice(&7u16.to_be_bytes());

        let be = Elf64Ehdr::parse::<BigEndian>(&raw).unwrap();
        assert_eq!(be.e_shoff, 0x1122);
        assert_eq!(be.e_shnum, 7);

        let le = Elf64Ehdr::parse::<LittleEndian>(&raw).unwrap();
        assert_eq!(le.e_shoff, 0x2211 << 48);
        assert_eq!(le.e_shnum, 7 << 8);
    }

    #[test]
    fn short_section_header_is_rejected() {
        assert!(Elf64Shdr::parse::<LittleEndian>(&[0u8; 10]).is_err());
    }
}
