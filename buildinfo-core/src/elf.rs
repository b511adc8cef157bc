//! ELF64 section extraction.
//!
//! The section header table and the section-name string table are read once
//! through the [`ByteRangeReader`]; the table is scanned in order and the
//! first section whose name matches is read out.

use crate::header::elf::{Elf64Ehdr, Elf64Shdr};
use crate::header::Header;
use crate::reader::ByteRangeReader;
use crate::sections::SectionDescriptor;
use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use goblin::elf::header::{EI_CLASS, EI_DATA, ELFCLASS64, ELFDATA2LSB, ELFDATA2MSB, ELFMAG};
use log::{debug, trace};
use std::io::{Read, Seek};

/// Section headers of an ELF64 file together with the section-name string table.
#[derive(Debug)]
pub struct ElfSectionTable {
    pub headers: Vec<Elf64Shdr>,
    pub strtab: Vec<u8>,
}

impl ElfSectionTable {
    /// Reads the header, section header table and string table of `reader`.
    pub fn read<R: Read + Seek>(reader: &mut ByteRangeReader<R>) -> Result<Self> {
        let ident = reader.read_exact_at(0, 16)?;
        if &ident[..4] != ELFMAG {
            return Err(Error::InvalidFormat("not a valid ELF file".into()));
        }
        if ident[EI_CLASS] != ELFCLASS64 {
            return Err(Error::InvalidFormat(format!(
                "unsupported ELF class {}, only 64-bit ELF is supported",
                ident[EI_CLASS]
            )));
        }
        match ident[EI_DATA] {
            ELFDATA2LSB => Self::read_with::<LittleEndian, R>(reader),
            ELFDATA2MSB => Self::read_with::<BigEndian, R>(reader),
            data => Err(Error::InvalidFormat(format!(
                "unsupported ELF data encoding {data}"
            ))),
        }
    }

    fn read_with<E: ByteOrder, R: Read + Seek>(reader: &mut ByteRangeReader<R>) -> Result<Self> {
        let ehdr = Elf64Ehdr::read_at::<E, R>(reader, 0)?;
        debug!(
            "ELF header: e_shoff={:#x} e_shnum={} e_shentsize={} e_shstrndx={}",
            ehdr.e_shoff, ehdr.e_shnum, ehdr.e_shentsize, ehdr.e_shstrndx
        );

        let count = u64::from(ehdr.e_shnum);
        if count == 0 {
            // No section header table; e_shstrndx is meaningless here.
            return Ok(Self {
                headers: Vec::new(),
                strtab: Vec::new(),
            });
        }
        let entsize = u64::from(ehdr.e_shentsize);
        if entsize < Elf64Shdr::SIZE {
            return Err(Error::CorruptData(format!(
                "section header entry size {entsize} is smaller than {}",
                Elf64Shdr::SIZE
            )));
        }

        // One bounded read for the whole table; the reader rejects it before
        // allocating when the declared count runs past the end of the file.
        let table = reader.read_exact_at(ehdr.e_shoff, count * entsize)?;
        let headers = table
            .chunks_exact(entsize.max(1) as usize)
            .map(Elf64Shdr::parse::<E>)
            .collect::<Result<Vec<_>>>()?;

        let shstrtab = headers.get(usize::from(ehdr.e_shstrndx)).ok_or_else(|| {
            Error::CorruptData(format!(
                "string table index {} out of range for {} sections",
                ehdr.e_shstrndx, ehdr.e_shnum
            ))
        })?;
        let strtab = reader.read_exact_at(shstrtab.sh_offset, shstrtab.sh_size)?;
        trace!("section name table: {} bytes", strtab.len());

        Ok(Self { headers, strtab })
    }

    /// Resolves the name of `shdr` in the string table, without its terminator.
    ///
    /// A name running to the end of the table without a NUL ends there.
    pub fn name_of(&self, shdr: &Elf64Shdr) -> Result<&[u8]> {
        let start = shdr.sh_name as usize;
        if start >= self.strtab.len() {
            return Err(Error::CorruptData(format!(
                "section name offset {start} outside string table of {} bytes",
                self.strtab.len()
            )));
        }
        let name = &self.strtab[start..];
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        Ok(&name[..end])
    }

    /// Returns the first section header named exactly `name`.
    pub fn find(&self, name: &str) -> Result<Option<&Elf64Shdr>> {
        for shdr in &self.headers {
            if self.name_of(shdr)? == name.as_bytes() {
                return Ok(Some(shdr));
            }
        }
        Ok(None)
    }
}

/// Extracts the contents of the first ELF64 section named `name`.
pub fn extract_elf<R: Read + Seek>(stream: &mut R, name: &str) -> Result<Vec<u8>> {
    let mut reader = ByteRangeReader::new(stream)?;
    let table = ElfSectionTable::read(&mut reader)?;

    let shdr = table.find(name)?.ok_or_else(|| Error::SectionNotFound {
        name: name.to_string(),
    })?;
    debug!(
        "found {name} at offset {:#x}, {} bytes",
        shdr.sh_offset, shdr.sh_size
    );
    reader.read_exact_at(shdr.sh_offset, shdr.sh_size)
}

/// Lists every section of an ELF64 file in table order.
pub fn list_elf_sections<R: Read + Seek>(stream: &mut R) -> Result<Vec<SectionDescriptor>> {
    let mut reader = ByteRangeReader::new(stream)?;
    let table = ElfSectionTable::read(&mut reader)?;

    table
        .headers
        .iter()
        .map(|shdr| -> Result<SectionDescriptor> {
            Ok(SectionDescriptor {
                name: String::from_utf8_lossy(table.name_of(shdr)?).into_owned(),
                file_offset: shdr.sh_offset,
                size: shdr.sh_size,
            })
        })
        .collect()
}
