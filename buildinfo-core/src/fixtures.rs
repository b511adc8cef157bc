//! Builders for minimal ELF64 and Mach-O 64 object files, used by the test
//! suites of this crate and of its consumers.

use crate::header::elf::{Elf64Ehdr, Elf64Shdr};
use crate::header::macho::{LoadCommand, MachHeader64, Section64, SegmentCommand64};
use crate::header::Header;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use goblin::elf::header::{ELFCLASS64, ELFDATA2LSB, ELFDATA2MSB, ELFMAG, EM_X86_64, ET_REL};
use goblin::elf::section_header::{SHT_PROGBITS, SHT_STRTAB};
use goblin::mach::constants::cputype::CPU_TYPE_X86_64;
use goblin::mach::header::{MH_MAGIC_64, MH_OBJECT};
use goblin::mach::load_command::LC_SEGMENT_64;

/// Builds ELF64 relocatable files: header, section contents, `.shstrtab`,
/// then the section header table (null entry first, `.shstrtab` last).
pub struct ElfBuilder {
    big_endian: bool,
    entsize: u16,
    sections: Vec<(String, Vec<u8>)>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            big_endian: false,
            entsize: Elf64Shdr::SIZE as u16,
            sections: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    /// Lays the section header table out at `entsize` bytes per entry,
    /// zero-padding past the 64-byte record.
    pub fn entsize(mut self, entsize: u16) -> Self {
        self.entsize = entsize;
        self
    }

    pub fn section(mut self, name: &str, data: &[u8]) -> Self {
        self.sections.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.big_endian {
            self.build_with::<BigEndian>()
        } else {
            self.build_with::<LittleEndian>()
        }
    }

    fn build_with<E: ByteOrder>(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut strtab = vec![0u8];
        // (sh_name, sh_type, sh_offset, sh_size)
        let mut entries = vec![(0u32, 0u32, 0u64, 0u64)];

        for (name, data) in &self.sections {
            let offset = Elf64Ehdr::SIZE + body.len() as u64;
            body.extend_from_slice(data);
            entries.push((strtab.len() as u32, SHT_PROGBITS, offset, data.len() as u64));
            strtab.extend_from_slice(name.as_bytes());
            strtab.push(0);
        }

        let shstrtab_name = strtab.len() as u32;
        strtab.extend_from_slice(b".shstrtab\0");
        let strtab_offset = Elf64Ehdr::SIZE + body.len() as u64;
        entries.push((shstrtab_name, SHT_STRTAB, strtab_offset, strtab.len() as u64));
        body.extend_from_slice(&strtab);
        let shoff = Elf64Ehdr::SIZE + body.len() as u64;

        let mut out = Vec::new();
        out.extend_from_slice(ELFMAG);
        out.push(ELFCLASS64);
        out.push(if self.big_endian { ELFDATA2MSB } else { ELFDATA2LSB });
        out.push(1);
        out.resize(16, 0);
        out.write_u16::<E>(ET_REL).unwrap();
        out.write_u16::<E>(EM_X86_64).unwrap();
        out.write_u32::<E>(1).unwrap();
        out.write_u64::<E>(0).unwrap();
        out.write_u64::<E>(0).unwrap();
        out.write_u64::<E>(shoff).unwrap();
        out.write_u32::<E>(0).unwrap();
        out.write_u16::<E>(Elf64Ehdr::SIZE as u16).unwrap();
        out.write_u16::<E>(0).unwrap();
        out.write_u16::<E>(0).unwrap();
        out.write_u16::<E>(self.entsize).unwrap();
        out.write_u16::<E>(entries.len() as u16).unwrap();
        out.write_u16::<E>((entries.len() - 1) as u16).unwrap();
        out.extend_from_slice(&body);

        for (sh_name, sh_type, sh_offset, sh_size) in entries {
            let start = out.len();
            out.write_u32::<E>(sh_name).unwrap();
            out.write_u32::<E>(sh_type).unwrap();
            out.write_u64::<E>(0).unwrap();
            out.write_u64::<E>(0).unwrap();
            out.write_u64::<E>(sh_offset).unwrap();
            out.write_u64::<E>(sh_size).unwrap();
            out.write_u32::<E>(0).unwrap();
            out.write_u32::<E>(0).unwrap();
            out.write_u64::<E>(1).unwrap();
            out.write_u64::<E>(0).unwrap();
            out.resize(start + usize::from(self.entsize).max(Elf64Shdr::SIZE as usize), 0);
        }
        out
    }
}

enum Command {
    Segment {
        name: String,
        sections: Vec<(String, Vec<u8>)>,
    },
    Other {
        cmd: u32,
        payload: usize,
    },
}

impl Command {
    fn size(&self) -> u64 {
        match self {
            Command::Segment { sections, .. } => {
                SegmentCommand64::SIZE + sections.len() as u64 * Section64::SIZE
            }
            Command::Other { payload, .. } => LoadCommand::SIZE + *payload as u64,
        }
    }
}

fn name_field(name: &str) -> [u8; 16] {
    let mut field = [0u8; 16];
    let len = name.len().min(16);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field
}

/// Builds Mach-O 64 object files: header, load commands, then the contents
/// of every section in command order.
pub struct MachOBuilder {
    big_endian: bool,
    commands: Vec<Command>,
}

impl Default for MachOBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MachOBuilder {
    pub fn new() -> Self {
        Self {
            big_endian: false,
            commands: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn segment(mut self, name: &str, sections: &[(&str, &[u8])]) -> Self {
        self.commands.push(Command::Segment {
            name: name.to_string(),
            sections: sections
                .iter()
                .map(|(n, d)| (n.to_string(), d.to_vec()))
                .collect(),
        });
        self
    }

    /// Appends a non-segment load command with `payload` filler bytes.
    pub fn command(mut self, cmd: u32, payload: usize) -> Self {
        self.commands.push(Command::Other { cmd, payload });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.big_endian {
            self.build_with::<BigEndian>()
        } else {
            self.build_with::<LittleEndian>()
        }
    }

    fn build_with<E: ByteOrder>(&self) -> Vec<u8> {
        let sizeofcmds: u64 = self.commands.iter().map(Command::size).sum();
        let mut data_offset = MachHeader64::SIZE + sizeofcmds;
        let mut data = Vec::new();

        let mut out = Vec::new();
        out.write_u32::<E>(MH_MAGIC_64).unwrap();
        out.write_u32::<E>(CPU_TYPE_X86_64).unwrap();
        out.write_u32::<E>(3).unwrap();
        out.write_u32::<E>(MH_OBJECT).unwrap();
        out.write_u32::<E>(self.commands.len() as u32).unwrap();
        out.write_u32::<E>(sizeofcmds as u32).unwrap();
        out.write_u32::<E>(0).unwrap();
        out.write_u32::<E>(0).unwrap();

        for command in &self.commands {
            match command {
                Command::Segment { name, sections } => {
                    let filesize: u64 = sections.iter().map(|(_, d)| d.len() as u64).sum();
                    out.write_u32::<E>(LC_SEGMENT_64).unwrap();
                    out.write_u32::<E>(command.size() as u32).unwrap();
                    out.extend_from_slice(&name_field(name));
                    out.write_u64::<E>(0).unwrap();
                    out.write_u64::<E>(filesize).unwrap();
                    out.write_u64::<E>(data_offset).unwrap();
                    out.write_u64::<E>(filesize).unwrap();
                    out.write_i32::<E>(7).unwrap();
                    out.write_i32::<E>(7).unwrap();
                    out.write_u32::<E>(sections.len() as u32).unwrap();
                    out.write_u32::<E>(0).unwrap();

                    for (sectname, contents) in sections {
                        out.extend_from_slice(&name_field(sectname));
                        out.extend_from_slice(&name_field(name));
                        out.write_u64::<E>(0).unwrap();
                        out.write_u64::<E>(contents.len() as u64).unwrap();
                        out.write_u32::<E>(data_offset as u32).unwrap();
                        for _ in 0..7 {
                            out.write_u32::<E>(0).unwrap();
                        }
                        data_offset += contents.len() as u64;
                        data.extend_from_slice(contents);
                    }
                }
                Command::Other { cmd, payload } => {
                    out.write_u32::<E>(*cmd).unwrap();
                    out.write_u32::<E>(command.size() as u32).unwrap();
                    out.resize(out.len() + payload, 0xaa);
                }
            }
        }
        out.extend_from_slice(&data);
        out
    }
}
