use crate::header::{fixed_name, Header};
use crate::Result;
use byteorder::{ByteOrder, ReadBytesExt};
use goblin::mach::constants::{SECTION_TYPE, S_GB_ZEROFILL, S_THREAD_LOCAL_ZEROFILL, S_ZEROFILL};
use std::io::{Cursor, Read};

/// Mach-O 64-bit file header (`mach_header_64`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MachHeader64 {
    pub magic: u32,
    pub cputype: i32,
    pub cpusubtype: i32,
    pub filetype: u32,
    /// Number of load commands following the header.
    pub ncmds: u32,
    /// Total size of all load commands.
    pub sizeofcmds: u32,
    pub flags: u32,
    pub reserved: u32,
}

impl Header for MachHeader64 {
    const SIZE: u64 = 32;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<MachHeader64> {
        let mut cur = Cursor::new(bytes);
        Ok(MachHeader64 {
            magic: cur.read_u32::<E>()?,
            cputype: cur.read_i32::<E>()?,
            cpusubtype: cur.read_i32::<E>()?,
            filetype: cur.read_u32::<E>()?,
            ncmds: cur.read_u32::<E>()?,
            sizeofcmds: cur.read_u32::<E>()?,
            flags: cur.read_u32::<E>()?,
            reserved: cur.read_u32::<E>()?,
        })
    }
}

/// Common prefix shared by every load command.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LoadCommand {
    pub cmd: u32,
    /// Total size of the command, including this prefix.
    pub cmdsize: u32,
}

impl Header for LoadCommand {
    const SIZE: u64 = 8;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<LoadCommand> {
        let mut cur = Cursor::new(bytes);
        Ok(LoadCommand {
            cmd: cur.read_u32::<E>()?,
            cmdsize: cur.read_u32::<E>()?,
        })
    }
}

/// `LC_SEGMENT_64` load command; `nsects` section records follow it inline.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SegmentCommand64 {
    pub cmd: u32,
    pub cmdsize: u32,
    pub segname: [u8; 16],
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: i32,
    pub initprot: i32,
    pub nsects: u32,
    pub flags: u32,
}

impl SegmentCommand64 {
    pub fn name(&self) -> &[u8] {
        fixed_name(&self.segname)
    }
}

impl Header for SegmentCommand64 {
    const SIZE: u64 = 72;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<SegmentCommand64> {
        let mut cur = Cursor::new(bytes);
        let cmd = cur.read_u32::<E>()?;
        let cmdsize = cur.read_u32::<E>()?;
        let mut segname = [0u8; 16];
        cur.read_exact(&mut segname)?;

        Ok(SegmentCommand64 {
            cmd,
            cmdsize,
            segname,
            vmaddr: cur.read_u64::<E>()?,
            vmsize: cur.read_u64::<E>()?,
            fileoff: cur.read_u64::<E>()?,
            filesize: cur.read_u64::<E>()?,
            maxprot: cur.read_i32::<E>()?,
            initprot: cur.read_i32::<E>()?,
            nsects: cur.read_u32::<E>()?,
            flags: cur.read_u32::<E>()?,
        })
    }
}

/// Section record inside a 64-bit segment (`section_64`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Section64 {
    /// Fixed-width name, NUL-padded unless it fills all 16 bytes.
    pub sectname: [u8; 16],
    pub segname: [u8; 16],
    pub addr: u64,
    pub size: u64,
    /// File offset of the section contents.
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
    pub reserved1: u32,
    pub reserved2: u32,
    pub reserved3: u32,
}

impl Section64 {
    pub fn name(&self) -> &[u8] {
        fixed_name(&self.sectname)
    }

    pub fn segment_name(&self) -> &[u8] {
        fixed_name(&self.segname)
    }

    /// Zero-fill sections occupy no file space; `offset` is meaningless.
    pub fn is_zerofill(&self) -> bool {
        matches!(
            self.flags & SECTION_TYPE,
            S_ZEROFILL | S_GB_ZEROFILL | S_THREAD_LOCAL_ZEROFILL
        )
    }
}

impl Header for Section64 {
    const SIZE: u64 = 80;

    fn parse<E: ByteOrder>(bytes: &[u8]) -> Result<Section64> {
        let mut cur = Cursor::new(bytes);
        let mut sectname = [0u8; 16];
        cur.read_exact(&mut sectname)?;
        let mut segname = [0u8; 16];
        cur.read_exact(&mut segname)?;

        Ok(Section64 {
            sectname,
            segname,
            addr: cur.read_u64::<E>()?,
            size: cur.read_u64::<E>()?,
            offset: cur.read_u32::<E>()?,
            align: cur.read_u32::<E>()?,
            reloff: cur.read_u32::<E>()?,
            nreloc: cur.read_u32::<E>()?,
            flags: cur.read_u32::<E>()?,
            reserved1: cur.read_u32::<E>()?,
            reserved2: cur.read_u32::<E>()?,
            reserved3: cur.read_u32::<E>()?,
        })
    }
}
