//! Mach-O 64 section extraction.
//!
//! Load commands are walked one at a time: only the common prefix is read
//! first and the start of the next command is fixed from `cmdsize` before the
//! command is decoded, so commands of unknown type are skipped without ever
//! being interpreted. Every multi-byte field is decoded in the byte order the
//! header magic implies.

use crate::header::macho::{LoadCommand, MachHeader64, Section64, SegmentCommand64};
use crate::header::Header;
use crate::reader::ByteRangeReader;
use crate::sections::SectionDescriptor;
use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use goblin::mach::header::{MH_CIGAM_64, MH_MAGIC_64};
use goblin::mach::load_command::LC_SEGMENT_64;
use log::{debug, trace, warn};
use std::io::{Read, Seek};
use std::ops::ControlFlow;

/// Largest zero-fill section materialized in memory.
const MAX_ZEROFILL_SIZE: u64 = 16 << 20;

/// A requested Mach-O section, optionally qualified by its segment
/// (`__DATA,__buildinfo`).
#[derive(Debug, Clone, Copy)]
struct SectionQuery<'a> {
    segment: Option<&'a [u8]>,
    section: &'a [u8],
}

impl<'a> SectionQuery<'a> {
    fn new(name: &'a str) -> Self {
        match name.split_once(',') {
            Some((segment, section)) => Self {
                segment: Some(segment.as_bytes()),
                section: section.as_bytes(),
            },
            None => Self {
                segment: None,
                section: name.as_bytes(),
            },
        }
    }

    fn matches(&self, sect: &Section64) -> bool {
        sect.name() == self.section && self.segment.map_or(true, |seg| sect.segment_name() == seg)
    }
}

/// Calls `visit` for every section of every `LC_SEGMENT_64` command, in
/// load-command order, until it breaks.
fn walk_sections<E, R, T, F>(reader: &mut ByteRangeReader<R>, mut visit: F) -> Result<Option<T>>
where
    E: ByteOrder,
    R: Read + Seek,
    F: FnMut(&Section64) -> ControlFlow<T>,
{
    let header = MachHeader64::read_at::<E, R>(reader, 0)?;
    debug!(
        "Mach-O header: ncmds={} sizeofcmds={}",
        header.ncmds, header.sizeofcmds
    );

    let mut next = MachHeader64::SIZE;
    for index in 0..header.ncmds {
        let start = next;
        let command = LoadCommand::read_at::<E, R>(reader, start)?;
        if u64::from(command.cmdsize) < LoadCommand::SIZE {
            return Err(Error::CorruptData(format!(
                "load command {index} at {start:#x} has size {}",
                command.cmdsize
            )));
        }
        next = start + u64::from(command.cmdsize);
        trace!(
            "load command {index}: cmd={:#x} cmdsize={} @{start:#x}",
            command.cmd,
            command.cmdsize
        );

        if command.cmd != LC_SEGMENT_64 {
            continue;
        }

        let segment = SegmentCommand64::read_at::<E, R>(reader, start)?;
        let needed = SegmentCommand64::SIZE + u64::from(segment.nsects) * Section64::SIZE;
        if u64::from(segment.cmdsize) < needed {
            return Err(Error::CorruptData(format!(
                "segment {} declares {} sections but is only {} bytes",
                String::from_utf8_lossy(segment.name()),
                segment.nsects,
                segment.cmdsize
            )));
        }
        trace!(
            "segment {}: {} sections",
            String::from_utf8_lossy(segment.name()),
            segment.nsects
        );

        for i in 0..u64::from(segment.nsects) {
            let offset = start + SegmentCommand64::SIZE + i * Section64::SIZE;
            let sect = Section64::read_at::<E, R>(reader, offset)?;
            if let ControlFlow::Break(found) = visit(&sect) {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

/// Reads the header magic and runs `walk_sections` in the byte order it implies.
fn walk<R, T, F>(reader: &mut ByteRangeReader<R>, visit: F) -> Result<Option<T>>
where
    R: Read + Seek,
    F: FnMut(&Section64) -> ControlFlow<T>,
{
    let magic = reader.read_exact_at(0, 4)?;
    match LittleEndian::read_u32(&magic) {
        MH_MAGIC_64 => walk_sections::<LittleEndian, R, T, F>(reader, visit),
        MH_CIGAM_64 => walk_sections::<BigEndian, R, T, F>(reader, visit),
        _ => Err(Error::InvalidFormat(
            "not a valid 64-bit Mach-O file".into(),
        )),
    }
}

/// Extracts the contents of the first Mach-O 64 section named `name`.
///
/// `name` is either a bare section name, matched in any segment, or
/// `SEGMENT,section`.
pub fn extract_macho<R: Read + Seek>(stream: &mut R, name: &str) -> Result<Vec<u8>> {
    let mut reader = ByteRangeReader::new(stream)?;
    let query = SectionQuery::new(name);

    let sect = walk(&mut reader, |sect| {
        if query.matches(sect) {
            ControlFlow::Break(*sect)
        } else {
            ControlFlow::Continue(())
        }
    })?
    .ok_or_else(|| Error::SectionNotFound {
        name: name.to_string(),
    })?;

    if sect.is_zerofill() {
        // No file contents back the section; its payload is `size` zero bytes.
        if sect.size > MAX_ZEROFILL_SIZE {
            return Err(Error::CorruptData(format!(
                "zero-fill section {name} declares {} bytes, more than {MAX_ZEROFILL_SIZE}",
                sect.size
            )));
        }
        warn!("{name} is a zero-fill section; returning {} zero bytes", sect.size);
        return Ok(vec![0; sect.size as usize]);
    }
    debug!("found {name} at offset {:#x}, {} bytes", sect.offset, sect.size);
    reader.read_exact_at(u64::from(sect.offset), sect.size)
}

/// Lists every section of every 64-bit segment as `segment,section`.
pub fn list_macho_sections<R: Read + Seek>(stream: &mut R) -> Result<Vec<SectionDescriptor>> {
    let mut reader = ByteRangeReader::new(stream)?;
    let mut sections = Vec::new();

    walk::<_, (), _>(&mut reader, |sect| {
        sections.push(SectionDescriptor {
            name: format!(
                "{},{}",
                String::from_utf8_lossy(sect.segment_name()),
                String::from_utf8_lossy(sect.name())
            ),
            file_offset: u64::from(sect.offset),
            size: sect.size,
        });
        ControlFlow::Continue(())
    })?;
    Ok(sections)
}
