//! Parses the line-number-program header out of `.debug_line` for DWARF
//! 2-4. Only the header (through the file name table) is decoded -- the
//! line number program itself (the state machine opcodes that follow) is
//! out of scope here, same as the source's `LineNumberProgramHeader32`.
//!
//! Grounded on `original_source/dwarf/lines.cpp`'s
//! `LineNumberProgramHeader32::parse`. That routine hard-codes a 32-bit
//! unit length; this version also recognises the 64-bit DWARF escape
//! (`0xFFFFFFFF` followed by an 8-byte length), matching how
//! `dwarf/context.rs` handles compilation unit headers, and reads
//! `maxOpsPerInstruction` only for version 4 and later, matching the
//! source's separate `dwarf2`/`dwarf4` namespaces collapsed into one
//! version-dispatched parser.

use crate::error::{Error, ErrorKind, Result};
use crate::leb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry<'a> {
    pub path: &'a str,
    pub include_dir_index: u64,
    pub last_modification_time: u64,
    pub file_size: u64,
}

#[derive(Debug, Clone)]
pub struct LineProgramHeader<'a> {
    pub unit_length: u64,
    pub version: u16,
    pub header_length: u64,
    pub min_instruction_length: u8,
    pub max_ops_per_instruction: u8,
    pub default_is_stmt: bool,
    pub line_base: i8,
    pub line_range: u8,
    pub opcode_base: u8,
    pub standard_opcode_lengths: Vec<u8>,
    pub include_directories: Vec<&'a str>,
    pub file_names: Vec<FileEntry<'a>>,
}

fn u16_at(bytes: &[u8], off: usize) -> Result<u16> {
    bytes.get(off..off + 2)
        .map(|s| u16::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, off))
}

fn u32_at(bytes: &[u8], off: usize) -> Result<u32> {
    bytes.get(off..off + 4)
        .map(|s| u32::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, off))
}

fn u64_at(bytes: &[u8], off: usize) -> Result<u64> {
    bytes.get(off..off + 8)
        .map(|s| u64::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, off))
}

fn byte_at(bytes: &[u8], off: usize) -> Result<u8> {
    bytes.get(off).copied().ok_or(Error::new(ErrorKind::Truncated, off))
}

/// Reads the DWARF "initial length" field, returning `(length, bytes
/// consumed, dwarf_width)`. A first word of `0xFFFFFFFF` escapes into the
/// 64-bit DWARF format, per the DWARF4 spec's §7.4.
fn read_initial_length(bytes: &[u8]) -> Result<(u64, usize, u8)> {
    let first = u32_at(bytes, 0)?;
    if first == 0xFFFF_FFFF {
        Ok((u64_at(bytes, 4)?, 12, 8))
    } else {
        Ok((first as u64, 4, 4))
    }
}

fn read_nul_terminated_str(bytes: &[u8], offset: usize) -> Result<(&str, usize)> {
    let region = bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?;
    let end = region.iter().position(|&b| b == 0)
        .ok_or(Error::new(ErrorKind::MalformedString, offset))?;
    let s = std::str::from_utf8(&region[..end])
        .map_err(|_| Error::new(ErrorKind::MalformedString, offset))?;
    Ok((s, end + 1))
}

/// Parses a line-number-program header starting at `bytes[0]`. Returns the
/// header and the absolute offset at which the line number program itself
/// (the opcode stream, not decoded here) begins.
pub fn parse_line_program_header(bytes: &[u8]) -> Result<(LineProgramHeader<'_>, usize)> {
    let (unit_length, mut offset, dwarf_width) = read_initial_length(bytes)?;
    let version = u16_at(bytes, offset)?;
    offset += 2;

    let (header_length, hl_size) = if dwarf_width == 8 {
        (u64_at(bytes, offset)?, 8)
    } else {
        (u32_at(bytes, offset)? as u64, 4)
    };
    offset += hl_size;
    let program_start = offset + header_length as usize;

    let min_instruction_length = byte_at(bytes, offset)?;
    offset += 1;
    let max_ops_per_instruction = if version >= 4 {
        let v = byte_at(bytes, offset)?;
        offset += 1;
        v
    } else {
        1
    };
    let default_is_stmt = byte_at(bytes, offset)? != 0;
    offset += 1;
    let line_base = byte_at(bytes, offset)? as i8;
    offset += 1;
    let line_range = byte_at(bytes, offset)?;
    offset += 1;
    let opcode_base = byte_at(bytes, offset)?;
    offset += 1;

    let standard_opcode_count = (opcode_base as usize).saturating_sub(1);
    let standard_opcode_lengths = bytes.get(offset..offset + standard_opcode_count)
        .ok_or(Error::new(ErrorKind::Truncated, offset))?
        .to_vec();
    offset += standard_opcode_count;

    let mut include_directories = Vec::new();
    loop {
        let region = bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?;
        if region.first() == Some(&0) {
            offset += 1;
            break;
        }
        let (s, consumed) = read_nul_terminated_str(bytes, offset)?;
        include_directories.push(s);
        offset += consumed;
    }

    let mut file_names = Vec::new();
    loop {
        let region = bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?;
        if region.first() == Some(&0) {
            offset += 1;
            break;
        }
        let (path, consumed) = read_nul_terminated_str(bytes, offset)?;
        offset += consumed;
        let (include_dir_index, n1) = leb::uleb128_decode(bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?)?;
        offset += n1;
        let (last_modification_time, n2) = leb::uleb128_decode(bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?)?;
        offset += n2;
        let (file_size, n3) = leb::uleb128_decode(bytes.get(offset..).ok_or(Error::new(ErrorKind::Truncated, offset))?)?;
        offset += n3;
        file_names.push(FileEntry { path, include_dir_index, last_modification_time, file_size });
    }

    Ok((
        LineProgramHeader {
            unit_length,
            version,
            header_length,
            min_instruction_length,
            max_ops_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
            include_directories,
            file_names,
        },
        program_start,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dwarf2_header() -> Vec<u8> {
        let mut bytes = Vec::new();
        let patch_at = |bytes: &mut Vec<u8>, at: usize, v: u32| bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());

        bytes.extend_from_slice(&0u32.to_le_bytes()); // unit_length, patched below
        bytes.extend_from_slice(&2u16.to_le_bytes()); // version
        bytes.extend_from_slice(&0u32.to_le_bytes()); // header_length, patched below
        bytes.push(1); // min_instruction_length
        bytes.push(1); // default_is_stmt
        bytes.push((-5i8) as u8); // line_base
        bytes.push(14); // line_range
        bytes.push(13); // opcode_base -> 12 standard opcode lengths
        bytes.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        // include directories: one entry then terminator
        bytes.extend_from_slice(b"/src\0");
        bytes.push(0);
        // file names: one entry then terminator
        bytes.extend_from_slice(b"main.c\0");
        bytes.push(0); // include_dir_index
        bytes.push(0); // mtime
        bytes.push(0); // size
        bytes.push(0); // terminator

        let header_length = (bytes.len() - 10) as u32;
        patch_at(&mut bytes, 6, header_length);
        let unit_length = (bytes.len() - 4) as u32;
        patch_at(&mut bytes, 0, unit_length);
        bytes
    }

    #[test]
    fn parses_dwarf2_header() {
        let bytes = dwarf2_header();
        let (header, program_start) = parse_line_program_header(&bytes).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.max_ops_per_instruction, 1);
        assert_eq!(header.line_base, -5);
        assert_eq!(header.opcode_base, 13);
        assert_eq!(header.standard_opcode_lengths.len(), 12);
        assert_eq!(header.include_directories, vec!["/src"]);
        assert_eq!(header.file_names.len(), 1);
        assert_eq!(header.file_names[0].path, "main.c");
        assert_eq!(program_start, bytes.len());
    }

    #[test]
    fn dwarf4_header_reads_max_ops_per_instruction() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&4u16.to_le_bytes()); // version 4
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(1); // min_instruction_length
        bytes.push(1); // max_ops_per_instruction
        bytes.push(1); // default_is_stmt
        bytes.push(1); // line_base
        bytes.push(14); // line_range
        bytes.push(1); // opcode_base -> zero standard opcode lengths
        bytes.push(0); // include dirs terminator (none)
        bytes.push(0); // file names terminator (none)

        let header_length = (bytes.len() - 10) as u32;
        bytes[6..10].copy_from_slice(&header_length.to_le_bytes());
        let unit_length = (bytes.len() - 4) as u32;
        bytes[0..4].copy_from_slice(&unit_length.to_le_bytes());

        let (header, _) = parse_line_program_header(&bytes).unwrap();
        assert_eq!(header.version, 4);
        assert_eq!(header.max_ops_per_instruction, 1);
        assert!(header.include_directories.is_empty());
        assert!(header.file_names.is_empty());
    }

    #[test]
    fn sixty_four_bit_dwarf_escape_is_recognised() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes()); // unit_length, patched below
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes()); // header_length, patched below
        bytes.push(1);
        bytes.push(1);
        bytes.push(0);
        bytes.push(14);
        bytes.push(1);
        bytes.push(0); // include dirs terminator
        bytes.push(0); // file names terminator

        let header_length = (bytes.len() - 22) as u64;
        bytes[14..22].copy_from_slice(&header_length.to_le_bytes());

        let (header, _) = parse_line_program_header(&bytes).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.opcode_base, 1);
    }
}
