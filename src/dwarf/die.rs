//! Parses the depth-first tree of debugging information entries out of
//! `.debug_info` and builds a flat, parent-pointing index over it.
//!
//! Grounded on `original_source/dwarf/dwarf.cpp`'s
//! `DebugEntryParser::parseDIEChain`/`dieFromId`: a single pass assigns
//! each DIE a stable id in pre-order (so `parent_id < own_id` always
//! holds) and records just enough to find it again -- the tag, the parent,
//! the resolved name if any, and the byte offset of its abbreviation code.
//! Pulling every attribute back out ([`die_from_id`]) is a second, lazy
//! pass over that one DIE only.

use super::abbrev::AbbreviationTable;
use super::attr::{decode_attribute_value, Attribute, AttrValue};
use super::tags::{AttrName, DieTag};
use crate::error::{Error, ErrorKind, Result};
use crate::leb;

/// One entry in the flat DIE index. `parent` is `None` only for the root
/// (compilation unit) DIE of each unit.
#[derive(Debug, Clone)]
pub struct DieIndexEntry<'a> {
    pub tag: DieTag,
    pub parent: Option<u64>,
    pub name: Option<&'a str>,
    offset: usize,
}

impl<'a> DieIndexEntry<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A fully materialised DIE: every attribute, decoded.
#[derive(Debug, Clone)]
pub struct Die<'a> {
    pub id: u64,
    pub tag: DieTag,
    pub parent: Option<u64>,
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> Die<'a> {
    pub fn attr(&self, name: AttrName) -> Option<&AttrValue<'a>> {
        self.attributes.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Resolves a `DW_AT_name` value to a borrowed string: inline for
/// `DW_FORM_string`, or looked up in `.debug_str` for `DW_FORM_strp`.
fn resolve_name<'a>(value: &AttrValue<'a>, debug_str: Option<&'a [u8]>) -> Option<&'a str> {
    match *value {
        AttrValue::String(s) => Some(s),
        AttrValue::Strp(off) => {
            let bytes = debug_str?;
            let region = bytes.get(off as usize..)?;
            let end = region.iter().position(|&b| b == 0)?;
            std::str::from_utf8(&region[..end]).ok()
        }
        _ => None,
    }
}

/// Parameters shared by every DIE in one compilation unit. Bundled to keep
/// the recursive walk's argument list from growing with every new field.
#[derive(Clone, Copy)]
pub struct DieParseParams<'a> {
    pub debug_abbrev: &'a [u8],
    pub debug_str: Option<&'a [u8]>,
    pub address_size: u8,
    pub dwarf_width: u8,
}

fn parse_die_chain<'a>(
    debug_info: &'a [u8],
    mut offset: usize,
    end: usize,
    abbrevs: &AbbreviationTable,
    params: DieParseParams<'a>,
    parent: Option<u64>,
    entries: &mut Vec<DieIndexEntry<'a>>,
) -> Result<usize> {
    loop {
        if offset >= end {
            break;
        }
        let code_offset = offset;
        let (code, n) = leb::uleb128_decode(&debug_info[offset..end])?;
        if n == 0 || code == 0 {
            offset += n.max(1);
            break;
        }
        offset += n;

        let abbrev = abbrevs.get(params.debug_abbrev, code, code_offset)?;
        let my_id = entries.len() as u64;

        // Reserve this DIE's slot before recursing into children so that
        // `parent_id < own_id` holds for every descendant.
        entries.push(DieIndexEntry { tag: abbrev.tag, parent, name: None, offset: code_offset });

        let mut name = None;
        for spec in &abbrev.attributes {
            let region = debug_info.get(offset..end).ok_or(Error::new(ErrorKind::Truncated, offset))?;
            let (value, consumed) = decode_attribute_value(region, offset, spec.form, params.address_size, params.dwarf_width)?;
            if spec.name == AttrName::Name {
                name = resolve_name(&value, params.debug_str);
            }
            offset += consumed;
        }
        entries[my_id as usize].name = name;

        if abbrev.has_children {
            offset = parse_die_chain(debug_info, offset, end, abbrevs, params, Some(my_id), entries)?;
        }
    }
    Ok(offset)
}

/// Builds the flat DIE index for one compilation unit, starting just past
/// its header. `end` bounds the unit's DIEs to its own `unit_length`.
pub fn build_die_index<'a>(
    debug_info: &'a [u8],
    body_offset: usize,
    end: usize,
    abbrevs: &AbbreviationTable,
    params: DieParseParams<'a>,
) -> Result<Vec<DieIndexEntry<'a>>> {
    let mut entries = Vec::new();
    parse_die_chain(debug_info, body_offset, end, abbrevs, params, None, &mut entries)?;
    Ok(entries)
}

/// Fully re-parses the DIE at `id`, decoding every attribute. Cheap
/// relative to indexing the whole unit, since only this one DIE's
/// abbreviation and attribute list are walked.
pub fn die_from_id<'a>(
    id: u64,
    entries: &[DieIndexEntry<'a>],
    debug_info: &'a [u8],
    abbrevs: &AbbreviationTable,
    params: DieParseParams<'a>,
) -> Result<Die<'a>> {
    let entry = entries.get(id as usize).ok_or(Error::new(ErrorKind::InvalidAbbreviation, 0))?;
    let mut offset = entry.offset;

    let (code, n) = leb::uleb128_decode(&debug_info[offset..])?;
    offset += n;

    let abbrev = abbrevs.get(params.debug_abbrev, code, entry.offset)?;
    let mut attributes = Vec::with_capacity(abbrev.attributes.len());
    for spec in &abbrev.attributes {
        let (value, consumed) = decode_attribute_value(&debug_info[offset..], offset, spec.form, params.address_size, params.dwarf_width)?;
        attributes.push((spec.name, value));
        offset += consumed;
    }

    Ok(Die { id, tag: abbrev.tag, parent: entry.parent, attributes })
}
