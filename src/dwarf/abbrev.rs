//! Parses and indexes `.debug_abbrev`, the dictionary of DIE templates
//! referenced by abbreviation code from `.debug_info`.
//!
//! Grounded on `original_source/dwarf/dwarf.cpp`'s
//! `DebugEntryParser::nextAbbreviation` and `buildIndexes`: index the
//! table once up front (code -> byte offset), then re-parse a single
//! abbreviation lazily whenever a DIE references its code. The eager
//! index build is the only pass that walks the whole section; everything
//! after that is O(1) lookup plus a bounded re-parse.

use std::collections::HashMap;

use super::tags::{AttrForm, AttrName, DieTag};
use crate::error::{Error, ErrorKind, Result};
use crate::leb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpecification {
    pub name: AttrName,
    pub form: AttrForm,
}

#[derive(Debug, Clone)]
pub struct Abbreviation {
    pub code: u64,
    pub tag: DieTag,
    pub has_children: bool,
    pub attributes: Vec<AttributeSpecification>,
}

/// Reads one (name, form) pair. Returns `None` in place of the spec once
/// the null-pair terminator (`0, 0`) is hit.
fn read_attribute_spec(bytes: &[u8]) -> Result<(Option<AttributeSpecification>, usize)> {
    let (name, n1) = leb::uleb128_decode(bytes)?;
    let (form, n2) = leb::uleb128_decode(bytes.get(n1..).ok_or(Error::new(ErrorKind::Truncated, n1))?)?;
    let consumed = n1 + n2;
    if name == 0 && form == 0 {
        Ok((None, consumed))
    } else {
        Ok((Some(AttributeSpecification { name: AttrName::from_u64(name), form: AttrForm::from_u64(form) }), consumed))
    }
}

/// Parses a single abbreviation declaration starting at `bytes[0]`.
/// Returns `None` if the declaration is the null entry terminating the
/// table, together with the number of bytes consumed either way.
pub fn parse_abbreviation(bytes: &[u8]) -> Result<(Option<Abbreviation>, usize)> {
    let (code, mut consumed) = leb::uleb128_decode(bytes)?;
    if code == 0 {
        return Ok((None, consumed));
    }

    let (tag_value, n) = leb::uleb128_decode(bytes.get(consumed..).ok_or(Error::new(ErrorKind::Truncated, consumed))?)?;
    consumed += n;

    let has_children = *bytes.get(consumed).ok_or(Error::new(ErrorKind::Truncated, consumed))? != 0;
    consumed += 1;

    let mut attributes = Vec::new();
    loop {
        let (spec, n) = read_attribute_spec(bytes.get(consumed..).ok_or(Error::new(ErrorKind::Truncated, consumed))?)?;
        consumed += n;
        match spec {
            Some(s) => attributes.push(s),
            None => break,
        }
    }

    Ok((Some(Abbreviation { code, tag: DieTag::from_u64(tag_value), has_children, attributes }), consumed))
}

/// The code -> byte-offset index built by one pass over `.debug_abbrev`.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    offsets: HashMap<u64, usize>,
}

impl AbbreviationTable {
    /// Walks `bytes` once, recording each abbreviation's starting offset.
    /// A code seen twice is `DuplicateAbbreviation`, per the design note
    /// that a reused code is never valid within one table.
    pub fn build(bytes: &[u8]) -> Result<AbbreviationTable> {
        let mut offsets = HashMap::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let start = offset;
            let (maybe_abbrev, consumed) = parse_abbreviation(&bytes[offset..])?;
            let abbrev = match maybe_abbrev {
                Some(a) => a,
                None => break,
            };
            if offsets.insert(abbrev.code, start).is_some() {
                return Err(Error::new(ErrorKind::DuplicateAbbreviation, start));
            }
            offset = start + consumed;
        }
        Ok(AbbreviationTable { offsets })
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Looks up and re-parses the abbreviation for `code`. `caller_offset`
    /// is used only to place the error if `code` isn't in the index.
    pub fn get(&self, bytes: &[u8], code: u64, caller_offset: usize) -> Result<Abbreviation> {
        let &offset = self.offsets.get(&code)
            .ok_or(Error::new(ErrorKind::InvalidAbbreviation, caller_offset))?;
        let (abbrev, _) = parse_abbreviation(&bytes[offset..])?;
        Ok(abbrev.expect("index only ever stores offsets of non-null abbreviations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Vec<u8> {
        let mut bytes = Vec::new();
        // Abbreviation 1: DW_TAG_compile_unit, has children, one DW_AT_name/DW_FORM_string attribute.
        bytes.push(1); // code
        bytes.push(0x11); // DW_TAG_compile_unit
        bytes.push(1); // has_children
        bytes.push(0x03); // DW_AT_name
        bytes.push(0x08); // DW_FORM_string
        bytes.push(0); // terminator pair
        bytes.push(0);
        // Abbreviation 2: DW_TAG_base_type, no children, no attributes.
        bytes.push(2);
        bytes.push(0x24);
        bytes.push(0);
        bytes.push(0);
        bytes.push(0);
        // Null entry terminates the table.
        bytes.push(0);
        bytes
    }

    #[test]
    fn parses_single_abbreviation() {
        let bytes = sample_table();
        let (abbrev, consumed) = parse_abbreviation(&bytes).unwrap();
        let abbrev = abbrev.unwrap();
        assert_eq!(abbrev.code, 1);
        assert_eq!(abbrev.tag, DieTag::CompileUnit);
        assert!(abbrev.has_children);
        assert_eq!(abbrev.attributes.len(), 1);
        assert_eq!(abbrev.attributes[0].name, AttrName::Name);
        assert_eq!(abbrev.attributes[0].form, AttrForm::String);
        assert_eq!(consumed, 7);
    }

    #[test]
    fn builds_index_over_whole_table() {
        let bytes = sample_table();
        let table = AbbreviationTable::build(&bytes).unwrap();
        assert_eq!(table.len(), 2);
        let a1 = table.get(&bytes, 1, 0).unwrap();
        assert_eq!(a1.tag, DieTag::CompileUnit);
        let a2 = table.get(&bytes, 2, 0).unwrap();
        assert_eq!(a2.tag, DieTag::BaseType);
        assert!(!a2.has_children);
    }

    #[test]
    fn empty_table_indexes_to_nothing() {
        let table = AbbreviationTable::build(&[0]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let mut bytes = vec![1, 0x24, 0, 0, 0];
        bytes.extend_from_slice(&[1, 0x11, 0, 0, 0]);
        bytes.push(0);
        let err = AbbreviationTable::build(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateAbbreviation);
    }

    #[test]
    fn lookup_of_missing_code_fails() {
        let bytes = sample_table();
        let table = AbbreviationTable::build(&bytes).unwrap();
        let err = table.get(&bytes, 99, 0x42).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAbbreviation);
        assert_eq!(err.offset, 0x42);
    }
}
