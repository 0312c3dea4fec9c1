//! The DWARF section container: an owned-or-borrowed byte slice tagged by
//! section kind, per the design notes' "ownership of borrowed slices" --
//! the source's runtime owns-or-borrows flag becomes a compile-time sum
//! type here instead.

use std::ops::Deref;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    DebugInfo,
    DebugAbbrev,
    DebugAranges,
    DebugRanges,
    DebugLine,
    DebugStr,
    Invalid,
}

impl SectionKind {
    /// Maps an ELF section name to the DWARF section kind it carries, or
    /// `Invalid` if this isn't a DWARF section this crate understands.
    pub fn from_name(name: &str) -> SectionKind {
        match name {
            ".debug_info" => SectionKind::DebugInfo,
            ".debug_abbrev" => SectionKind::DebugAbbrev,
            ".debug_aranges" => SectionKind::DebugAranges,
            ".debug_ranges" => SectionKind::DebugRanges,
            ".debug_line" => SectionKind::DebugLine,
            ".debug_str" => SectionKind::DebugStr,
            _ => SectionKind::Invalid,
        }
    }
}

/// An immutable byte region that either owns its storage or borrows it
/// from a caller-supplied buffer. Ownership is a property of the value,
/// not a runtime flag, and is preserved across `Clone`.
#[derive(Debug, Clone)]
pub enum Bytes<'a> {
    Owned(Box<[u8]>),
    Borrowed(&'a [u8]),
}

impl<'a> Bytes<'a> {
    pub fn copy_from(bytes: &[u8]) -> Bytes<'static> {
        Bytes::Owned(bytes.to_vec().into_boxed_slice())
    }

    pub fn borrow(bytes: &'a [u8]) -> Bytes<'a> {
        Bytes::Borrowed(bytes)
    }

    pub fn owns_data(&self) -> bool {
        matches!(self, Bytes::Owned(_))
    }
}

impl<'a> Deref for Bytes<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Owned(b) => b,
            Bytes::Borrowed(b) => b,
        }
    }
}

/// A single DWARF section: its kind and its backing bytes.
///
/// `Section::default()` (`kind == Invalid`, zero-length) is the value
/// `DwarfContext` hands back for a section that wasn't present in the
/// object -- test its presence with [`Section::is_valid`], the explicit
/// analogue of the source's `operator bool`.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub bytes: Bytes<'a>,
}

impl<'a> Default for Section<'a> {
    fn default() -> Self {
        Section { kind: SectionKind::Invalid, bytes: Bytes::Borrowed(&[]) }
    }
}

impl<'a> Section<'a> {
    pub fn new(kind: SectionKind, bytes: Bytes<'a>) -> Self {
        Section { kind, bytes }
    }

    pub fn is_valid(&self) -> bool {
        self.kind != SectionKind::Invalid
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Recovers the section's data at its original `'a` lifetime, if it
    /// borrows rather than owns. DIE indexing needs this: a `Die<'a>`
    /// borrows strings straight out of `.debug_info`/`.debug_str`, so it
    /// can only be built over sections that were never copied.
    pub fn borrowed_bytes(&self) -> Option<&'a [u8]> {
        match self.bytes {
            Bytes::Borrowed(b) => Some(b),
            Bytes::Owned(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_section_reports_falsy() {
        let s = Section::default();
        assert!(!s.is_valid());
    }

    #[test]
    fn section_kind_from_name() {
        assert_eq!(SectionKind::from_name(".debug_info"), SectionKind::DebugInfo);
        assert_eq!(SectionKind::from_name(".text"), SectionKind::Invalid);
    }

    #[test]
    fn borrowed_section_does_not_own_data() {
        let data = [1u8, 2, 3];
        let section = Section::new(SectionKind::DebugStr, Bytes::borrow(&data));
        assert!(!section.bytes.owns_data());
        assert_eq!(section.as_bytes(), &data);
    }

    #[test]
    fn owned_section_copies_and_owns_data() {
        let data = [1u8, 2, 3];
        let section = Section::new(SectionKind::DebugStr, Bytes::copy_from(&data));
        assert!(section.bytes.owns_data());
        assert_eq!(section.as_bytes(), &data);
    }
}
