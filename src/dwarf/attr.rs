//! Decodes attribute values out of `.debug_info`, given the form named by
//! the owning abbreviation's attribute specification.
//!
//! The byte length of a value is entirely determined by its form (and, for
//! a handful of forms, by `address_size`/`dwarf_width`) -- this mirrors
//! `original_source/dwarf/dwarf.cpp`'s `attributeSize()`, which is the
//! ground truth for every case below. An unrecognised form is fatal: unlike
//! an unknown DIE tag, the decoder has no way to know how many bytes to
//! skip.

use super::tags::{AttrForm, AttrName};
use crate::error::{Error, ErrorKind, Result};
use crate::leb;

/// A decoded attribute value, still borrowing from the section it came
/// from. `Strp`/`RefAddr` keep the raw section-relative offset; resolving
/// them against `.debug_str` or another compilation unit is a caller
/// concern (see [`super::die::resolve_name`] for the one case this crate
/// resolves eagerly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue<'a> {
    Address(u64),
    Block(&'a [u8]),
    Constant(u64),
    SData(i64),
    UData(u64),
    String(&'a str),
    Strp(u64),
    Flag(bool),
    FlagPresent,
    SecOffset(u64),
    ExprLoc(&'a [u8]),
    Ref(u64),
    RefAddr(u64),
    RefSig8(u64),
}

impl<'a> AttrValue<'a> {
    pub fn as_u64(&self) -> Result<u64> {
        match *self {
            AttrValue::Address(v)
            | AttrValue::Constant(v)
            | AttrValue::UData(v)
            | AttrValue::Strp(v)
            | AttrValue::SecOffset(v)
            | AttrValue::Ref(v)
            | AttrValue::RefAddr(v)
            | AttrValue::RefSig8(v) => Ok(v),
            AttrValue::SData(v) if v >= 0 => Ok(v as u64),
            AttrValue::Flag(b) => Ok(b as u64),
            _ => Err(Error::new(ErrorKind::TypeMismatch, 0)),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match *self {
            AttrValue::SData(v) => Ok(v),
            AttrValue::Constant(v) | AttrValue::UData(v) => Ok(v as i64),
            _ => Err(Error::new(ErrorKind::TypeMismatch, 0)),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        match *self {
            AttrValue::String(s) => Ok(s),
            _ => Err(Error::new(ErrorKind::TypeMismatch, 0)),
        }
    }

    pub fn as_flag(&self) -> Result<bool> {
        match *self {
            AttrValue::Flag(b) => Ok(b),
            AttrValue::FlagPresent => Ok(true),
            _ => Err(Error::new(ErrorKind::TypeMismatch, 0)),
        }
    }

    pub fn as_block(&self) -> Result<&'a [u8]> {
        match *self {
            AttrValue::Block(b) | AttrValue::ExprLoc(b) => Ok(b),
            _ => Err(Error::new(ErrorKind::TypeMismatch, 0)),
        }
    }
}

fn read_address(bytes: &[u8], offset: usize, address_size: u8) -> Result<u64> {
    match address_size {
        4 => bytes.get(0..4)
            .map(|s| u32::from_le_bytes(s.try_into().unwrap()) as u64)
            .ok_or(Error::new(ErrorKind::Truncated, offset)),
        8 => bytes.get(0..8)
            .map(|s| u64::from_le_bytes(s.try_into().unwrap()))
            .ok_or(Error::new(ErrorKind::Truncated, offset)),
        _ => Err(Error::new(ErrorKind::Overflow, offset)),
    }
}

fn read_offset(bytes: &[u8], offset: usize, width: u8) -> Result<u64> {
    read_address(bytes, offset, width)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes.get(0..2)
        .map(|s| u16::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, offset))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes.get(0..4)
        .map(|s| u32::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, offset))
}

fn read_u64(bytes: &[u8], offset: usize) -> Result<u64> {
    bytes.get(0..8)
        .map(|s| u64::from_le_bytes(s.try_into().unwrap()))
        .ok_or(Error::new(ErrorKind::Truncated, offset))
}

/// Decodes a single attribute's value, given the cursor at which it
/// begins. `offset` is the absolute offset of that cursor, used only for
/// error reporting. Returns the value and the number of bytes consumed.
pub fn decode_attribute_value<'a>(
    bytes: &'a [u8],
    offset: usize,
    form: AttrForm,
    address_size: u8,
    dwarf_width: u8,
) -> Result<(AttrValue<'a>, usize)> {
    match form {
        AttrForm::Address => {
            let v = read_address(bytes, offset, address_size)?;
            Ok((AttrValue::Address(v), address_size as usize))
        }
        AttrForm::Block1 => {
            let len = *bytes.get(0).ok_or(Error::new(ErrorKind::Truncated, offset))? as usize;
            let payload = bytes.get(1..1 + len).ok_or(Error::new(ErrorKind::Truncated, offset + 1))?;
            Ok((AttrValue::Block(payload), 1 + len))
        }
        AttrForm::Block2 => {
            let len = read_u16(bytes, offset)? as usize;
            let payload = bytes.get(2..2 + len).ok_or(Error::new(ErrorKind::Truncated, offset + 2))?;
            Ok((AttrValue::Block(payload), 2 + len))
        }
        AttrForm::Block4 => {
            let len = read_u32(bytes, offset)? as usize;
            let payload = bytes.get(4..4 + len).ok_or(Error::new(ErrorKind::Truncated, offset + 4))?;
            Ok((AttrValue::Block(payload), 4 + len))
        }
        AttrForm::Block => {
            let (len, n) = leb::uleb128_decode(bytes)?;
            let len = len as usize;
            let payload = bytes.get(n..n + len).ok_or(Error::new(ErrorKind::Truncated, offset + n))?;
            Ok((AttrValue::Block(payload), n + len))
        }
        AttrForm::Data1 => {
            let v = *bytes.get(0).ok_or(Error::new(ErrorKind::Truncated, offset))? as u64;
            Ok((AttrValue::Constant(v), 1))
        }
        AttrForm::Data2 => Ok((AttrValue::Constant(read_u16(bytes, offset)? as u64), 2)),
        AttrForm::Data4 => Ok((AttrValue::Constant(read_u32(bytes, offset)? as u64), 4)),
        AttrForm::Data8 => Ok((AttrValue::Constant(read_u64(bytes, offset)?), 8)),
        AttrForm::SData => {
            let (v, n) = leb::ileb128_decode(bytes)?;
            Ok((AttrValue::SData(v), n))
        }
        AttrForm::UData => {
            let (v, n) = leb::uleb128_decode(bytes)?;
            Ok((AttrValue::UData(v), n))
        }
        AttrForm::ExprLoc => {
            let (len, n) = leb::uleb128_decode(bytes)?;
            let len = len as usize;
            let payload = bytes.get(n..n + len).ok_or(Error::new(ErrorKind::Truncated, offset + n))?;
            Ok((AttrValue::ExprLoc(payload), n + len))
        }
        AttrForm::Flag => {
            let v = *bytes.get(0).ok_or(Error::new(ErrorKind::Truncated, offset))?;
            Ok((AttrValue::Flag(v != 0), 1))
        }
        AttrForm::FlagPresent => Ok((AttrValue::FlagPresent, 0)),
        AttrForm::SecOffset => Ok((AttrValue::SecOffset(read_offset(bytes, offset, dwarf_width)?), dwarf_width as usize)),
        AttrForm::Ref1 => {
            let v = *bytes.get(0).ok_or(Error::new(ErrorKind::Truncated, offset))? as u64;
            Ok((AttrValue::Ref(v), 1))
        }
        AttrForm::Ref2 => Ok((AttrValue::Ref(read_u16(bytes, offset)? as u64), 2)),
        AttrForm::Ref4 => Ok((AttrValue::Ref(read_u32(bytes, offset)? as u64), 4)),
        AttrForm::Ref8 => Ok((AttrValue::Ref(read_u64(bytes, offset)?), 8)),
        AttrForm::RefUData => {
            let (v, n) = leb::uleb128_decode(bytes)?;
            Ok((AttrValue::Ref(v), n))
        }
        AttrForm::RefSig8 => Ok((AttrValue::RefSig8(read_u64(bytes, offset)?), 8)),
        AttrForm::RefAddr => Ok((AttrValue::RefAddr(read_offset(bytes, offset, dwarf_width)?), dwarf_width as usize)),
        AttrForm::String => {
            let end = bytes.iter().position(|&b| b == 0)
                .ok_or(Error::new(ErrorKind::MalformedString, offset))?;
            let s = std::str::from_utf8(&bytes[..end])
                .map_err(|_| Error::new(ErrorKind::MalformedString, offset))?;
            Ok((AttrValue::String(s), end + 1))
        }
        AttrForm::Strp => Ok((AttrValue::Strp(read_offset(bytes, offset, dwarf_width)?), dwarf_width as usize)),
        AttrForm::Indirect | AttrForm::Unrecognized(_) => Err(Error::new(ErrorKind::UnknownForm, offset)),
    }
}

/// Pairs an attribute name with its decoded value, as produced by a fully
/// materialised [`super::die::Die`].
pub type Attribute<'a> = (AttrName, AttrValue<'a>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fixed_width_forms() {
        let bytes = [0x2a, 0, 0, 0];
        let (v, n) = decode_attribute_value(&bytes, 0, AttrForm::Data4, 8, 4).unwrap();
        assert_eq!(v, AttrValue::Constant(0x2a));
        assert_eq!(n, 4);
    }

    #[test]
    fn decodes_inline_string() {
        let bytes = b"hi\0trailing";
        let (v, n) = decode_attribute_value(bytes, 0, AttrForm::String, 8, 4).unwrap();
        assert_eq!(v.as_str().unwrap(), "hi");
        assert_eq!(n, 3);
    }

    #[test]
    fn decodes_uleb_block() {
        let bytes = [3u8, 0xAA, 0xBB, 0xCC, 0xFF];
        let (v, n) = decode_attribute_value(&bytes, 0, AttrForm::Block, 8, 4).unwrap();
        assert_eq!(v.as_block().unwrap(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(n, 4);
    }

    #[test]
    fn flag_present_consumes_nothing() {
        let bytes: [u8; 0] = [];
        let (v, n) = decode_attribute_value(&bytes, 0, AttrForm::FlagPresent, 8, 4).unwrap();
        assert_eq!(v, AttrValue::FlagPresent);
        assert_eq!(n, 0);
        assert!(v.as_flag().unwrap());
    }

    #[test]
    fn sec_offset_uses_dwarf_width_not_address_size() {
        let bytes = [1, 0, 0, 0, 0, 0, 0, 0];
        let (v, n) = decode_attribute_value(&bytes, 0, AttrForm::SecOffset, 8, 4).unwrap();
        assert_eq!(v, AttrValue::SecOffset(1));
        assert_eq!(n, 4);
    }

    #[test]
    fn unrecognised_form_is_fatal() {
        let bytes = [0u8; 8];
        let err = decode_attribute_value(&bytes, 0, AttrForm::Unrecognized(0x99), 8, 4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownForm);
    }

    #[test]
    fn string_without_terminator_is_malformed() {
        let bytes = [b'a', b'b', b'c'];
        let err = decode_attribute_value(&bytes, 0, AttrForm::String, 8, 4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedString);
    }
}
