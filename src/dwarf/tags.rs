//! DIE tags, attribute names and attribute forms, as defined by DWARF 2-4.
//!
//! Values not recognised decode to an `Other`/`Unrecognized` variant rather
//! than failing outright -- an unknown *tag* is harmless (the DIE is just
//! opaque to callers that don't care about it); an unknown *form* is fatal
//! during parsing (see [`super::attr`]) because the decoder cannot know the
//! value's byte length.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DieTag {
    ArrayType,
    ClassType,
    EntryPoint,
    EnumerationType,
    FormalParameter,
    ImportedDeclaration,
    Label,
    LexicalBlock,
    Member,
    PointerType,
    ReferenceType,
    CompileUnit,
    StringType,
    StructureType,
    SubroutineType,
    Typedef,
    UnionType,
    UnspecifiedParameters,
    Variant,
    CommonBlock,
    CommonInclusion,
    Inheritance,
    InlinedSubroutine,
    Module,
    PtrToMemberType,
    SetType,
    SubrangeType,
    WithStmt,
    AccessDeclaration,
    BaseType,
    CatchBlock,
    ConstType,
    Constant,
    Enumerator,
    FileType,
    Friend,
    Namelist,
    NamelistItem,
    PackedType,
    Subprogram,
    TemplateTypeParameter,
    TemplateValueParameter,
    ThrownType,
    TryBlock,
    VariantPart,
    Variable,
    VolatileType,
    DwarfProcedure,
    RestrictType,
    InterfaceType,
    Namespace,
    ImportedModule,
    UnspecifiedType,
    PartialUnit,
    ImportedUnit,
    Condition,
    SharedType,
    TypeUnit,
    RvalueReferenceType,
    TemplateAlias,
    LoUser,
    HiUser,
    Other(u64),
}

impl DieTag {
    pub fn from_u64(value: u64) -> DieTag {
        match value {
            0x01 => DieTag::ArrayType,
            0x02 => DieTag::ClassType,
            0x03 => DieTag::EntryPoint,
            0x04 => DieTag::EnumerationType,
            0x05 => DieTag::FormalParameter,
            0x08 => DieTag::ImportedDeclaration,
            0x0a => DieTag::Label,
            0x0b => DieTag::LexicalBlock,
            0x0d => DieTag::Member,
            0x0f => DieTag::PointerType,
            0x10 => DieTag::ReferenceType,
            0x11 => DieTag::CompileUnit,
            0x12 => DieTag::StringType,
            0x13 => DieTag::StructureType,
            0x15 => DieTag::SubroutineType,
            0x16 => DieTag::Typedef,
            0x17 => DieTag::UnionType,
            0x18 => DieTag::UnspecifiedParameters,
            0x19 => DieTag::Variant,
            0x1a => DieTag::CommonBlock,
            0x1b => DieTag::CommonInclusion,
            0x1c => DieTag::Inheritance,
            0x1d => DieTag::InlinedSubroutine,
            0x1e => DieTag::Module,
            0x1f => DieTag::PtrToMemberType,
            0x20 => DieTag::SetType,
            0x21 => DieTag::SubrangeType,
            0x22 => DieTag::WithStmt,
            0x23 => DieTag::AccessDeclaration,
            0x24 => DieTag::BaseType,
            0x25 => DieTag::CatchBlock,
            0x26 => DieTag::ConstType,
            0x27 => DieTag::Constant,
            0x28 => DieTag::Enumerator,
            0x29 => DieTag::FileType,
            0x2a => DieTag::Friend,
            0x2b => DieTag::Namelist,
            0x2c => DieTag::NamelistItem,
            0x2d => DieTag::PackedType,
            0x2e => DieTag::Subprogram,
            0x2f => DieTag::TemplateTypeParameter,
            0x30 => DieTag::TemplateValueParameter,
            0x31 => DieTag::ThrownType,
            0x32 => DieTag::TryBlock,
            0x33 => DieTag::VariantPart,
            0x34 => DieTag::Variable,
            0x35 => DieTag::VolatileType,
            0x36 => DieTag::DwarfProcedure,
            0x37 => DieTag::RestrictType,
            0x38 => DieTag::InterfaceType,
            0x39 => DieTag::Namespace,
            0x3a => DieTag::ImportedModule,
            0x3b => DieTag::UnspecifiedType,
            0x3c => DieTag::PartialUnit,
            0x3d => DieTag::ImportedUnit,
            0x3f => DieTag::Condition,
            0x40 => DieTag::SharedType,
            0x41 => DieTag::TypeUnit,
            0x42 => DieTag::RvalueReferenceType,
            0x43 => DieTag::TemplateAlias,
            0x4080 => DieTag::LoUser,
            0xffff => DieTag::HiUser,
            other => DieTag::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName {
    Sibling,
    Location,
    Name,
    Ordering,
    ByteSize,
    BitOffset,
    BitSize,
    StmtList,
    LowPc,
    HighPc,
    Language,
    Discr,
    DiscrValue,
    Visibility,
    Import,
    StringLength,
    CommonReference,
    CompDir,
    ConstValue,
    ContainingType,
    DefaultValue,
    Inline,
    IsOptional,
    LowerBound,
    Producer,
    Prototyped,
    ReturnAddr,
    StartScope,
    BitStride,
    UpperBound,
    AbstractOrigin,
    Accessibility,
    AddressClass,
    Artificial,
    BaseTypes,
    CallingConvention,
    Count,
    DataMemberLocation,
    DeclColumn,
    DeclFile,
    DeclLine,
    Declaration,
    DiscrList,
    Encoding,
    External,
    FrameBase,
    Friend,
    IdentifierCase,
    MacroInfo,
    NamelistItem,
    Priority,
    Segment,
    Specification,
    StaticLink,
    Type,
    UseLocation,
    VariableParameter,
    Virtuality,
    VtableElemLocation,
    Allocated,
    Associated,
    DataLocation,
    ByteStride,
    EntryPc,
    UseUTF8,
    Extension,
    Ranges,
    Trampoline,
    CallColumn,
    CallFile,
    CallLine,
    Description,
    BinaryScale,
    DecimalScale,
    Small,
    DecimalSign,
    DigitCount,
    PictureString,
    Mutable,
    ThreadsScaled,
    Explicit,
    ObjectPointer,
    Endianity,
    Elemental,
    Pure,
    Recursive,
    Signature,
    MainSubprogram,
    DataBitOffset,
    ConstExpr,
    EnumClass,
    LinkageName,
    LoUser,
    HiUser,
    Other(u64),
}

impl AttrName {
    pub fn from_u64(n: u64) -> AttrName {
        match n {
            0x01 => AttrName::Sibling,
            0x02 => AttrName::Location,
            0x03 => AttrName::Name,
            0x09 => AttrName::Ordering,
            0x0b => AttrName::ByteSize,
            0x0c => AttrName::BitOffset,
            0x0d => AttrName::BitSize,
            0x10 => AttrName::StmtList,
            0x11 => AttrName::LowPc,
            0x12 => AttrName::HighPc,
            0x13 => AttrName::Language,
            0x15 => AttrName::Discr,
            0x16 => AttrName::DiscrValue,
            0x17 => AttrName::Visibility,
            0x18 => AttrName::Import,
            0x19 => AttrName::StringLength,
            0x1a => AttrName::CommonReference,
            0x1b => AttrName::CompDir,
            0x1c => AttrName::ConstValue,
            0x1d => AttrName::ContainingType,
            0x1e => AttrName::DefaultValue,
            0x20 => AttrName::Inline,
            0x21 => AttrName::IsOptional,
            0x22 => AttrName::LowerBound,
            0x25 => AttrName::Producer,
            0x27 => AttrName::Prototyped,
            0x2a => AttrName::ReturnAddr,
            0x2c => AttrName::StartScope,
            0x2e => AttrName::BitStride,
            0x2f => AttrName::UpperBound,
            0x31 => AttrName::AbstractOrigin,
            0x32 => AttrName::Accessibility,
            0x33 => AttrName::AddressClass,
            0x34 => AttrName::Artificial,
            0x35 => AttrName::BaseTypes,
            0x36 => AttrName::CallingConvention,
            0x37 => AttrName::Count,
            0x38 => AttrName::DataMemberLocation,
            0x39 => AttrName::DeclColumn,
            0x3a => AttrName::DeclFile,
            0x3b => AttrName::DeclLine,
            0x3c => AttrName::Declaration,
            0x3d => AttrName::DiscrList,
            0x3e => AttrName::Encoding,
            0x3f => AttrName::External,
            0x40 => AttrName::FrameBase,
            0x41 => AttrName::Friend,
            0x42 => AttrName::IdentifierCase,
            0x43 => AttrName::MacroInfo,
            0x44 => AttrName::NamelistItem,
            0x45 => AttrName::Priority,
            0x46 => AttrName::Segment,
            0x47 => AttrName::Specification,
            0x48 => AttrName::StaticLink,
            0x49 => AttrName::Type,
            0x4a => AttrName::UseLocation,
            0x4b => AttrName::VariableParameter,
            0x4c => AttrName::Virtuality,
            0x4d => AttrName::VtableElemLocation,
            0x4e => AttrName::Allocated,
            0x4f => AttrName::Associated,
            0x50 => AttrName::DataLocation,
            0x51 => AttrName::ByteStride,
            0x52 => AttrName::EntryPc,
            0x53 => AttrName::UseUTF8,
            0x54 => AttrName::Extension,
            0x55 => AttrName::Ranges,
            0x56 => AttrName::Trampoline,
            0x57 => AttrName::CallColumn,
            0x58 => AttrName::CallFile,
            0x59 => AttrName::CallLine,
            0x5a => AttrName::Description,
            0x5b => AttrName::BinaryScale,
            0x5c => AttrName::DecimalScale,
            0x5d => AttrName::Small,
            0x5e => AttrName::DecimalSign,
            0x5f => AttrName::DigitCount,
            0x60 => AttrName::PictureString,
            0x61 => AttrName::Mutable,
            0x62 => AttrName::ThreadsScaled,
            0x63 => AttrName::Explicit,
            0x64 => AttrName::ObjectPointer,
            0x65 => AttrName::Endianity,
            0x66 => AttrName::Elemental,
            0x67 => AttrName::Pure,
            0x68 => AttrName::Recursive,
            0x69 => AttrName::Signature,
            0x6a => AttrName::MainSubprogram,
            0x6b => AttrName::DataBitOffset,
            0x6c => AttrName::ConstExpr,
            0x6d => AttrName::EnumClass,
            0x6e => AttrName::LinkageName,
            0x2000 => AttrName::LoUser,
            0x3fff => AttrName::HiUser,
            n => AttrName::Other(n),
        }
    }
}

/// The on-the-wire encoding discipline of an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrForm {
    Address,
    Block2,
    Block4,
    Data2,
    Data4,
    Data8,
    String,
    Block,
    Block1,
    Data1,
    Flag,
    SData,
    Strp,
    UData,
    RefAddr,
    Ref1,
    Ref2,
    Ref4,
    Ref8,
    RefUData,
    Indirect,
    SecOffset,
    ExprLoc,
    FlagPresent,
    RefSig8,
    Unrecognized(u64),
}

impl AttrForm {
    pub fn from_u64(n: u64) -> AttrForm {
        match n {
            0x01 => AttrForm::Address,
            0x03 => AttrForm::Block2,
            0x04 => AttrForm::Block4,
            0x05 => AttrForm::Data2,
            0x06 => AttrForm::Data4,
            0x07 => AttrForm::Data8,
            0x08 => AttrForm::String,
            0x09 => AttrForm::Block,
            0x0a => AttrForm::Block1,
            0x0b => AttrForm::Data1,
            0x0c => AttrForm::Flag,
            0x0d => AttrForm::SData,
            0x0e => AttrForm::Strp,
            0x0f => AttrForm::UData,
            0x10 => AttrForm::RefAddr,
            0x11 => AttrForm::Ref1,
            0x12 => AttrForm::Ref2,
            0x13 => AttrForm::Ref4,
            0x14 => AttrForm::Ref8,
            0x15 => AttrForm::RefUData,
            0x16 => AttrForm::Indirect,
            0x17 => AttrForm::SecOffset,
            0x18 => AttrForm::ExprLoc,
            0x19 => AttrForm::FlagPresent,
            0x20 => AttrForm::RefSig8,
            n => AttrForm::Unrecognized(n),
        }
    }
}

/// The class an attribute's value belongs to, derived from its form.
/// Several forms map to one class (e.g. both `Strp` and `String` are
/// `AttrClass::String`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrClass {
    Address,
    Block,
    Constant,
    ExprLoc,
    Flag,
    LinePtr,
    LocListPtr,
    MacPtr,
    RangeListPtr,
    Reference,
    String,
    Unknown,
}

impl AttrForm {
    pub fn class(self) -> AttrClass {
        match self {
            AttrForm::Address => AttrClass::Address,
            AttrForm::Block | AttrForm::Block1 | AttrForm::Block2 | AttrForm::Block4 => AttrClass::Block,
            AttrForm::Data1 | AttrForm::Data2 | AttrForm::Data4 | AttrForm::Data8
                | AttrForm::SData | AttrForm::UData => AttrClass::Constant,
            AttrForm::ExprLoc => AttrClass::ExprLoc,
            AttrForm::Flag | AttrForm::FlagPresent => AttrClass::Flag,
            AttrForm::SecOffset => AttrClass::LinePtr,
            AttrForm::Ref1 | AttrForm::Ref2 | AttrForm::Ref4 | AttrForm::Ref8
                | AttrForm::RefUData | AttrForm::RefAddr | AttrForm::RefSig8 => AttrClass::Reference,
            AttrForm::String | AttrForm::Strp => AttrClass::String,
            AttrForm::Indirect | AttrForm::Unrecognized(_) => AttrClass::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_compile_unit() {
        assert_eq!(DieTag::from_u64(0x11), DieTag::CompileUnit);
    }

    #[test]
    fn unknown_tag_is_preserved() {
        assert_eq!(DieTag::from_u64(0x9999), DieTag::Other(0x9999));
    }

    #[test]
    fn form_class_derivation() {
        assert_eq!(AttrForm::Strp.class(), AttrClass::String);
        assert_eq!(AttrForm::String.class(), AttrClass::String);
        assert_eq!(AttrForm::FlagPresent.class(), AttrClass::Flag);
        assert_eq!(AttrForm::ExprLoc.class(), AttrClass::ExprLoc);
    }
}
