//! Decodes DWARF 2-4 debug information: the abbreviation dictionary, the
//! DIE tree, line-number-program headers and location expressions.
//!
//! Layered bottom-up: [`tags`] and [`section`] have no dependencies within
//! this module; [`abbrev`] and [`attr`] build on them; [`die`] builds on
//! both; [`line`] and [`expr`] are independent decoders over their own
//! sections/bytecode; [`context`] wires everything into one entry point
//! over an object's debug sections.

pub mod abbrev;
pub mod attr;
pub mod context;
pub mod die;
pub mod expr;
pub mod line;
pub mod section;
pub mod tags;

pub use abbrev::{Abbreviation, AbbreviationTable, AttributeSpecification};
pub use attr::{decode_attribute_value, AttrValue, Attribute};
pub use context::{CompilationUnit, CompilationUnitHeader, ContextOptions, DwarfContext, DwarfWidth};
pub use die::{build_die_index, die_from_id, Die, DieIndexEntry, DieParseParams};
pub use expr::{evaluate, ExpressionContext};
pub use line::{parse_line_program_header, FileEntry, LineProgramHeader};
pub use section::{Bytes, Section, SectionKind};
pub use tags::{AttrClass, AttrForm, AttrName, DieTag};
