//! Incremental decoder for ELF object files and DWARF 2-4 debug
//! information.
//!
//! [`elf`] decodes the object file container: header, section headers,
//! symbol table entries, program headers. [`dwarf`] decodes the debug
//! information carried in an object's `.debug_*` sections: the
//! abbreviation dictionary, the DIE tree, line-number-program headers and
//! location expressions. [`leb`] and [`error`] are shared plumbing used
//! throughout both.
//!
//! Every decoder here borrows from the caller's buffer rather than
//! copying it; pair this crate with `memmap2` to decode an object without
//! reading it into a heap buffer first (see `src/bin/dwarfdump.rs` for the
//! pattern this crate's own demonstrator binary uses).

pub mod dwarf;
pub mod elf;
pub mod error;
pub mod leb;
