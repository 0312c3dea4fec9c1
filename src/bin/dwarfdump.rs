//! Thin file-reading demonstrator: maps an object file, decodes its ELF
//! header and sections, and walks whatever DWARF debug information it
//! carries. Grounded on `original_source/example.cpp`'s `main` and the
//! teacher's own `main.rs` (mmap the file, print the section table).
//! Cross-reference building, demangling, CRC32 and pretty-printing stay
//! external to this crate -- see spec.md's non-goals.

use std::fs::File;

use dwarfview::dwarf::{self, ContextOptions, SectionKind};
use dwarfview::elf;

fn main() {
    env_logger::init();

    let path = {
        let mut args: Vec<String> = std::env::args().collect();
        if args.len() != 2 {
            usage(&args);
            std::process::exit(1);
        }
        args.swap_remove(1)
    };

    log::info!("loading from file: {}", path);

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("couldn't open {}: {}", path, err);
            std::process::exit(1);
        }
    };

    let mmap = match unsafe { memmap2::Mmap::map(&file) } {
        Ok(m) => m,
        Err(err) => {
            eprintln!("couldn't map {}: {}", path, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = dump(&mmap) {
        eprintln!("failed to decode {}: {}", path, err);
        std::process::exit(1);
    }
}

fn usage(args: &[String]) {
    println!("usage: {} FILENAME", args[0]);
}

fn dump(bytes: &[u8]) -> dwarfview::error::Result<()> {
    let header = elf::decode_header(bytes)?;
    println!("elf class: {:?}", header.class);
    println!("section count: {}", header.e_shnum);

    let headers: Vec<_> = elf::iter_section_headers(bytes, &header).collect::<dwarfview::error::Result<_>>()?;
    let shstrtab = &headers[header.e_shstrndx as usize];

    println!("sections:");
    let mut sections = Vec::new();
    for section in &headers {
        let name = elf::section_name(bytes, shstrtab, section)?;
        println!(
            "  {:<16} type {:?} @ {:#010x} ({:#06x} bytes)",
            name, section.sh_type, section.sh_addr, section.sh_size
        );

        if section.sh_type == elf::SectionType::SymTab {
            let strtab = &headers[section.sh_link as usize];
            for symbol in elf::iter_symbols(bytes, section, header.class) {
                let symbol = symbol?;
                let sym_name = elf::section_name(bytes, strtab, &elf::SectionHeader { sh_name: symbol.st_name, ..strtab.clone() })
                    .unwrap_or("<unnamed>");
                println!(
                    "    {:<24} @ {:#010x} ({:#06x} bytes) section {}",
                    sym_name, symbol.st_value, symbol.st_size, symbol.st_shndx
                );
            }
        }

        let kind = SectionKind::from_name(name);
        if kind != SectionKind::Invalid {
            let section_bytes = &bytes[section.sh_offset as usize..(section.sh_offset + section.sh_size) as usize];
            sections.push(dwarf::Section::new(kind, dwarf::Bytes::borrow(section_bytes)));
        }
    }

    match dwarf::DwarfContext::from_sections(&sections, ContextOptions::default()) {
        Ok(mut ctx) => {
            ctx.build_indexes()?;
            println!("compilation units: {}", ctx.units().len());
            for (i, unit) in ctx.units().iter().enumerate() {
                let root_name = unit.root().and_then(|r| r.name).unwrap_or("<unnamed>");
                println!("  unit {}: {} DIEs, root \"{}\"", i, unit.dies().len(), root_name);
            }
        }
        Err(_) => log::debug!("no debug information present"),
    }

    Ok(())
}
