//! Shared test utilities for vmbuild tests.
//!
//! The ELF fixtures here are assembled byte by byte so tests control every
//! header field without needing a cross toolchain at test time.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use vmbuild::multiboot::{MULTIBOOT_HEADER_MAGIC, MULTIBOOT_HEADER_SIZE};

/// Test environment rooted in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Directory all fixture files are written into
    pub dir: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with a temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    /// Write a fixture file and return its path.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, bytes).expect("Failed to write fixture file");
        path
    }
}

/// A plausible boot sector: 512 bytes of x86 NOPs with the patchable
/// fields at offsets 4..12 zeroed.
pub fn boot_sector_bytes() -> Vec<u8> {
    let mut sector = vec![0x90u8; 512];
    sector[4..12].fill(0);
    sector
}

/// Encode a 32-byte multiboot header. The address fields are filled with
/// recognizable values so tests can check they pass through untouched.
pub fn multiboot_bytes(magic: u32, flags: u32, checksum: u32, entry_addr: u32) -> Vec<u8> {
    let fields = [
        magic,
        flags,
        checksum,
        0x0010_0000, // header_addr
        0x0010_0000, // load_addr
        0x0018_0000, // load_end_addr
        0x0019_0000, // bss_end_addr
        entry_addr,
    ];
    let mut bytes = Vec::with_capacity(MULTIBOOT_HEADER_SIZE);
    for field in fields {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes
}

/// Checksum making `magic + flags + checksum` wrap to zero.
pub fn valid_checksum(flags: u32) -> u32 {
    0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC.wrapping_add(flags))
}

/// A bootable 32-bit service: valid multiboot header, given entry point.
pub fn elf32_service(entry: u32, total_size: usize) -> Vec<u8> {
    elf32_with_multiboot(entry, MULTIBOOT_HEADER_MAGIC, 0, valid_checksum(0), total_size)
}

/// A 32-bit service whose multiboot header has the given fields.
pub fn elf32_with_multiboot(
    entry: u32,
    magic: u32,
    flags: u32,
    checksum: u32,
    total_size: usize,
) -> Vec<u8> {
    let section = multiboot_bytes(magic, flags, checksum, entry);
    assemble_elf32(entry, &section, MULTIBOOT_NAME_INDEX, total_size)
}

/// A 32-bit ELF with no `.multiboot` section: the header section exists
/// but carries an empty name.
pub fn elf32_without_multiboot(entry: u32, total_size: usize) -> Vec<u8> {
    let section = multiboot_bytes(MULTIBOOT_HEADER_MAGIC, 0, valid_checksum(0), entry);
    assemble_elf32(entry, &section, 0, total_size)
}

/// A 32-bit ELF whose `.multiboot` section is shorter than a full header.
pub fn elf32_truncated_multiboot(entry: u32, section_len: usize, total_size: usize) -> Vec<u8> {
    let section = multiboot_bytes(MULTIBOOT_HEADER_MAGIC, 0, valid_checksum(0), entry);
    assemble_elf32(entry, &section[..section_len], MULTIBOOT_NAME_INDEX, total_size)
}

/// A 32-bit ELF whose `.multiboot` section header points past end of file.
pub fn elf32_multiboot_out_of_range(entry: u32, total_size: usize) -> Vec<u8> {
    let mut bytes = elf32_service(entry, total_size);
    // sh_offset of the content section, pushed past the last byte.
    put32(&mut bytes, SHOFF + SHENTSIZE + 16, total_size as u32);
    bytes
}

/// A 32-bit ELF whose section-header table offset lies far past the end of
/// the file: magic and class bytes read fine, the structure does not parse.
pub fn elf32_broken_section_table(entry: u32, total_size: usize) -> Vec<u8> {
    let mut bytes = elf32_service(entry, total_size);
    put32(&mut bytes, 32, 0xffff_0000); // e_shoff
    put16(&mut bytes, 48, 200); // e_shnum
    bytes
}

/// A minimal 64-bit service: bare ELF header, entry point, nothing else.
pub fn elf64_service(entry: u64, total_size: usize) -> Vec<u8> {
    assert!(total_size >= 64, "ELF64 header alone needs 64 bytes");
    let mut bytes = vec![0u8; total_size];
    bytes[..4].copy_from_slice(b"\x7fELF");
    bytes[4] = 2; // ELFCLASS64
    bytes[5] = 1; // little-endian
    bytes[6] = 1; // EV_CURRENT
    put16(&mut bytes, 16, 2); // e_type: ET_EXEC
    put16(&mut bytes, 18, 0x3e); // e_machine: EM_X86_64
    put32(&mut bytes, 20, 1); // e_version
    bytes[24..32].copy_from_slice(&entry.to_le_bytes());
    bytes
}

// Fixture layout constants. The ELF32 image is: 52-byte header, 32-byte
// header section at 52, string table at 84, section headers at 108.
const EHDR_SIZE: usize = 52;
const SECTION_OFFSET: usize = 52;
const SHSTRTAB_OFFSET: usize = 84;
const SHSTRTAB: &[u8] = b"\0.multiboot\0.shstrtab\0";
const MULTIBOOT_NAME_INDEX: u32 = 1;
const SHSTRTAB_NAME_INDEX: u32 = 12;
const SHOFF: usize = 108;
const SHENTSIZE: usize = 40;

/// Assemble a 32-bit ELF with one content section plus a string table.
/// `sh_name` selects what the content section is called; anything other
/// than `MULTIBOOT_NAME_INDEX` makes it invisible to the header lookup.
fn assemble_elf32(entry: u32, section: &[u8], sh_name: u32, total_size: usize) -> Vec<u8> {
    let min_size = SHOFF + 3 * SHENTSIZE;
    assert!(
        total_size >= min_size,
        "ELF32 fixture needs at least {min_size} bytes"
    );
    assert!(section.len() <= SHSTRTAB_OFFSET - SECTION_OFFSET);

    let mut bytes = vec![0u8; total_size];
    bytes[..4].copy_from_slice(b"\x7fELF");
    bytes[4] = 1; // ELFCLASS32
    bytes[5] = 1; // little-endian
    bytes[6] = 1; // EV_CURRENT
    put16(&mut bytes, 16, 2); // e_type: ET_EXEC
    put16(&mut bytes, 18, 3); // e_machine: EM_386
    put32(&mut bytes, 20, 1); // e_version
    put32(&mut bytes, 24, entry); // e_entry
    put32(&mut bytes, 32, SHOFF as u32); // e_shoff
    put16(&mut bytes, 40, EHDR_SIZE as u16); // e_ehsize
    put16(&mut bytes, 46, SHENTSIZE as u16); // e_shentsize
    put16(&mut bytes, 48, 3); // e_shnum
    put16(&mut bytes, 50, 2); // e_shstrndx

    bytes[SECTION_OFFSET..SECTION_OFFSET + section.len()].copy_from_slice(section);
    bytes[SHSTRTAB_OFFSET..SHSTRTAB_OFFSET + SHSTRTAB.len()].copy_from_slice(SHSTRTAB);

    // Section header 0 stays all-null. Header 1 is the content section,
    // header 2 the string table.
    write_shdr(
        &mut bytes,
        SHOFF + SHENTSIZE,
        Shdr {
            name: sh_name,
            kind: 1, // SHT_PROGBITS
            flags: 2,
            addr: 0x0010_0000,
            offset: SECTION_OFFSET as u32,
            size: section.len() as u32,
        },
    );
    write_shdr(
        &mut bytes,
        SHOFF + 2 * SHENTSIZE,
        Shdr {
            name: SHSTRTAB_NAME_INDEX,
            kind: 3, // SHT_STRTAB
            flags: 0,
            addr: 0,
            offset: SHSTRTAB_OFFSET as u32,
            size: SHSTRTAB.len() as u32,
        },
    );
    bytes
}

struct Shdr {
    name: u32,
    kind: u32,
    flags: u32,
    addr: u32,
    offset: u32,
    size: u32,
}

fn write_shdr(bytes: &mut [u8], at: usize, shdr: Shdr) {
    put32(bytes, at, shdr.name);
    put32(bytes, at + 4, shdr.kind);
    put32(bytes, at + 8, shdr.flags);
    put32(bytes, at + 12, shdr.addr);
    put32(bytes, at + 16, shdr.offset);
    put32(bytes, at + 20, shdr.size);
    // sh_link, sh_info, sh_addralign, sh_entsize stay zero.
}

fn put16(bytes: &mut [u8], at: usize, value: u16) {
    bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
