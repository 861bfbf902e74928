//! ELF classification and boot-header extraction for service binaries.
//!
//! A service is either a 32-bit ELF, which must carry a verifiable
//! multiboot header in its `.multiboot` section, or a 64-bit ELF, which is
//! accepted on its entry point alone; the 64-bit boot path does its own
//! handoff and the header requirement does not apply. Anything else is not
//! bootable and is rejected before any image bytes are produced.

use goblin::elf::header::{EI_CLASS, ELFCLASS32, ELFCLASS64, ELFMAG, SELFMAG};
use goblin::elf::Elf;

use crate::error::BuildError;
use crate::multiboot::MultibootHeader;

/// Section holding the multiboot header in 32-bit service binaries.
const MULTIBOOT_SECTION: &str = ".multiboot";

/// Word size of a service binary, from the ELF identification byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl std::fmt::Display for ElfClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElfClass::Elf32 => write!(f, "32-bit ELF"),
            ElfClass::Elf64 => write!(f, "64-bit ELF"),
        }
    }
}

/// Everything the image patcher needs from a service binary.
#[derive(Debug, Clone)]
pub struct BootInfo {
    pub class: ElfClass,
    /// Entry point from the ELF header. Patched into the boot record,
    /// truncated to u32 there.
    pub entry: u64,
    /// Verified multiboot header; present for 32-bit services only.
    pub multiboot: Option<MultibootHeader>,
}

/// Classify a service binary and pull out its boot information.
///
/// The magic and class bytes are checked before handing the binary to the
/// full parser, so non-ELF input fails with a format error rather than a
/// parse error.
pub fn inspect(binary: &[u8]) -> Result<BootInfo, BuildError> {
    if binary.len() < SELFMAG || binary[..SELFMAG] != ELFMAG[..] {
        return Err(BuildError::NotElf);
    }
    match binary.get(EI_CLASS).copied() {
        Some(ELFCLASS32) => inspect_elf32(binary),
        Some(ELFCLASS64) => inspect_elf64(binary),
        class => Err(BuildError::UnknownElfClass {
            class: class.unwrap_or(0),
        }),
    }
}

/// 32-bit path: the `.multiboot` section must exist, hold a complete
/// header, and verify.
fn inspect_elf32(binary: &[u8]) -> Result<BootInfo, BuildError> {
    let elf = Elf::parse(binary).map_err(BuildError::MalformedElf)?;
    let section = multiboot_section(&elf, binary).ok_or(BuildError::MultibootMissing)?;
    let header = MultibootHeader::parse(section)?;
    header.verify()?;
    Ok(BootInfo {
        class: ElfClass::Elf32,
        entry: elf.entry,
        multiboot: Some(header),
    })
}

/// 64-bit path: entry point only, no multiboot requirement.
fn inspect_elf64(binary: &[u8]) -> Result<BootInfo, BuildError> {
    let elf = Elf::parse(binary).map_err(BuildError::MalformedElf)?;
    Ok(BootInfo {
        class: ElfClass::Elf64,
        entry: elf.entry,
        multiboot: None,
    })
}

/// Find the `.multiboot` section and return its bytes.
///
/// A section whose file range falls outside the binary is skipped, which
/// surfaces as a missing header at the caller.
fn multiboot_section<'a>(elf: &Elf<'_>, binary: &'a [u8]) -> Option<&'a [u8]> {
    for section in &elf.section_headers {
        if elf.shdr_strtab.get_at(section.sh_name) != Some(MULTIBOOT_SECTION) {
            continue;
        }
        let offset = section.sh_offset as usize;
        let size = section.sh_size as usize;
        if let Some(bytes) = binary.get(offset..offset.saturating_add(size)) {
            return Some(bytes);
        }
    }
    None
}
