//! In-memory disk image assembly, boot-record patching, and output.
//!
//! The image layout is fixed: sector 0 is the bootloader, the service
//! binary starts at sector 1, and the final partial sector is zero-padded.
//! The whole image is assembled and patched in memory, then written in a
//! single call, so a failed build never leaves a partial file behind.

use std::path::Path;

use anyhow::{Context, Result};

/// Disk sector size in bytes. Image sizes are always a multiple of this.
pub const SECTOR_SIZE: u64 = 512;

/// Boot-record offset of the service sector count (u32 LE).
pub const BOOTVAR_BINARY_SECTORS: usize = 4;

/// Boot-record offset of the service entry point (u32 LE).
pub const BOOTVAR_ENTRY_POINT: usize = 8;

/// A complete bootable disk image, held in memory until written.
pub struct DiskImage {
    data: Vec<u8>,
}

impl DiskImage {
    /// Lay out bootloader and service into a zero-padded image of
    /// `1 + binary_sectors` sectors.
    pub fn assemble(boot_sector: &[u8], binary: &[u8], binary_sectors: u64) -> Self {
        debug_assert_eq!(boot_sector.len() as u64, SECTOR_SIZE);
        debug_assert!(binary.len() as u64 <= binary_sectors * SECTOR_SIZE);
        let total = ((1 + binary_sectors) * SECTOR_SIZE) as usize;
        let mut data = vec![0u8; total];
        data[..boot_sector.len()].copy_from_slice(boot_sector);
        data[SECTOR_SIZE as usize..SECTOR_SIZE as usize + binary.len()].copy_from_slice(binary);
        DiskImage { data }
    }

    /// Patch the boot record with the values the bootloader reads at run
    /// time: how many sectors to pull off disk, and where to jump.
    pub fn patch_boot_record(&mut self, binary_sectors: u32, entry: u32) {
        self.data[BOOTVAR_BINARY_SECTORS..BOOTVAR_BINARY_SECTORS + 4]
            .copy_from_slice(&binary_sectors.to_le_bytes());
        self.data[BOOTVAR_ENTRY_POINT..BOOTVAR_ENTRY_POINT + 4]
            .copy_from_slice(&entry.to_le_bytes());
    }

    /// Overwrite every byte past the boot sector with `i % 256`, where `i`
    /// counts from the start of the service area. Used to verify disk reads
    /// end to end without involving a real service.
    pub fn apply_test_pattern(&mut self) {
        for (i, byte) in self.data[SECTOR_SIZE as usize..].iter_mut().enumerate() {
            *byte = (i % 256) as u8;
        }
    }

    /// Write the image to `path` in one call, replacing any existing file.
    /// Returns the number of bytes the single write accepted.
    pub fn write_to(&self, path: &Path) -> Result<u64> {
        use std::io::Write;
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("could not create image '{}'", path.display()))?;
        let written = file
            .write(&self.data)
            .with_context(|| format!("could not write image '{}'", path.display()))?;
        Ok(written as u64)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Image size in whole sectors.
    pub fn sectors(&self) -> u64 {
        self.len() / SECTOR_SIZE
    }
}
