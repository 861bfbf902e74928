//! Boot-protocol header decoding and verification.
//!
//! A 32-bit service binary carries a multiboot header inside its
//! `.multiboot` section; the boot loader reads it to find load addresses
//! and the entry point, so a wrong field means an unbootable image. The
//! header is decoded field by field at fixed little-endian offsets, with
//! the length checked before anything is interpreted.

use crate::error::BuildError;

/// Multiboot header magic, the first field of the header.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Encoded header length: eight little-endian u32 fields.
pub const MULTIBOOT_HEADER_SIZE: usize = 32;

/// Boot-protocol header from the `.multiboot` section of a 32-bit service
/// binary. All fields are u32 little-endian on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultibootHeader {
    pub magic: u32,
    pub flags: u32,
    pub checksum: u32,
    pub header_addr: u32,
    pub load_addr: u32,
    pub load_end_addr: u32,
    pub bss_end_addr: u32,
    pub entry_addr: u32,
}

impl MultibootHeader {
    /// Decode a header from the start of `bytes`.
    ///
    /// Fails when the slice cannot hold all eight fields; no field is read
    /// before the length check.
    pub fn parse(bytes: &[u8]) -> Result<Self, BuildError> {
        if bytes.len() < MULTIBOOT_HEADER_SIZE {
            return Err(BuildError::MultibootTruncated { len: bytes.len() });
        }
        Ok(Self {
            magic: read_u32(bytes, 0),
            flags: read_u32(bytes, 4),
            checksum: read_u32(bytes, 8),
            header_addr: read_u32(bytes, 12),
            load_addr: read_u32(bytes, 16),
            load_end_addr: read_u32(bytes, 20),
            bss_end_addr: read_u32(bytes, 24),
            entry_addr: read_u32(bytes, 28),
        })
    }

    /// Verify the boot-protocol invariants: the magic constant, then
    /// `magic + flags + checksum == 0` under wrapping u32 addition.
    pub fn verify(&self) -> Result<(), BuildError> {
        if self.magic != MULTIBOOT_HEADER_MAGIC {
            return Err(BuildError::MultibootBadMagic {
                found: self.magic,
                expected: MULTIBOOT_HEADER_MAGIC,
            });
        }
        let sum = self.checksum_sum();
        if sum != 0 {
            return Err(BuildError::MultibootBadChecksum { sum });
        }
        Ok(())
    }

    /// `magic + flags + checksum`, wrapping. Zero for a valid header.
    pub fn checksum_sum(&self) -> u32 {
        self.magic
            .wrapping_add(self.flags)
            .wrapping_add(self.checksum)
    }
}

/// Read one little-endian u32 at `offset`. The caller has length-checked.
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
