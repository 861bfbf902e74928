//! Build failure taxonomy and process exit codes.
//!
//! Every fatal condition maps to a fixed exit code so scripts driving the
//! tool can tell failures apart: 666 for a boot loader that is not exactly
//! one sector, the underlying OS error number for I/O failures, 1 for a
//! structurally invalid service binary. None of these leaves a partial
//! image behind; the output file is only created after all validation has
//! passed.

use thiserror::Error;

/// Exit code when the boot loader is not exactly one sector long.
pub const SECTOR_SIZE_EXIT_CODE: i32 = 666;

/// Fatal validation failures. Each variant carries enough context for a
/// one-line stderr report; none is recoverable.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Boot loader file is not exactly one sector.
    #[error("boot sector not exactly one sector in size ({actual} bytes, expected 512)")]
    SectorSizeMismatch { actual: u64 },

    /// Service binary does not start with the ELF magic.
    #[error("not an ELF binary")]
    NotElf,

    /// ELF magic is present but the class byte is neither 32- nor 64-bit.
    #[error("unknown ELF format (class {class:#04x})")]
    UnknownElfClass { class: u8 },

    /// Magic and class looked fine but the ELF structure does not parse.
    #[error("malformed ELF binary")]
    MalformedElf(#[source] goblin::error::Error),

    /// 32-bit service binary has no `.multiboot` section to boot from.
    #[error("no .multiboot section in 32-bit service binary")]
    MultibootMissing,

    /// `.multiboot` section cannot hold a full boot-protocol header.
    #[error(".multiboot section too small for a multiboot header ({len} bytes)")]
    MultibootTruncated { len: usize },

    /// Multiboot magic field does not match the protocol constant.
    #[error("multiboot magic mismatch: {found:#010x} vs {expected:#010x}")]
    MultibootBadMagic { found: u32, expected: u32 },

    /// `magic + flags + checksum` must wrap to zero.
    #[error("multiboot checksum invalid: magic + flags + checksum = {sum:#010x}, expected 0")]
    MultibootBadChecksum { sum: u32 },
}

impl BuildError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::SectorSizeMismatch { .. } => SECTOR_SIZE_EXIT_CODE,
            _ => 1,
        }
    }
}

/// Map a pipeline error to its process exit code.
///
/// Typed build failures carry their own codes; bare I/O failures surface
/// the OS error number, matching what a plain stat-and-exit would report.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(build) = err.downcast_ref::<BuildError>() {
        return build.exit_code();
    }
    if let Some(io) = err.downcast_ref::<std::io::Error>() {
        return io.raw_os_error().unwrap_or(1);
    }
    1
}
