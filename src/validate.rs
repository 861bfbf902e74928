//! Input validation run before any image bytes are assembled.
//!
//! Both inputs are stat-checked up front so a bad invocation fails before
//! the output file is created: a boot sector of the wrong size is the
//! classic "pointed at the wrong file" mistake and gets its own exit code,
//! and a missing service binary surfaces the OS error directly.

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::BuildError;
use crate::image::SECTOR_SIZE;

/// Check the bootloader file exists and is exactly one sector long.
/// Returns its size in bytes.
pub fn validate_boot_sector(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("could not open bootloader '{}'", path.display()))?;
    let size = metadata.len();
    if size != SECTOR_SIZE {
        return Err(BuildError::SectorSizeMismatch { actual: size }.into());
    }
    Ok(size)
}

/// Check the service binary exists. Returns its size in bytes.
pub fn validate_service_binary(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("could not open service binary '{}'", path.display()))?;
    Ok(metadata.len())
}

/// Sectors needed to hold `size` bytes: `size / 512`, rounded up.
pub fn sector_count(size: u64) -> u64 {
    let mut sectors = size / SECTOR_SIZE;
    if size % SECTOR_SIZE != 0 {
        sectors += 1;
    }
    sectors
}
