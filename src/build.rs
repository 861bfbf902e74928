//! The build pipeline: validate inputs, inspect the service, assemble,
//! patch, and write the image.
//!
//! Stages run strictly in order and every failure aborts before the output
//! file exists, so there is never a half-built image on disk.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::elf::{self, ElfClass};
use crate::error::BuildError;
use crate::image::{DiskImage, SECTOR_SIZE};
use crate::multiboot::MultibootHeader;
use crate::validate;

/// What a successful build produced.
#[derive(Debug, Clone, Copy)]
pub struct BuildReport {
    /// Bytes the image write accepted.
    pub bytes_written: u64,
    /// Image size in sectors, bootloader included.
    pub image_sectors: u64,
}

/// Run one complete build for `config`.
pub fn build_image(config: &Config) -> Result<BuildReport> {
    config.info(format!("Using bootloader {}", config.bootloader.display()));
    config.info(format!(
        "Creating image '{}' from service '{}'",
        config.image.display(),
        config.service.display()
    ));

    let boot_size = validate::validate_boot_sector(&config.bootloader)?;
    config.info(format!("Size of bootloader: {boot_size} bytes"));
    let binary_size = validate::validate_service_binary(&config.service)?;
    config.info(format!("Size of service: {binary_size} bytes"));

    let boot_sector = std::fs::read(&config.bootloader).with_context(|| {
        format!("could not read bootloader '{}'", config.bootloader.display())
    })?;
    // The stat check above raced against the filesystem; the read is what
    // ends up in the image, so its length is what must hold.
    if boot_sector.len() as u64 != SECTOR_SIZE {
        return Err(BuildError::SectorSizeMismatch {
            actual: boot_sector.len() as u64,
        }
        .into());
    }
    config.info(format!("Read {} bytes from boot image", boot_sector.len()));

    let binary = std::fs::read(&config.service).with_context(|| {
        format!("could not read service binary '{}'", config.service.display())
    })?;
    config.info(format!("Read {} bytes from service image", binary.len()));

    let binary_sectors = validate::sector_count(binary.len() as u64);
    let image_sectors = 1 + binary_sectors;
    config.info(format!(
        "Total disk size: {} bytes, => {} sectors",
        image_sectors * SECTOR_SIZE,
        image_sectors
    ));

    let boot_info = elf::inspect(&binary)?;
    match boot_info.class {
        ElfClass::Elf32 => {
            config.info(format!("Found {} service", boot_info.class));
            if let Some(header) = &boot_info.multiboot {
                dump_multiboot(config, header);
            }
        }
        ElfClass::Elf64 => {
            config.info(format!(
                "Found {} with entry point {:#x}",
                boot_info.class, boot_info.entry
            ));
        }
    }

    let mut image = DiskImage::assemble(&boot_sector, &binary, binary_sectors);
    image.patch_boot_record(binary_sectors as u32, boot_info.entry as u32);

    if config.test_overlay {
        config.info("TEST overwriting service area with test data");
        image.apply_test_pattern();
    }

    let bytes_written = image.write_to(&config.image)?;
    if bytes_written != image.len() {
        eprintln!(
            "vmbuild: short write: {} of {} bytes written to '{}'",
            bytes_written,
            image.len(),
            config.image.display()
        );
    }

    Ok(BuildReport {
        bytes_written,
        image_sectors,
    })
}

/// Echo the verified multiboot header for inspection.
fn dump_multiboot(config: &Config, header: &MultibootHeader) {
    config.info("Verifying multiboot header:");
    config.info(format!("Magic value: {:#x}", header.magic));
    config.info(format!("Flags: {:#x}", header.flags));
    config.info(format!("Checksum: {:#x}", header.checksum));
    config.info(format!("Checksum computed: {:#x}", header.checksum_sum()));
    config.info(format!("Header addr: {:#x}", header.header_addr));
    config.info(format!("Load start: {:#x}", header.load_addr));
    config.info(format!("Load end: {:#x}", header.load_end_addr));
    config.info(format!("BSS end: {:#x}", header.bss_end_addr));
    config.info(format!("Entry: {:#x}", header.entry_addr));
}
