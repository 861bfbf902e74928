//! Build configuration resolved from arguments and environment.
//!
//! Resolution order for the bootloader: an explicit path argument wins,
//! then `$INCLUDEOS_INSTALL/bootloader`, then
//! `$HOME/IncludeOS_install/bootloader`. The output image lands in the
//! working directory as the service file name with `.img` appended.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// Environment variable overriding the install prefix.
pub const INSTALL_ENV: &str = "INCLUDEOS_INSTALL";

/// Environment variable that turns on diagnostics when set non-empty.
pub const VERBOSE_ENV: &str = "VERBOSE";

/// Install directory under `$HOME` when `INCLUDEOS_INSTALL` is unset.
const DEFAULT_INSTALL_DIR: &str = "IncludeOS_install";

/// Bootloader file name inside the install prefix.
const BOOTLOADER_NAME: &str = "bootloader";

/// Everything one build needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service binary to bake into the image.
    pub service: PathBuf,
    /// Boot sector to place at sector 0.
    pub bootloader: PathBuf,
    /// Output image path.
    pub image: PathBuf,
    /// Replace the service area with the counting byte pattern.
    pub test_overlay: bool,
    /// Diagnostics on stderr.
    pub verbose: bool,
}

impl Config {
    /// Resolve a configuration from parsed arguments plus the environment.
    pub fn resolve(
        service: PathBuf,
        bootloader: Option<PathBuf>,
        test_overlay: bool,
        verbose: bool,
    ) -> Result<Self> {
        let bootloader = match bootloader {
            Some(path) => path,
            None => default_bootloader_path()?,
        };
        let image = image_name(&service);
        Ok(Config {
            service,
            bootloader,
            image,
            test_overlay,
            // Test mode always runs with diagnostics on.
            verbose: verbose || test_overlay || env_verbose(),
        })
    }

    /// Print a diagnostic line when verbose mode is on.
    pub fn info(&self, message: impl fmt::Display) {
        if self.verbose {
            eprintln!("[ vmbuild ] {message}");
        }
    }
}

/// Bootloader location when no path argument is given.
fn default_bootloader_path() -> Result<PathBuf> {
    if let Some(prefix) = std::env::var_os(INSTALL_ENV) {
        return Ok(PathBuf::from(prefix).join(BOOTLOADER_NAME));
    }
    match dirs::home_dir() {
        Some(home) => Ok(home.join(DEFAULT_INSTALL_DIR).join(BOOTLOADER_NAME)),
        None => bail!("no home directory; set {INSTALL_ENV} or pass a bootloader path"),
    }
}

/// Output name: the service file name with `.img` appended, in the
/// working directory.
fn image_name(service: &Path) -> PathBuf {
    let mut name = service
        .file_name()
        .unwrap_or_else(|| service.as_os_str())
        .to_os_string();
    name.push(".img");
    PathBuf::from(name)
}

/// `VERBOSE` counts as set only when non-empty.
fn env_verbose() -> bool {
    std::env::var_os(VERBOSE_ENV).is_some_and(|value| !value.is_empty())
}
