//! vmbuild - bootable disk image builder for IncludeOS services.
//!
//! Fuses a one-sector bootloader with an ELF service binary into a raw
//! disk image: bootloader at sector 0, service from sector 1, with the
//! service's size and entry point patched into the boot record.
#![allow(dead_code, unused_imports)]

mod build;
mod config;
mod elf;
mod error;
mod image;
mod multiboot;
mod validate;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use config::Config;

#[derive(Parser)]
#[command(name = "vmbuild")]
#[command(about = "Create a bootable disk image for an IncludeOS service")]
#[command(
    after_help = "The bootloader defaults to $INCLUDEOS_INSTALL/bootloader, or\n$HOME/IncludeOS_install/bootloader when INCLUDEOS_INSTALL is unset.\nThe image is written to the working directory as <service>.img.\nThe historical spelling -test is accepted for --test."
)]
struct Cli {
    /// ELF service binary to make bootable
    service: PathBuf,

    /// Bootloader image, exactly one 512-byte sector
    bootloader: Option<PathBuf>,

    /// Overwrite the service area with a counting byte pattern (implies -v)
    #[arg(long)]
    test: bool,

    /// Print build diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Callers have always spelled the overlay flag with a single dash;
    // rewrite it to the long form clap knows before parsing.
    let args = std::env::args_os()
        .map(|arg| if arg == "-test" { "--test".into() } else { arg });
    let cli = Cli::parse_from(args);

    // Load .env if present
    dotenvy::dotenv().ok();

    let config = match Config::resolve(cli.service, cli.bootloader, cli.test, cli.verbose) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("vmbuild: {err:#}");
            process::exit(1);
        }
    };

    match build::build_image(&config) {
        Ok(report) => {
            config.info(format!(
                "Wrote {} bytes => {} sectors to '{}'",
                report.bytes_written,
                report.image_sectors,
                config.image.display()
            ));
        }
        Err(err) => {
            eprintln!("vmbuild: {err:#}");
            process::exit(error::exit_code(&err));
        }
    }
}
