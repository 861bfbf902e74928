//! vmbuild library exports for testing.
//!
//! This module exposes internal components for integration testing.

pub mod build;
pub mod config;
pub mod elf;
pub mod error;
pub mod image;
pub mod multiboot;
pub mod validate;
