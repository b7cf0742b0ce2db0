//! Shared test utilities for hashi-helper crates.
//!
//! This crate provides:
//! - Proptest generators for tokens, timestamps and profile names
//! - Mock implementations of the Vault client and the file cipher
//! - Test fixtures with sample profile files

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
