//! Shared plumbing for hashi-helper crates.
//!
//! This crate provides centralized implementations for:
//! - Platform error type for collaborator and I/O failures
//! - The encrypted-file collaborator (`FileCipher`) and its keybase implementation
//! - HTTP client configuration and building
//! - Tracing subscriber initialisation on the diagnostic stream

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod error;
pub mod http;
pub mod tracing_config;

pub use cipher::{FileCipher, KeybaseCipher};
pub use error::{PlatformError, PlatformResult};
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{LogFormat, TracingConfig, init_tracing};
