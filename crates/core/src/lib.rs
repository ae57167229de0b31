//! Core utilities for apkforge build tooling
//!
//! This crate provides shared functionality used by the recovery tooling:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Directory trees**: recursive copy, delete and disk usage
//! - **Process execution**: command runner abstraction with timeouts
//! - **Configuration**: TOML-based configuration with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use apkforge_core::fs_tree;
//! use std::path::Path;
//!
//! let copied = fs_tree::copy_tree(Path::new("client/build"), Path::new("/tmp/build-copy"))
//!     .expect("copy failed");
//! println!("copied {copied} files");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fs_tree;
pub mod process;

pub use error::{Error, ErrorCode, Result, ResultExt};
