//! Terminal output helpers for apkforge tools
//!
//! - Status lines and headers
//! - Size, duration and count formatting
//! - Spinners for long-running child processes

#![warn(missing_docs)]

pub mod output;
pub mod progress;
