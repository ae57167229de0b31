//! Configuration loading and schema definitions
//!
//! All components receive their settings through [`RecoveryConfig`]; nothing
//! reads the process environment directly.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
