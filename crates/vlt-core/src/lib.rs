//! vlt core - Shared functionality for the vlt secrets manager
//!
//! Standard locations, the YAML configuration file and the helpers used to
//! run user-configured hook commands.

pub mod config;
pub mod paths;
pub mod process;

pub use config::Config;
pub use paths::Paths;
