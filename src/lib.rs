//! Lossless reading and editing of devbox.json files.
//!
//! A config is parsed into a syntax tree that keeps every comment and
//! whitespace run, and decoded into typed fields. Edits go through
//! [`ConfigFile`] and [`PackagesMutator`], which update both views, so
//! saving writes back the user's file with only the edited regions
//! re-laid-out.
//!
//! ```no_run
//! use devbox_config::ConfigFile;
//!
//! # fn main() -> devbox_config::Result<()> {
//! let mut cfg = ConfigFile::load("devbox.json")?;
//! cfg.packages_mut().add("ripgrep@latest")?;
//! cfg.save()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod jwcc;
pub mod ux;

pub use crate::config::{
    is_config_name, join_name_version, parse_versioned_name, validate_devbox_version, CmdFormat, Commands,
    ConfigFile, Package, PackagesMutator, Script, StringField, DEFAULT_NAME,
};
pub use crate::core::{ConfigError, PatchMode, Result, SyntaxError};
