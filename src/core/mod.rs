pub mod error;
pub mod types;

pub use error::{ConfigError, Result, SyntaxError};
pub use types::{current_system, ensure_valid_platform, PatchMode, SUPPORTED_PLATFORMS};
