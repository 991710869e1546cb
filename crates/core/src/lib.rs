//! # ScreenMatch Core
//!
//! Shared building blocks for the ScreenMatch recommendation platform:
//! domain types for media items and their metadata, error types,
//! configuration loading, and logging setup.
//!
//! ## Modules
//!
//! - `types`: media identities and normalized metadata
//! - `error`: error types and handling
//! - `config`: configuration loading and validation
//! - `observability`: structured logging setup

pub mod config;
pub mod error;
pub mod observability;
pub mod types;

// Re-export commonly used types
pub use config::{load_dotenv, parse_env_var, ConfigLoader};
pub use error::CoreError;
pub use observability::init_logging;
pub use types::{Genre, Keyword, MediaIdentity, MediaMetadata, MediaType};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
