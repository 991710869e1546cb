//! Shared configuration loader module for ScreenMatch services
//!
//! Provides a unified configuration loading system with environment variable
//! parsing, validation, and support for .env files. All configuration uses
//! the `SCREENMATCH_` prefix for environment variables.
//!
//! # Example
//!
//! ```no_run
//! use screenmatch_core::config::{load_dotenv, ConfigLoader};
//!
//! # #[derive(Default)] struct MyConfig;
//! # impl ConfigLoader for MyConfig {
//! #     fn from_env() -> screenmatch_core::Result<Self> { Ok(MyConfig) }
//! #     fn validate(&self) -> screenmatch_core::Result<()> { Ok(()) }
//! # }
//! # fn example() -> screenmatch_core::Result<()> {
//! load_dotenv();
//! let config = MyConfig::from_env()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;

/// Configuration loader trait
///
/// Standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// Reads environment variables with the `SCREENMATCH_` prefix and
    /// constructs a configuration instance with defaults for missing
    /// optional values.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if required environment variables are
    /// missing or values cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if any validation check fails.
    fn validate(&self) -> Result<(), CoreError>;
}

/// Parse an environment variable with a default value
///
/// # Errors
///
/// Returns a `Configuration` error if the variable is set but cannot be
/// parsed into `T`.
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                CoreError::configuration(format!("Failed to parse {}: {}", key, e), Some(key))
            })
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// Does not return an error if the .env file is not found.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_var_with_default() {
        let result: u32 = parse_env_var("SCREENMATCH_TEST_NON_EXISTENT", 42).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_parse_env_var_with_value() {
        std::env::set_var("SCREENMATCH_TEST_PARSE_VAR", "100");
        let result: u32 = parse_env_var("SCREENMATCH_TEST_PARSE_VAR", 42).unwrap();
        assert_eq!(result, 100);
        std::env::remove_var("SCREENMATCH_TEST_PARSE_VAR");
    }

    #[test]
    fn test_parse_env_var_invalid_value() {
        std::env::set_var("SCREENMATCH_TEST_INVALID_VAR", "not-a-number");
        let result: Result<u32, _> = parse_env_var("SCREENMATCH_TEST_INVALID_VAR", 42);
        assert!(result.is_err());
        std::env::remove_var("SCREENMATCH_TEST_INVALID_VAR");
    }
}
