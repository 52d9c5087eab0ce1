//! Configuration error type.

use std::path::PathBuf;

use thiserror::Error;

/// Why a trust configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file exceeds the size cap.
    #[error("config file {} is {size} bytes, limit is {limit}", .path.display())]
    TooLarge {
        /// Offending file.
        path: PathBuf,
        /// Actual size in bytes.
        size: u64,
        /// Allowed size in bytes.
        limit: u64,
    },

    /// The TOML text is malformed or does not match the schema.
    #[error("cannot parse config from {origin}: {source}")]
    Parse {
        /// File path or other name of the text's source.
        origin: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A field holds a value the trust layer cannot use.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted path of the field, e.g. `schemes.key_exchange`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// An override variable is present but empty.
    #[error("environment variable {var} is set but empty")]
    EmptyEnvVar {
        /// Variable name.
        var: &'static str,
    },

    /// No per-user data directory exists on this platform.
    #[error("no per-user data directory available")]
    NoDataDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
