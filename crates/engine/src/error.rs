//! Error types for the binding engine.
//!
//! None of these are fatal to the runtime. Registration conflicts and hook
//! failures are logged and the engine keeps converging; proxy errors surface
//! inside controller hooks, where `?` hands them to the invocation boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while registering controller definitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Descriptor \"{descriptor}\" is already registered to {existing}")]
    AlreadyRegistered { descriptor: String, existing: String },

    #[error("Controller name \"{name}\" does not produce a descriptor")]
    EmptyDescriptor { name: String },
}

/// Errors raised while reading or writing attribute-backed data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Attribute {attribute} does not hold valid JSON: {source}")]
    Decode {
        attribute: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value for {attribute} could not be encoded: {source}")]
    Encode {
        attribute: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by element capability proxies.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Property \"{key}\" is read-only")]
    ReadOnly { key: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

impl ProxyError {
    pub fn read_only(key: impl Into<String>) -> Self {
        Self::ReadOnly { key: key.into() }
    }
}

/// Errors raised while loading or validating [`RuntimeConfig`](crate::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid attribute name for {field}: {value:?}")]
    InvalidAttribute { field: &'static str, value: String },

    #[error("Controllers and actions attributes must differ, both are {name:?}")]
    DuplicateAttribute { name: String },

    #[error("max_flush_rounds must be at least 1")]
    InvalidFlushLimit,
}
