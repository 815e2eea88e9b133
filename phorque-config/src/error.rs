//! Error type for config loading and CLI parsing (component F).
//!
//! Unlike the other components' errors, a [`ConfigError`] is always fatal at
//! startup — there is no prior tick's state to fall back on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("missing required key `{key}` in section `{section}`")]
    MissingKey { section: String, key: String },

    #[error("value for `{section}.{key}` is not valid: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no cloud sections found in config file (only [Phorque] and [Policy] present)")]
    NoCloudsConfigured,
}
