//! Error types for rendering backends and configuration loading

use thiserror::Error;

/// Errors that can occur while initializing or driving a renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// The GPU backend could not be brought up (no adapter, no device, feature disabled)
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// `frame`/`read_pixels` was called before `init`
    #[error("renderer used before init()")]
    NotInitialized,

    /// The device rejected a request or reported a lost/validation state
    #[error("device error: {0}")]
    Device(String),

    /// A host readback could not be completed
    #[error("readback failed: {0}")]
    Readback(String),
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while loading or validating a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON document could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is not one of yaml, yml or json
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range
    #[error("invalid config: {0}")]
    Invalid(String),
}
