use std::io;
use thiserror::Error;

/// Custom error type for nvchart
#[derive(Error, Debug)]
pub enum NvChartError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library initialization failed: {0}")]
    LibraryInit(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("Legacy source failed: {0}")]
    LegacySource(String),
}

/// Result type alias for nvchart
pub type Result<T> = std::result::Result<T, NvChartError>;

impl NvChartError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        NvChartError::Config(msg.into())
    }

    /// Create a library handshake error
    pub fn library_init<S: Into<String>>(msg: S) -> Self {
        NvChartError::LibraryInit(msg.into())
    }

    /// Create a device/unit enumeration error
    pub fn enumeration<S: Into<String>>(msg: S) -> Self {
        NvChartError::Enumeration(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        NvChartError::GpuNotAvailable(msg.into())
    }

    pub fn legacy_source<S: Into<String>>(msg: S) -> Self {
        NvChartError::LegacySource(msg.into())
    }
}
