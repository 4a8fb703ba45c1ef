// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("'options.{name}' {message}")]
    InvalidOption { name: String, message: String },
    #[error("invalid color '{0}'")]
    InvalidColor(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("raster surface has not been initialised")]
    SurfaceMissing,
    #[error("cannot mount multiple instances on the same target '{0}', destroy the previous instance first")]
    AlreadyMounted(String),
    #[error("player has been destroyed")]
    Destroyed,
    #[error("render worker disconnected")]
    WorkerDisconnected,
    #[error("decode error: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PlayerError {
    pub(crate) fn option(name: &str, message: impl Into<String>) -> Self {
        PlayerError::InvalidOption {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
