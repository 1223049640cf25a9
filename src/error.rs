//! Crate-wide error type

use thiserror::Error;

use crate::gfx::{
    geometry::ModelError,
    rendering::backend::BackendError,
    resources::bitmap::BitmapError,
    scene::{color::ColorError, store::SceneError},
};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The app driver hasn't created its window and engine yet
    #[error("engine used before the window was created")]
    NotInitialized,
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Bitmap(#[from] BitmapError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
