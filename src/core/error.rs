//! Exposes the deimos error type

use std::sync::PoisonError;

use thiserror::Error;

use crate::resource::handle::ResourceHandle;

/// Error type that deimos can return.
#[derive(Error, Debug)]
pub enum Error {
    /// A fatal initialization failure. Startup should be aborted.
    #[error("Initialization failed: {0}")]
    InitFailed(&'static str),
    /// A pass declared an access on a handle the graph never declared.
    #[error("Invalid resource handle {0:?}")]
    InvalidHandle(ResourceHandle),
    /// An external resource handle was used without being registered for this compile.
    #[error("External resource {0:?} was not registered for this compile")]
    ExternalNotRegistered(ResourceHandle),
    /// The render thread already has a dispatch outstanding.
    #[error("Render thread is already executing a dispatch")]
    RenderThreadBusy,
    /// The render thread died while executing a dispatch.
    #[error("Render thread panicked")]
    RenderThreadPanicked,
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
