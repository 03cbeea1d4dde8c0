use crate::platform::{NativeError, WindowId};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("audio device is not open")]
    AudioNotOpen,

    #[error("window {0} has been destroyed")]
    WindowDestroyed(WindowId),

    #[error("no font is set")]
    NoFont,

    #[error("user interface thread has stopped")]
    Closed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn load(path: &Path, err: anyhow::Error) -> Self {
        Self::Load {
            path: path.to_owned(),
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
