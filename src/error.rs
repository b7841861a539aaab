use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or materializing an episodic dataset.
///
/// Nothing is retried or recovered: index and plan errors surface at
/// construction time, image errors abort the whole episode fetch.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("label index `{}` is missing", path.display())]
    IndexNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed label index `{}`: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("{available} classes available, episode needs {requested}")]
    InsufficientClasses { available: usize, requested: usize },

    #[error("class `{label}` has {available} samples, episode needs {needed}")]
    InsufficientSamples {
        label: String,
        available: usize,
        needed: usize,
    },

    #[error("no class matches filename `{filename}`")]
    UnknownLabel { filename: String },

    #[error("loading image `{}`", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
