//! The core error taxonomy (spec.md §7).
//!
//! Every public operation on the storage engine, notification coordinator,
//! and credential store returns `Result<T, Error>`. The connection handler
//! maps each variant to a response: everything here becomes a 500 with the
//! `Display` text as the payload, except that the handler distinguishes
//! [`Error::NotAuthenticated`] only to pick a fixed message ("not
//! authenticated") rather than this type's own rendering.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    OutOfWindow(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
