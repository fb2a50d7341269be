use std::io;
use thiserror::Error;

use crate::socks5::Socks5Error;

/// Errors in this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    IO(#[from] io::Error),
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),
    #[error("Socks5 error: {0}")]
    Socks5(#[from] Socks5Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0:?}")]
    Storage(#[from] anyhow::Error),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::IO(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

impl Error {
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, Error::IndexOutOfRange { .. })
    }
}
