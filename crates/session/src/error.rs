//! Error types for sessions

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Ipc(#[from] ipc::Error),

    #[error("Failed to retrieve realm context: {0}")]
    Bootstrap(#[from] reqwest::Error),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
