//! Error types for snapshot decoding

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unexpected introspection status shape: {0}")]
    Shape(#[from] rmpv::ext::Error),

    #[error("Timestamp out of range: {0} ms")]
    Timestamp(i64),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
