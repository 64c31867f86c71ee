use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid card UID: {0}")]
    InvalidUid(String),

    #[error("Invalid card entry: {0}")]
    InvalidCardEntry(String),

    #[error("Duplicate card identifier: {0}")]
    DuplicateCard(String),
}

pub type Result<T> = std::result::Result<T, Error>;
