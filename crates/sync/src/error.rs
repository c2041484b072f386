use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Records(#[from] exambank_records::Error),

    #[error(transparent)]
    Vector(#[from] exambank_vector::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
