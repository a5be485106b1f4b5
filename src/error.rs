use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API call {method} failed: {comment}")]
    ApiFailed { method: String, comment: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("snapshot store error: {0}")]
    Store(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("mail build error: {0}")]
    Mail(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
