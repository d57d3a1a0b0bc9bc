use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlerterError {
    #[error("smtp send failed: {0}")]
    Smtp(String),
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}
