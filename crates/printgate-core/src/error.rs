use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("Enroll ID must be {min}-{max}, got {value}")]
    InvalidEnrollId { value: i64, min: u8, max: u8 },

    #[error("Invalid enroll ID: {0}")]
    MalformedEnrollId(String),
}

pub type Result<T> = std::result::Result<T, Error>;
