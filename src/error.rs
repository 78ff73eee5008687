//! Provides [`EpiError`] and wraps other errors.
use std::fmt::{self, Display};
use std::io;

/// Crate-wide error type. Configuration and input-file problems are reported
/// through this; data-invariant violations inside the kernels indicate corrupt
/// input or a programmer error and assert instead.
#[derive(Debug)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ParseIntError(std::num::ParseIntError),
    ParseFloatError(std::num::ParseFloatError),
    EpiError(String),
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CsvError(error)
    }
}

impl From<std::num::ParseIntError> for EpiError {
    fn from(error: std::num::ParseIntError) -> Self {
        EpiError::ParseIntError(error)
    }
}

impl From<std::num::ParseFloatError> for EpiError {
    fn from(error: std::num::ParseFloatError) -> Self {
        EpiError::ParseFloatError(error)
    }
}

impl From<String> for EpiError {
    fn from(error: String) -> Self {
        EpiError::EpiError(error)
    }
}

impl From<&str> for EpiError {
    fn from(error: &str) -> Self {
        EpiError::EpiError(error.to_string())
    }
}

impl std::error::Error for EpiError {}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
