//! All errors that can occur in the epicontact library.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum EpiError {
    /// Raw parameters or settings are out of range. Raised before any step runs.
    ConfigurationError(String),
    /// Data handed over by the agent storage breaks an invariant of the core.
    InvariantViolation(String),
    ReadError(String),
    WriteError(String),
    IoError(String),
}

pub type Result<T> = std::result::Result<T, EpiError>;

impl fmt::Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::ConfigurationError(message) => {
                write!(f, "ConfigurationError: {}", message)
            }
            EpiError::InvariantViolation(message) => {
                write!(f, "InvariantViolation: {}", message)
            }
            EpiError::ReadError(message) => write!(f, "ReadError: {}", message),
            EpiError::WriteError(message) => write!(f, "WriteError: {}", message),
            EpiError::IoError(message) => write!(f, "IoError: {}", message),
        }
    }
}

impl std::error::Error for EpiError {}

impl From<std::io::Error> for EpiError {
    fn from(error: std::io::Error) -> Self {
        EpiError::IoError(format!("{error}"))
    }
}
