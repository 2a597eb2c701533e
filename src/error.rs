//! The crate-wide error type.
//!
//! Configuration problems (`InvalidParameter`, `InvalidDiseaseProfile`,
//! `CapacityExceeded`) are raised before any simulated day runs. An
//! `Internal` error means an engine invariant was broken and is never an
//! expected epidemiological outcome.

use std::fmt::{self, Display};

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiError {
    /// A population or topology input is outside its valid domain.
    InvalidParameter(String),
    /// A disease profile carries a malformed distribution or table.
    InvalidDiseaseProfile(String),
    /// The requested population is above the configured hard ceiling.
    CapacityExceeded { requested: usize, ceiling: usize },
    /// An engine invariant was violated.
    Internal(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    LoggingError(String),
}

impl From<std::io::Error> for EpiError {
    fn from(error: std::io::Error) -> Self {
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

impl std::error::Error for EpiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiError::IoError(error) => Some(error),
            EpiError::JsonError(error) => Some(error),
            EpiError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpiError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            EpiError::InvalidDiseaseProfile(msg) => write!(f, "invalid disease profile: {msg}"),
            EpiError::CapacityExceeded { requested, ceiling } => write!(
                f,
                "population of {requested} exceeds the configured ceiling of {ceiling}"
            ),
            EpiError::Internal(msg) => write!(f, "internal error: {msg}"),
            EpiError::IoError(error) => write!(f, "io error: {error}"),
            EpiError::JsonError(error) => write!(f, "json error: {error}"),
            EpiError::CsvError(error) => write!(f, "csv error: {error}"),
            EpiError::LoggingError(msg) => write!(f, "logging error: {msg}"),
        }
    }
}

impl EpiError {
    /// True for the errors that reject a configuration before a run starts.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EpiError::InvalidParameter(_)
                | EpiError::InvalidDiseaseProfile(_)
                | EpiError::CapacityExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_ceiling() {
        let error = EpiError::CapacityExceeded {
            requested: 10,
            ceiling: 5,
        };
        assert_eq!(
            error.to_string(),
            "population of 10 exceeds the configured ceiling of 5"
        );
        assert!(error.is_configuration_error());
    }

    #[test]
    fn io_errors_convert_and_keep_their_source() {
        let error: EpiError = std::io::Error::other("disk on fire").into();
        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_configuration_error());
    }
}
