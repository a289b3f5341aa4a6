//! # Error Types
//!
//! Errors raised by the labeling, naming and selection core. Collaborators
//! (calendar decoding, staging, version resolution) carry their own error
//! enums; decoding failures are wrapped here unchanged.

use crate::calendar::DecodeError;
use thiserror::Error;

/// Errors that can occur while resolving labels, building archive names or
/// selecting from a time axis.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Unresolved time interval: {0}")]
    UnresolvedInterval(String),

    #[error("Invalid year range: end year {end} is before start year {start}")]
    InvalidRange { start: i32, end: i32 },

    #[error("Unsupported representation '{representation}' with granularity '{granularity}'")]
    UnsupportedRepresentation {
        representation: String,
        granularity: String,
    },

    #[error("Archive file duration must be at least one year, got {0}")]
    InvalidDuration(u32),

    #[error("Invalid {kind}: '{value}'")]
    InvalidSpec { kind: &'static str, value: String },

    #[error("Time decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Variable '{0}' not found in NetCDF file")]
    MissingVariable(String),

    #[error("Variable '{variable}' has no '{attribute}' attribute")]
    MissingAttribute {
        variable: String,
        attribute: String,
    },

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

/// Result type for core operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
