use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DecodeError {
    /// A present, non-null value does not fit the declared field kind.
    ///
    /// `path` is the JSON path from the decoded root, e.g. `$[1][0][2]`.
    #[error(
        "Schema Mismatch Error: {schema}.{} at {path}: expected {expected}, found {found} {location}",
        .field.as_deref().unwrap_or("<root>")
    )]
    SchemaMismatch {
        schema: String,
        field: Option<String>,
        index: Option<usize>,
        path: String,
        expected: String,
        found: &'static str,
        location: ErrorLocation,
    },

    #[error("Decode JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },
}

impl DecodeError {
    /// Offending position in the source array, if the mismatch is on a field.
    pub fn index(&self) -> Option<usize> {
        match self {
            DecodeError::SchemaMismatch { index, .. } => *index,
            DecodeError::Json { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::SchemaMismatch { path, .. } => Some(path),
            DecodeError::Json { .. } => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        DecodeError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
