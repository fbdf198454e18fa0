use thiserror::Error;

/// Failures local to a single coverage document.
#[derive(Debug, Error)]
pub enum DemError {
    #[error("malformed coverage document: {0}")]
    MalformedDocument(String),

    #[error("grid size mismatch: expected {expected} cells, got {actual}")]
    GridSizeMismatch { expected: usize, actual: usize },

    #[error("cannot parse {field} value {value:?} as a number")]
    NumericParse { field: &'static str, value: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl DemError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        DemError::MalformedDocument(msg.into())
    }

    pub(crate) fn numeric(field: &'static str, value: &str) -> Self {
        DemError::NumericParse {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DemError>;
