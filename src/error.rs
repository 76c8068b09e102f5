use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide error type.
///
/// Two groups of variants are kept deliberately distinct. `MartNotSet` and
/// `DatasetNotSet` are state-precondition failures: they are returned before
/// any network activity happens and callers may branch on them via
/// [`BiomartError::is_state`]. Everything else is a transport or parse
/// failure that propagates up from a real request.
#[derive(Debug, Error, Diagnostic)]
pub enum BiomartError {
    #[error("no mart selected: call set_mart before this operation")]
    MartNotSet,

    #[error("no dataset selected: call set_dataset before this operation")]
    DatasetNotSet,

    #[error("biomart request failed: {0}")]
    Http(String),

    #[error("biomart returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("response was not valid UTF-8: {0}")]
    Utf8(String),

    #[error("failed to parse mart registry: {0}")]
    RegistryParse(String),

    #[error("failed to parse dataset config: {0}")]
    ConfigParse(String),

    #[error("column {column} holds non-numeric value {value:?}")]
    Coerce { column: String, value: String },

    #[error("no column labeled {0}")]
    MissingColumn(String),

    #[error("table has no column labels")]
    Unlabeled,

    #[error("no annotation table available: run a query first or pass one explicitly")]
    MissingAnnotation,

    #[error("failed to write csv: {0}")]
    Csv(String),

    #[error("invalid filters JSON: {0}")]
    InvalidFilterJson(String),
}

impl BiomartError {
    /// True for the state-precondition group (mart/dataset not set).
    pub fn is_state(&self) -> bool {
        matches!(self, Self::MartNotSet | Self::DatasetNotSet)
    }
}
