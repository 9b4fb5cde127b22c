use thiserror::Error;

/// Top-level error type for the Gavel library.
///
/// Each variant maps to one stage of the evaluation workflow, so a failed
/// run can always report which stage it died in.
#[derive(Debug, Error)]
pub enum GavelError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures while loading the evaluation dataset. Never retried here;
/// the caller decides.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Schema mismatch: missing columns {missing:?}")]
    SchemaMismatch { missing: Vec<String> },
}

/// Per-record inference failures. Recoverable: the record is flagged and
/// excluded, the rest of the batch proceeds.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
}

/// Judge-stage failures.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The judge endpoint cannot be reached. Run-fatal: no partial run is
    /// persisted, since the run gates a promotion decision.
    #[error("Judge unavailable: {0}")]
    Unavailable(String),

    /// A context-dependent metric was asked to score a record without
    /// context. Recoverable: the metric is skipped for that record.
    #[error("Record {record_id} has no context")]
    MissingContext { record_id: i64 },

    #[error("Could not parse a score from judge response: {0}")]
    UnparseableScore(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Version {version} of model '{name}' not found")]
    VersionNotFound { name: String, version: u32 },

    #[error("Secret not found: {scope}/{key}")]
    SecretNotFound { scope: String, key: String },
}

pub type Result<T> = std::result::Result<T, GavelError>;
