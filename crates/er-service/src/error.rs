use thiserror::Error;

use er_core::CoreError;
use er_spatial::SpatialError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Source data could not be loaded.  Fatal to the load or rebuild that
    /// raised it; the previously published snapshot stays active.
    #[error("data unavailable ({source_name}): {reason}")]
    DataUnavailable { source_name: String, reason: String },

    /// A whole document was unusable (wrong GeoJSON type, bad CSV header).
    /// Individual bad records are skipped, not reported here.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("service configuration error: {0}")]
    Config(String),

    #[error("spatial error: {0}")]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ServiceError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        ServiceError::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
