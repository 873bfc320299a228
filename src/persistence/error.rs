use crate::index::IndexError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PersistError>;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid ROI record: {0}")]
    Parse(String),

    #[error("ROI document I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROI document JSON failure: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("ROI document YAML failure: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("ROI records do not fit the index: {0}")]
    Index(#[from] IndexError),
}
