use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid plane coordinate `{0}`: expected `z,t` or `z,t,c`")]
    InvalidCoordinate(String),

    #[error("invalid shape selector `{0}`: expected `roi:z,t`")]
    InvalidSelector(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
