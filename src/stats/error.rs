use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("histogram needs at least one bin")]
    NoBins,

    #[error("invalid intensity bounds [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },
}
