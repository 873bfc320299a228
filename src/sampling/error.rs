use crate::model::Coord3D;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SampleError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("plane {0} is outside the image")]
    PlaneOutOfRange(Coord3D),

    #[error("channel {0} is not available")]
    UnknownChannel(usize),

    #[error("shape covers no pixels")]
    EmptyFootprint,

    #[error("no samples recorded for {0}")]
    Missing(String),

    #[error("pixel source unavailable: {0}")]
    Unavailable(String),
}
