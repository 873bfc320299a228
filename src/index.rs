mod component;
mod edit;
mod error;


pub use component::{DEFAULT_NAMESPACE, IdPolicy, RoiComponent};
pub use edit::PlaneEdit;
pub use error::{IndexError, Result};
