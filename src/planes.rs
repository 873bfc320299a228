//! Plane-set algorithms: edits that span several planes or several ROIs.
//!
//! Every function validates its whole input before touching the index, so a
//! failed call leaves the index exactly as it was.

mod delete_range;
mod duplicate;
mod merge;
mod propagate;
mod selection;
mod split;


pub use delete_range::delete_range;
pub use duplicate::duplicate;
pub use merge::merge;
pub use propagate::propagate;
pub use split::split;
