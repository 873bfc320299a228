//! Flat ROI records exchanged with the persistence gateway.

mod error;
mod io;
mod records;


pub use error::{PersistError, Result};
pub use io::{load_document, load_sample_table, save_document};
pub use records::{RoiDocument, RoiRecord, ShapeRecord, export_records, import_records};
