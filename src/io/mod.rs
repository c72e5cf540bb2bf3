//! Input/output helpers.
//!
//! - CSV ingest + header normalization (`ingest`)
//! - fitted-row CSV export (`export`)
//! - fit report JSON read/write (`fit_file`)

pub mod export;
pub mod fit_file;
pub mod ingest;

pub use export::*;
pub use fit_file::*;
pub use ingest::*;
