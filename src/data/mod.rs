//! Row-set analysis that sits between ingest and fitting.
//!
//! - partitioning by temperature (`group`)
//! - descriptive statistics per numeric column (`summary`)

pub mod group;
pub mod summary;

pub use group::*;
pub use summary::*;
