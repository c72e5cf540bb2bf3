//! Mathematical utilities: least squares and sample moments.

pub mod moments;
pub mod ols;

pub use moments::*;
pub use ols::*;
