//! Dataset materialization and access.

mod dataset_;
mod kolektor;
mod table;

pub use dataset_::*;
pub use kolektor::*;
pub use table::*;
