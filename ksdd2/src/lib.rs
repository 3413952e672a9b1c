//! The Kolektor Surface-Defect 2 dataset adapter.

mod common;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod transform;
