//! Reader for ISO/IEC 8211 data descriptive files (DDF) and the IHO S-57
//! electronic navigational chart (ENC) format carried on top of them.
//!
//! The [`iso8211`] module digests a file's data descriptive record into a
//! runtime schema of field and subfield definitions and streams the data
//! records against it. The [`s57`] module interprets those records as chart
//! content: isolated and connected nodes, edges and feature primitives.

pub mod geometry;
pub mod iso8211;
pub mod s57;

pub use iso8211::{EncError, Module, Result};
pub use s57::Chart;
