//! Core definitions (error type and validation helpers), relied upon by all
//! offheap-* crates.

pub mod error;
pub mod result;

pub use result::Result;
