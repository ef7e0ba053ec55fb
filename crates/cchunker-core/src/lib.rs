//! Content-defined chunking pipelines for deduplicating backup tools.
//!
//! A byte stream is cut into content-defined chunks and each chunk is handed
//! to an external processor. [`driver::split`] does this once;
//! [`driver::reduce`] repeats it over the processors' one-line outputs until
//! the whole input collapses into a single summary line.

pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod polynomial;
pub mod summary;
pub mod types;

pub use error::{CchunkError, Result};
