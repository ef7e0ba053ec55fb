//! The two chunk pipelines.
//!
//! [`split`] chunks its input once and streams every processor's output
//! straight through. [`reduce`] feeds the one-line-per-chunk output of each
//! level back in as the next level's input until a level yields at most one
//! chunk.

mod reduce;
mod split;

pub use reduce::reduce;
pub use split::split;
