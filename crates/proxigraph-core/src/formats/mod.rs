//! # Formats Module
//!
//! Byte-level encodings of graph snapshots. File and database I/O live in
//! [`storage`](crate::storage).

mod persistence;

pub use persistence::*;
