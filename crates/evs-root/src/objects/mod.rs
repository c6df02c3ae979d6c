//! Streamed ROOT objects read from key payloads.

mod ttree;

pub use ttree::read_ttree;
