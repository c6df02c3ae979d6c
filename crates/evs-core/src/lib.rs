//! # evs-core
//!
//! Core types shared by the evsync crates.
//!
//! - [`EventId`]: the composite (run, lumi, event, sample) key used to match
//!   events between two datasets.
//! - [`ScalarKind`], [`Column`], [`Scalar`]: typed, in-memory branch columns
//!   and the numeric conversions between them.
//! - [`TreeSource`]: the read-only tabular dataset seam implemented by the ROOT
//!   reader and by in-memory trees.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event_id;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use event_id::EventId;
pub use traits::TreeSource;
pub use types::{Column, Scalar, ScalarKind, Wide};

/// evsync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
