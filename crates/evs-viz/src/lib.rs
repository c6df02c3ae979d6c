//! # evs-viz
//!
//! Plot data artifacts for evsync.
//!
//! The synchronization core produces histograms; this crate turns a finished
//! run into plot-friendly JSON pages (arrays instead of nested objects) that
//! an external renderer draws.

#![warn(clippy::all)]

/// Superimposed and 2D correlation pages of a sync run.
pub mod sync_plots;

pub use sync_plots::{
    CorrelationPage, EventCounts, PagePosition, SCHEMA_VERSION, SkippedEntry, SuperimposedPage,
    SyncPage, SyncPlotsArtifact, SyncPlotsMeta, entry_pages, output_file_name, page_title,
};
