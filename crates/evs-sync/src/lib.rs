//! # evs-sync
//!
//! Event synchronization between two datasets.
//!
//! Both datasets are reduced to their event identifiers, matched into common
//! and one-sided events, and then compared branch by branch: every entry of a
//! [`SyncConfig`] fills all/common/exclusive views for both sides, a 2D
//! relative-difference view, and a list of bad events whose matched values
//! disagree.
//!
//! ## Architecture
//!
//! ```text
//! TreeSource ─► WorkingTree ─► loader ─► collector ─► reconcile ─► accumulator
//!                (pre-selection,                         ▲
//!                 branch activation)        condition ───┘
//! ```
//!
//! [`SyncSession`] owns one run and is the single place where per-entry
//! failures are recovered.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Per-entry views and the bad-event check.
pub mod accumulator;
/// Event identifier collection and duplicate detection.
pub mod collector;
/// Per-branch row conditions.
pub mod condition;
/// Line-oriented sync configuration.
pub mod config;
/// In-memory and JSON trees, pre-selected working copies.
pub mod dataset;
/// Fixed-binning histograms.
pub mod histogram;
/// Typed branch reads through scoped activation.
pub mod loader;
/// Sorted-merge set operations and the common/side-only maps.
pub mod reconcile;
/// Outcome of a run.
pub mod report;
/// One synchronization run.
pub mod session;

pub use accumulator::{
    BadEvent, DEFAULT_BAD_THRESHOLD, EntryViews, FillContext, accumulate, fill_views, is_bad_event,
    supports_kinds,
};
pub use collector::{SideEvents, collect_identifiers};
pub use condition::{CondOp, CondValue, Condition, RowSelector};
pub use config::{SyncConfig, SyncPlotEntry};
pub use dataset::{BranchGuard, MemoryTree, WorkingTree, open_tree};
pub use histogram::{Binning, Hist1D, Hist2D};
pub use loader::{load_column, load_column_as, load_raw};
pub use reconcile::{EventMatching, N_SIDES, difference, intersect};
pub use report::{EntryOutcome, EventSummary, FilledEntry, SyncReport};
pub use session::{SideInput, SyncOptions, SyncSession};
