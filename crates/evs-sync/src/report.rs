//! Result of one synchronization run.

use std::collections::BTreeSet;

use evs_core::EventId;

use crate::accumulator::EntryViews;
use crate::config::SyncPlotEntry;
use crate::reconcile::N_SIDES;

/// Event bookkeeping of both sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventSummary {
    /// Rows per side (after pre-selection).
    pub events: [usize; N_SIDES],
    /// Distinct identifiers per side.
    pub unique: [usize; N_SIDES],
    /// Second and later occurrences per side, in row order.
    pub duplicates: [Vec<EventId>; N_SIDES],
    /// Identifiers present on both sides.
    pub common: usize,
    /// One-sided identifiers per side, in identifier order.
    pub only: [BTreeSet<EventId>; N_SIDES],
}

/// A comparison entry that produced views.
#[derive(Debug, Clone)]
pub struct FilledEntry {
    /// The config entry.
    pub entry: SyncPlotEntry,
    /// Text of the first non-trivial condition, if any.
    pub selection_label: Option<String>,
    /// Filled histograms and bad events.
    pub views: EntryViews,
}

/// Outcome of one comparison entry.
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    /// Views were filled.
    Filled(FilledEntry),
    /// The entry hit a data error and was skipped.
    Skipped {
        /// The config entry.
        entry: SyncPlotEntry,
        /// Error message.
        reason: String,
    },
}

impl EntryOutcome {
    /// The config entry this outcome belongs to.
    pub fn entry(&self) -> &SyncPlotEntry {
        match self {
            EntryOutcome::Filled(filled) => &filled.entry,
            EntryOutcome::Skipped { entry, .. } => entry,
        }
    }

    /// Filled views, if the entry was not skipped.
    pub fn filled(&self) -> Option<&FilledEntry> {
        match self {
            EntryOutcome::Filled(filled) => Some(filled),
            EntryOutcome::Skipped { .. } => None,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Channel name.
    pub channel: String,
    /// Sample name.
    pub sample: String,
    /// Group label per side.
    pub groups: [String; N_SIDES],
    /// Relative mismatch threshold used.
    pub bad_threshold: f64,
    /// Event bookkeeping.
    pub summary: EventSummary,
    /// One outcome per config entry, in config order.
    pub entries: Vec<EntryOutcome>,
}

impl SyncReport {
    /// Entries that produced views.
    pub fn filled(&self) -> impl Iterator<Item = &FilledEntry> {
        self.entries.iter().filter_map(EntryOutcome::filled)
    }

    /// Number of skipped entries.
    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.filled().count()
    }

    /// Bad events over all filled entries.
    pub fn bad_event_count(&self) -> usize {
        self.filled().map(|f| f.views.bad_events.len()).sum()
    }
}
