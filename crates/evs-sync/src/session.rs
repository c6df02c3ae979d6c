//! One synchronization run over two datasets.
//!
//! The session owns both pre-selected working trees. [`SyncSession::run`]
//! collects and reconciles identifiers once, then walks the config entries;
//! the entry loop is the only place where errors are recovered.

use std::io::Write;
use std::path::PathBuf;

use evs_core::{Error, Result};

use crate::accumulator::{DEFAULT_BAD_THRESHOLD, accumulate};
use crate::collector::SideEvents;
use crate::config::SyncConfig;
use crate::dataset::{WorkingTree, open_tree};
use crate::reconcile::{EventMatching, N_SIDES};
use crate::report::{EntryOutcome, EventSummary, FilledEntry, SyncReport};

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Channel name (header and output naming).
    pub channel: String,
    /// Sample name (header and output naming).
    pub sample: String,
    /// Relative mismatch threshold for floating point branches.
    pub bad_threshold: f64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { channel: String::new(), sample: String::new(), bad_threshold: DEFAULT_BAD_THRESHOLD }
    }
}

/// One dataset to compare.
#[derive(Debug, Clone, PartialEq)]
pub struct SideInput {
    /// Group label used in diagnostics and plots.
    pub group: String,
    /// Input file (`.root` or `.json`).
    pub file: PathBuf,
    /// Tree path inside the file.
    pub tree: String,
    /// Pre-selection expression; empty keeps every row.
    pub pre_selection: String,
}

impl SideInput {
    /// Check the parallel per-side argument lists and zip them into inputs.
    ///
    /// Groups, files and trees must hold exactly two values each; at most two
    /// pre-selections may be given, missing ones keep every row.
    pub fn from_lists(
        groups: &[String],
        files: &[PathBuf],
        trees: &[String],
        pre_selections: &[String],
    ) -> Result<[SideInput; N_SIDES]> {
        if groups.len() != N_SIDES
            || files.len() != N_SIDES
            || trees.len() != N_SIDES
            || pre_selections.len() > N_SIDES
        {
            return Err(Error::InvalidArguments(format!(
                "expected {n} groups, files and trees and at most {n} pre-selections, got {} / {} / {} / {}",
                groups.len(),
                files.len(),
                trees.len(),
                pre_selections.len(),
                n = N_SIDES
            )));
        }
        Ok(std::array::from_fn(|n| SideInput {
            group: groups[n].clone(),
            file: files[n].clone(),
            tree: trees[n].clone(),
            pre_selection: pre_selections.get(n).cloned().unwrap_or_default(),
        }))
    }
}

/// Two opened datasets plus the comparison config.
pub struct SyncSession {
    config: SyncConfig,
    options: SyncOptions,
    groups: [String; N_SIDES],
    trees: [WorkingTree; N_SIDES],
}

impl SyncSession {
    /// Print the run header to `out` and open both inputs.
    pub fn open(
        config: SyncConfig,
        options: SyncOptions,
        inputs: [SideInput; N_SIDES],
        out: &mut dyn Write,
    ) -> Result<Self> {
        writeln!(out, "{} {}", options.channel, options.sample)?;
        let mut groups: [String; N_SIDES] = Default::default();
        let mut trees = Vec::with_capacity(N_SIDES);
        for (n, input) in inputs.into_iter().enumerate() {
            writeln!(out, "{}  {}  {}", input.group, input.file.display(), input.tree)?;
            let source = open_tree(&input.file, &input.tree)?;
            tracing::info!(
                group = %input.group,
                file = %input.file.display(),
                tree = %input.tree,
                entries = source.entries(),
                "opened input"
            );
            trees.push(WorkingTree::new(source, &input.pre_selection)?);
            groups[n] = input.group;
        }
        let trees: [WorkingTree; N_SIDES] = trees
            .try_into()
            .map_err(|_| Error::Validation("expected one tree per side".into()))?;
        Ok(Self::from_trees(config, options, groups, trees))
    }

    /// Session over already prepared working trees.
    pub fn from_trees(
        config: SyncConfig,
        options: SyncOptions,
        groups: [String; N_SIDES],
        trees: [WorkingTree; N_SIDES],
    ) -> Self {
        Self { config, options, groups, trees }
    }

    /// Group labels.
    pub fn groups(&self) -> &[String; N_SIDES] {
        &self.groups
    }

    /// Collect, reconcile and fill every entry.
    ///
    /// Diagnostics go to `out`; skipped entries are reported on `err` as
    /// `WARNING: <message>`. Only data errors of a single entry are recovered,
    /// anything else aborts the run.
    pub fn run(&self, out: &mut dyn Write, err: &mut dyn Write) -> Result<SyncReport> {
        let sides = self.collect_events(out)?;
        let matching = EventMatching::build(&sides);
        writeln!(out, "# common events = {}", matching.common_count())?;
        for (group, only) in self.groups.iter().zip(&matching.only) {
            writeln!(out, "{} events", group)?;
            for id in only.keys() {
                writeln!(out, "{} = {}", id.legend(), id)?;
            }
        }
        tracing::info!(
            common = matching.common_count(),
            only_a = matching.only[0].len(),
            only_b = matching.only[1].len(),
            "reconciled events"
        );

        let mut entries = Vec::with_capacity(self.config.entries.len());
        for entry in &self.config.entries {
            tracing::info!(branch_a = %entry.names[0], branch_b = %entry.names[1], "filling entry");
            match accumulate(&self.trees, entry, &matching, self.options.bad_threshold) {
                Ok(views) => {
                    writeln!(out, "{} bad events:", entry.names[0])?;
                    for bad in &views.bad_events {
                        writeln!(out, "{}", bad.line(&self.groups))?;
                    }
                    entries.push(EntryOutcome::Filled(FilledEntry {
                        entry: entry.clone(),
                        selection_label: entry.selection_label(),
                        views,
                    }));
                }
                Err(e) if e.is_data_error() => {
                    tracing::warn!(branch_a = %entry.names[0], error = %e, "skipping entry");
                    writeln!(err, "WARNING: {}", e)?;
                    entries.push(EntryOutcome::Skipped { entry: entry.clone(), reason: e.to_string() });
                }
                Err(e) => return Err(e),
            }
        }

        let summary = EventSummary {
            events: std::array::from_fn(|n| sides[n].ids.len()),
            unique: std::array::from_fn(|n| sides[n].unique.len()),
            duplicates: sides.map(|s| s.duplicates),
            common: matching.common_count(),
            only: matching.only.map(|m| m.into_keys().collect()),
        };
        Ok(SyncReport {
            channel: self.options.channel.clone(),
            sample: self.options.sample.clone(),
            groups: self.groups.clone(),
            bad_threshold: self.options.bad_threshold,
            summary,
            entries,
        })
    }

    fn collect_events(&self, out: &mut dyn Write) -> Result<[SideEvents; N_SIDES]> {
        let mut sides: [SideEvents; N_SIDES] = Default::default();
        for n in 0..N_SIDES {
            let side = SideEvents::collect(&self.trees[n], &self.config.id_branches[n])?;
            let group = &self.groups[n];
            writeln!(
                out,
                "# {g} events = {}, # {g} unique events = {}",
                side.ids.len(),
                side.unique.len(),
                g = group
            )?;
            if !side.duplicates.is_empty() {
                tracing::warn!(group = %group, duplicates = side.duplicates.len(), "duplicated events");
                writeln!(out, "{} duplicated events:", group)?;
                for id in &side.duplicates {
                    writeln!(out, "{}", id)?;
                }
                writeln!(out)?;
            }
            sides[n] = side;
        }
        Ok(sides)
    }
}
