//! Sync config file.
//!
//! ```text
//! run, lumi, evt            # id branches of side A
//! run lumi evt              # id branches of side B
//! pt_1 40 0 200             # same branch name on both sides
//! m_vis mvis 30 0 300 njets>=1
//! iso_1 iso_1 50 0 1 1 iso_1<0.15
//! ```
//!
//! Lines after the first two are comparison entries; blank lines and lines
//! starting with `#` are ignored.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use evs_core::{Error, Result};

use crate::condition::Condition;
use crate::reconcile::N_SIDES;

/// One branch comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlotEntry {
    /// Branch name on side A and side B.
    pub names: [String; N_SIDES],
    /// Number of equal-width bins.
    pub n_bins: usize,
    /// Histogram range `[min, max)`.
    pub range: (f64, f64),
    /// Row condition per side.
    pub conditions: [Condition; N_SIDES],
}

impl SyncPlotEntry {
    /// Whether any side has a condition other than `1`.
    pub fn has_condition(&self) -> bool {
        self.conditions.iter().any(|c| !c.is_always_true())
    }

    /// Text of the first non-trivial condition, used in page titles.
    pub fn selection_label(&self) -> Option<String> {
        self.conditions.iter().find(|c| !c.is_always_true()).map(ToString::to_string)
    }
}

impl FromStr for SyncPlotEntry {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfigLine(line.trim().to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if !(4..=7).contains(&tokens.len()) {
            return Err(invalid());
        }

        let same_name = tokens[1].parse::<usize>().is_ok();
        let (names, rest) = if same_name {
            ([tokens[0], tokens[0]], &tokens[1..])
        } else {
            ([tokens[0], tokens[1]], &tokens[2..])
        };
        if !(3..=5).contains(&rest.len()) {
            return Err(invalid());
        }

        let n_bins: usize = rest[0].parse().map_err(|_| invalid())?;
        let min: f64 = rest[1].parse().map_err(|_| invalid())?;
        let max: f64 = rest[2].parse().map_err(|_| invalid())?;
        if n_bins == 0 || min.is_nan() || max.is_nan() || min >= max {
            return Err(invalid());
        }

        let mut conditions = [Condition::AlwaysTrue, Condition::AlwaysTrue];
        for (slot, text) in conditions.iter_mut().zip(&rest[3..]) {
            *slot = text.parse()?;
        }

        Ok(Self {
            names: names.map(String::from),
            n_bins,
            range: (min, max),
            conditions,
        })
    }
}

impl fmt::Display for SyncPlotEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.names[0], self.names[1], self.n_bins, self.range.0, self.range.1
        )?;
        if self.has_condition() {
            write!(f, " {} {}", self.conditions[0], self.conditions[1])?;
        }
        Ok(())
    }
}

/// Parsed sync config: id branches per side and the ordered entries.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Event id branches (3 or 4 names) for side A and side B.
    pub id_branches: [Vec<String>; N_SIDES],
    /// Comparison entries in file order.
    pub entries: Vec<SyncPlotEntry>,
}

impl SyncConfig {
    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let mut id_branches: [Vec<String>; N_SIDES] = Default::default();
        for slot in &mut id_branches {
            let line = lines
                .next()
                .ok_or_else(|| Error::InvalidIdColumnSpec(String::new()))?;
            *slot = parse_id_line(line)?;
        }

        let entries = lines
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::parse::<SyncPlotEntry>)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(entries = entries.len(), "parsed sync config");
        Ok(Self { id_branches, entries })
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::FileOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }
}

impl FromStr for SyncConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_id_line(line: &str) -> Result<Vec<String>> {
    let content = line.split('#').next().unwrap_or_default();
    let names: Vec<String> = content
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if !(3..=4).contains(&names.len()) {
        return Err(Error::InvalidIdColumnSpec(line.to_string()));
    }
    Ok(names)
}
