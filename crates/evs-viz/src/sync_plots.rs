//! Sync comparison pages (numbers-first).
//!
//! Every filled entry yields four pages in order: superimposed `all`,
//! `common` and `different` distributions of both sides, then the 2D
//! relative-difference correlation of common events.

use std::time::{SystemTime, UNIX_EPOCH};

use evs_core::Result;
use evs_sync::{FilledEntry, Hist1D, N_SIDES, SyncReport};
use serde::Serialize;

/// Artifact schema identifier.
pub const SCHEMA_VERSION: &str = "evsync_sync_plots_v1";

#[derive(Debug, Clone, Serialize)]
pub struct SyncPlotsArtifact {
    pub schema_version: String,
    pub meta: SyncPlotsMeta,
    pub events: EventCounts,
    pub pages: Vec<SyncPage>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncPlotsMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u128,
    pub channel: String,
    pub sample: String,
    pub groups: [String; N_SIDES],
    pub bad_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventCounts {
    pub events: [usize; N_SIDES],
    pub unique: [usize; N_SIDES],
    pub duplicates: [usize; N_SIDES],
    pub common: usize,
    pub only: [usize; N_SIDES],
    pub bad_events: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePosition {
    First,
    Middle,
    Last,
    Only,
}

impl PagePosition {
    fn of(index: usize, total: usize) -> Self {
        match (index, total) {
            (_, 1) => PagePosition::Only,
            (0, _) => PagePosition::First,
            (i, n) if i + 1 == n => PagePosition::Last,
            _ => PagePosition::Middle,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum SyncPage {
    #[serde(rename = "superimposed")]
    Superimposed(SuperimposedPage),
    #[serde(rename = "correlation_2d")]
    Correlation2d(CorrelationPage),
}

impl SyncPage {
    pub fn title(&self) -> &str {
        match self {
            SyncPage::Superimposed(p) => &p.title,
            SyncPage::Correlation2d(p) => &p.title,
        }
    }

    pub fn position(&self) -> PagePosition {
        match self {
            SyncPage::Superimposed(p) => p.position,
            SyncPage::Correlation2d(p) => p.position,
        }
    }

    fn set_position(&mut self, position: PagePosition) {
        match self {
            SyncPage::Superimposed(p) => p.position = position,
            SyncPage::Correlation2d(p) => p.position = position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuperimposedPage {
    pub title: String,
    pub subset: String,
    pub position: PagePosition,
    pub x_label: String,
    pub y_label: String,
    pub bin_edges: Vec<f64>,
    pub y_a: Vec<f64>,
    pub y_b: Vec<f64>,
    /// Integrals including under- and overflow.
    pub integrals: [f64; N_SIDES],
    pub labels: [String; N_SIDES],
    /// `y_b / y_a`, 0 where `y_a == 0`.
    pub ratio: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationPage {
    pub title: String,
    pub position: PagePosition,
    pub x_label: String,
    pub y_label: String,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// `z[iy][ix]`.
    pub z: Vec<Vec<f64>>,
    pub integral: f64,
    pub labels: [String; N_SIDES],
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub branches: [String; N_SIDES],
    pub reason: String,
}

fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| evs_core::Error::Validation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}

/// Output file name for a run: `PlotsDiff_<channel>_<sample>_<groupA>_<groupB>.json`.
pub fn output_file_name(channel: &str, sample: &str, groups: &[String; N_SIDES]) -> String {
    format!("PlotsDiff_{}_{}_{}_{}.json", channel, sample, groups[0], groups[1])
}

/// `<branchA>[ (<branchB>)], <subset> events[, pre-selection: <label>]`
pub fn page_title(names: &[String; N_SIDES], subset: &str, selection_label: Option<&str>) -> String {
    let mut title = names[0].clone();
    if names[1] != names[0] {
        title.push_str(&format!(" ({})", names[1]));
    }
    title.push_str(&format!(", {} events", subset));
    if let Some(label) = selection_label.filter(|l| !l.is_empty()) {
        title.push_str(&format!(", pre-selection: {}", label));
    }
    title
}

fn ratio(y_a: &[f64], y_b: &[f64]) -> Vec<f64> {
    y_a.iter().zip(y_b).map(|(a, b)| if *a == 0.0 { 0.0 } else { b / a }).collect()
}

fn count_label(group: &str, integral: f64) -> String {
    format!("{} : {}", group, integral.round() as u64)
}

fn superimposed(
    filled: &FilledEntry,
    groups: &[String; N_SIDES],
    subset: &str,
    hists: &[Hist1D; N_SIDES],
) -> SyncPage {
    let integrals = [hists[0].integral_with_flows(), hists[1].integral_with_flows()];
    SyncPage::Superimposed(SuperimposedPage {
        title: page_title(&filled.entry.names, subset, filled.selection_label.as_deref()),
        subset: subset.to_string(),
        position: PagePosition::Middle,
        x_label: filled.entry.names[0].clone(),
        y_label: "Events".to_string(),
        bin_edges: hists[0].bin_edges.clone(),
        y_a: hists[0].bin_content.clone(),
        y_b: hists[1].bin_content.clone(),
        integrals,
        labels: [count_label(&groups[0], integrals[0]), count_label(&groups[1], integrals[1])],
        ratio: ratio(&hists[0].bin_content, &hists[1].bin_content),
    })
}

fn correlation(filled: &FilledEntry, groups: &[String; N_SIDES]) -> SyncPage {
    let names = &filled.entry.names;
    let axis: Vec<String> = (0..N_SIDES).map(|n| format!("{}_{}", names[n], groups[n])).collect();
    let h = &filled.views.correlation;
    let integral = h.integral_with_flows();
    let title = page_title(names, "common", filled.selection_label.as_deref());
    SyncPage::Correlation2d(CorrelationPage {
        title: format!("{} 2D", title),
        position: PagePosition::Middle,
        x_label: axis[1].clone(),
        y_label: format!("({} - {})/{}", axis[1], axis[0], axis[1]),
        x_edges: h.x_edges.clone(),
        y_edges: h.y_edges.clone(),
        z: h.content.clone(),
        integral,
        labels: [count_label(&groups[0], integral), count_label(&groups[1], integral)],
    })
}

/// Pages of one filled entry, in output order.
pub fn entry_pages(filled: &FilledEntry, groups: &[String; N_SIDES]) -> Vec<SyncPage> {
    let views = &filled.views;
    vec![
        superimposed(filled, groups, "all", &views.all),
        superimposed(filled, groups, "common", &views.common),
        superimposed(filled, groups, "different", &views.exclusive),
        correlation(filled, groups),
    ]
}

impl SyncPlotsArtifact {
    /// Build the artifact from a finished run.
    pub fn from_report(report: &SyncReport) -> Result<Self> {
        let mut pages: Vec<SyncPage> =
            report.filled().flat_map(|f| entry_pages(f, &report.groups)).collect();
        let total = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            page.set_position(PagePosition::of(i, total));
        }

        let skipped = report
            .entries
            .iter()
            .filter_map(|e| match e {
                evs_sync::EntryOutcome::Skipped { entry, reason } => Some(SkippedEntry {
                    branches: entry.names.clone(),
                    reason: reason.clone(),
                }),
                evs_sync::EntryOutcome::Filled(_) => None,
            })
            .collect::<Vec<_>>();

        let s = &report.summary;
        tracing::debug!(pages = total, skipped = skipped.len(), "built sync plots artifact");
        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            meta: SyncPlotsMeta {
                tool: "evsync".to_string(),
                tool_version: evs_core::VERSION.to_string(),
                created_unix_ms: now_unix_ms()?,
                channel: report.channel.clone(),
                sample: report.sample.clone(),
                groups: report.groups.clone(),
                bad_threshold: report.bad_threshold,
            },
            events: EventCounts {
                events: s.events,
                unique: s.unique,
                duplicates: [s.duplicates[0].len(), s.duplicates[1].len()],
                common: s.common,
                only: [s.only[0].len(), s.only[1].len()],
                bad_events: report.bad_event_count(),
            },
            pages,
            skipped,
        })
    }

    /// Default output file name.
    pub fn file_name(&self) -> String {
        output_file_name(&self.meta.channel, &self.meta.sample, &self.meta.groups)
    }
}
