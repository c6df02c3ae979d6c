//! Per-entry views: superimposed distributions, relative-difference
//! correlation, and the bad-event list.
//!
//! The two branches of an entry may store different scalar kinds. Each
//! supported `(kind A, kind B)` pair maps to one monomorphized
//! [`fill_views`] instance through a static table; side A's type governs
//! comparisons, side B's value is cast into it.

use evs_core::{Error, EventId, Result, Scalar, ScalarKind};

use crate::condition::RowSelector;
use crate::config::SyncPlotEntry;
use crate::dataset::WorkingTree;
use crate::histogram::{Binning, Hist1D, Hist2D};
use crate::loader::load_column;
use crate::reconcile::{EventMatching, N_SIDES};

/// Relative difference above which floating point values count as different.
pub const DEFAULT_BAD_THRESHOLD: f64 = 0.01;

/// Whether a matched pair disagrees. `b` is already converted to A's type.
///
/// Integral kinds compare exactly. Floating kinds use the relative difference
/// `|a - b| / |b|` against `threshold`, with B as the reference; a zero on
/// one side only is always a mismatch.
pub fn is_bad_event<T: Scalar>(a: T, b: T, threshold: f64) -> bool {
    if T::KIND.is_integral() {
        return a != b;
    }
    if a == b {
        return false;
    }
    if a.is_zero() || b.is_zero() {
        return true;
    }
    let (a, b) = (a.to_f64(), b.to_f64());
    (a - b).abs() / b.abs() > threshold
}

/// One common event whose values disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct BadEvent {
    /// Event identifier.
    pub id: EventId,
    /// Side A value as text.
    pub value_a: String,
    /// Side B value as text, in its stored type.
    pub value_b: String,
    /// `b - a` in A's arithmetic, as text.
    pub diff: String,
}

impl BadEvent {
    fn new<A: Scalar, B: Scalar>(id: EventId, a: A, b: B) -> Self {
        Self {
            id,
            value_a: a.format_value(),
            value_b: b.format_value(),
            diff: a.format_diff(A::cast_from(b)),
        }
    }

    /// Diagnostic line, e.g. `run:lumi:evt = 1:1:12, B = 3, A = 2, B - A = 1`.
    pub fn line(&self, groups: &[String; N_SIDES]) -> String {
        let [ga, gb] = groups;
        format!(
            "{} = {}, {} = {}, {} = {}, {} - {} = {}",
            self.id.legend(),
            self.id,
            gb,
            self.value_b,
            ga,
            self.value_a,
            gb,
            ga,
            self.diff
        )
    }
}

/// Everything filled for one entry.
#[derive(Debug, Clone)]
pub struct EntryViews {
    /// Every row passing its own side's selector.
    pub all: [Hist1D; N_SIDES],
    /// Common events passing both selectors.
    pub common: [Hist1D; N_SIDES],
    /// Events selected on one side only: common pairs where the other
    /// selector fails, plus one-sided events.
    pub exclusive: [Hist1D; N_SIDES],
    /// `(b, (b - a) / b)` for common events passing both selectors.
    pub correlation: Hist2D,
    /// Mismatching common events, in identifier order.
    pub bad_events: Vec<BadEvent>,
}

/// Inputs shared by every kind pair.
pub struct FillContext<'a> {
    /// Row selector per side.
    pub selectors: [&'a RowSelector; N_SIDES],
    /// Reconciled events.
    pub matching: &'a EventMatching,
    /// X binning for every view.
    pub binning: Binning,
    /// Relative mismatch threshold for floating point kinds.
    pub threshold: f64,
}

/// Fill all views of one entry from loaded columns.
pub fn fill_views<A: Scalar, B: Scalar>(a: &[A], b: &[B], ctx: &FillContext<'_>) -> EntryViews {
    let [sel_a, sel_b] = ctx.selectors;
    let hist = || Hist1D::new(ctx.binning);
    let mut views = EntryViews {
        all: [hist(), hist()],
        common: [hist(), hist()],
        exclusive: [hist(), hist()],
        correlation: Hist2D::relative_diff(ctx.binning),
        bad_events: Vec::new(),
    };

    for (row, x) in a.iter().enumerate() {
        if sel_a.pass(row) {
            views.all[0].fill(x.to_f64());
        }
    }
    for (row, x) in b.iter().enumerate() {
        if sel_b.pass(row) {
            views.all[1].fill(x.to_f64());
        }
    }

    for (id, &(row_a, row_b)) in &ctx.matching.common {
        let (Some(&va), Some(&vb)) = (a.get(row_a), b.get(row_b)) else {
            continue;
        };
        match (sel_a.pass(row_a), sel_b.pass(row_b)) {
            (true, true) => {
                views.common[0].fill(va.to_f64());
                views.common[1].fill(vb.to_f64());

                let vb_as_a = A::cast_from(vb);
                if is_bad_event(va, vb_as_a, ctx.threshold) {
                    views.bad_events.push(BadEvent::new(*id, va, vb));
                }

                let x = vb.to_f64();
                let y = if vb.is_zero() {
                    -va.to_f64()
                } else {
                    (vb_as_a.to_f64() - va.to_f64()) / x
                };
                views.correlation.fill(x, y);
            }
            (true, false) => views.exclusive[0].fill(va.to_f64()),
            (false, true) => views.exclusive[1].fill(vb.to_f64()),
            (false, false) => {}
        }
    }

    for (&row, x) in ctx.matching.only[0].values().filter_map(|r| Some((r, a.get(*r)?))) {
        if sel_a.pass(row) {
            views.exclusive[0].fill(x.to_f64());
        }
    }
    for (&row, x) in ctx.matching.only[1].values().filter_map(|r| Some((r, b.get(*r)?))) {
        if sel_b.pass(row) {
            views.exclusive[1].fill(x.to_f64());
        }
    }

    views
}

type FillFn = fn(&[WorkingTree; N_SIDES], &[String; N_SIDES], &FillContext<'_>) -> Result<EntryViews>;

fn fill_typed<A: Scalar, B: Scalar>(
    trees: &[WorkingTree; N_SIDES],
    names: &[String; N_SIDES],
    ctx: &FillContext<'_>,
) -> Result<EntryViews> {
    let a = load_column::<A>(&trees[0], &names[0])?;
    let b = load_column::<B>(&trees[1], &names[1])?;
    Ok(fill_views(&a, &b, ctx))
}

/// Supported `(kind A, kind B)` pairs.
static FILL_TABLE: &[((ScalarKind, ScalarKind), FillFn)] = {
    use ScalarKind::*;
    &[
        ((F32, F32), fill_typed::<f32, f32>),
        ((F64, F64), fill_typed::<f64, f64>),
        ((F64, F32), fill_typed::<f64, f32>),
        ((F32, F64), fill_typed::<f32, f64>),
        ((F32, U32), fill_typed::<f32, u32>),
        ((I32, I32), fill_typed::<i32, i32>),
        ((I32, U32), fill_typed::<i32, u32>),
        ((U32, I32), fill_typed::<u32, i32>),
        ((I32, F64), fill_typed::<i32, f64>),
        ((F64, I32), fill_typed::<f64, i32>),
        ((U64, U64), fill_typed::<u64, u64>),
        ((Bool, Bool), fill_typed::<bool, bool>),
        ((Bool, Char), fill_typed::<bool, i8>),
        ((Bool, I32), fill_typed::<bool, i32>),
    ]
};

/// Whether a kind pair can be compared.
pub fn supports_kinds(kind_a: ScalarKind, kind_b: ScalarKind) -> bool {
    FILL_TABLE.iter().any(|(pair, _)| *pair == (kind_a, kind_b))
}

/// Load, select and fill everything for `entry`.
///
/// Errors here only invalidate this entry: missing branches, unsupported
/// column types and unsupported kind pairs.
pub fn accumulate(
    trees: &[WorkingTree; N_SIDES],
    entry: &SyncPlotEntry,
    matching: &EventMatching,
    threshold: f64,
) -> Result<EntryViews> {
    let kind_a = trees[0].branch_kind(&entry.names[0])?;
    let kind_b = trees[1].branch_kind(&entry.names[1])?;
    let fill = FILL_TABLE
        .iter()
        .find(|(pair, _)| *pair == (kind_a, kind_b))
        .map(|(_, f)| *f)
        .ok_or_else(|| Error::UnsupportedTypeCombination {
            branch_a: entry.names[0].clone(),
            branch_b: entry.names[1].clone(),
            kind_a,
            kind_b,
        })?;

    let selectors = [
        RowSelector::load(&entry.conditions[0], &trees[0])?,
        RowSelector::load(&entry.conditions[1], &trees[1])?,
    ];
    let ctx = FillContext {
        selectors: [&selectors[0], &selectors[1]],
        matching,
        binning: Binning::new(entry.n_bins, entry.range.0, entry.range.1)?,
        threshold,
    };
    fill(trees, &entry.names, &ctx)
}
