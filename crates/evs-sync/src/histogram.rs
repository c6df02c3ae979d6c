//! Fixed-binning count histograms.

use evs_core::{Error, Result};
use serde::Serialize;

/// Equal-width binning over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Binning {
    /// Number of bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
}

impl Binning {
    /// Validated binning.
    pub fn new(n_bins: usize, min: f64, max: f64) -> Result<Self> {
        if n_bins == 0 || !min.is_finite() || !max.is_finite() || min >= max {
            return Err(Error::Validation(format!(
                "invalid binning: {} bins over [{}, {})",
                n_bins, min, max
            )));
        }
        Ok(Self { n_bins, min, max })
    }

    /// Bin edges, `n_bins + 1` values.
    pub fn edges(&self) -> Vec<f64> {
        let width = (self.max - self.min) / self.n_bins as f64;
        (0..=self.n_bins)
            .map(|i| if i == self.n_bins { self.max } else { self.min + width * i as f64 })
            .collect()
    }
}

/// Where a value lands relative to the binned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Under,
    Bin(usize),
    Over,
}

fn find_bin(edges: &[f64], val: f64) -> Slot {
    let (Some(&lo), Some(&hi)) = (edges.first(), edges.last()) else {
        return Slot::Over;
    };
    if val < lo {
        return Slot::Under;
    }
    if val.is_nan() || val >= hi {
        return Slot::Over;
    }
    // First edge strictly greater than `val`, minus one.
    let upper = edges.partition_point(|e| e.total_cmp(&val).is_le());
    Slot::Bin(upper.saturating_sub(1).min(edges.len() - 2))
}

/// One-dimensional count histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hist1D {
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Counts per bin, excluding under/overflow.
    pub bin_content: Vec<f64>,
    /// Values below the first edge.
    pub underflow: f64,
    /// Values at or above the last edge (and NaN).
    pub overflow: f64,
    /// Number of fills.
    pub entries: u64,
}

impl Hist1D {
    /// Empty histogram with the given binning.
    pub fn new(binning: Binning) -> Self {
        Self {
            bin_edges: binning.edges(),
            bin_content: vec![0.0; binning.n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Add one count at `x`.
    pub fn fill(&mut self, x: f64) {
        self.entries += 1;
        match find_bin(&self.bin_edges, x) {
            Slot::Under => self.underflow += 1.0,
            Slot::Over => self.overflow += 1.0,
            Slot::Bin(i) => self.bin_content[i] += 1.0,
        }
    }

    /// Sum over the in-range bins.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Sum including under- and overflow.
    pub fn integral_with_flows(&self) -> f64 {
        self.integral() + self.underflow + self.overflow
    }
}

/// Two-dimensional count histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hist2D {
    /// X bin edges.
    pub x_edges: Vec<f64>,
    /// Y bin edges.
    pub y_edges: Vec<f64>,
    /// Counts, `content[iy][ix]`.
    pub content: Vec<Vec<f64>>,
    /// Fills outside the binned area on either axis.
    pub outside: f64,
    /// Number of fills.
    pub entries: u64,
}

impl Hist2D {
    /// Y-axis of the relative difference plot.
    pub const RELATIVE_DIFF_Y: Binning = Binning { n_bins: 61, min: -1.525, max: 1.525 };

    /// Empty histogram.
    pub fn new(x: Binning, y: Binning) -> Self {
        Self {
            x_edges: x.edges(),
            y_edges: y.edges(),
            content: vec![vec![0.0; x.n_bins]; y.n_bins],
            outside: 0.0,
            entries: 0,
        }
    }

    /// `x` binning with the fixed relative difference y-axis.
    pub fn relative_diff(x: Binning) -> Self {
        Self::new(x, Self::RELATIVE_DIFF_Y)
    }

    /// Add one count at `(x, y)`.
    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (find_bin(&self.x_edges, x), find_bin(&self.y_edges, y)) {
            (Slot::Bin(ix), Slot::Bin(iy)) => self.content[iy][ix] += 1.0,
            _ => self.outside += 1.0,
        }
    }

    /// Sum over the in-range cells.
    pub fn integral(&self) -> f64 {
        self.content.iter().flatten().sum()
    }

    /// Sum including fills outside the binned area.
    pub fn integral_with_flows(&self) -> f64 {
        self.integral() + self.outside
    }
}
