//! Peak down-selection, globally by intensity or per position chunk.
//!
//! Chunked selection bounds how many peaks a single dense region can
//! contribute, so that a shift estimated from the selection is not pulled
//! towards the local offset of that region.

use crate::{
    PeakSet,
    RecalError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;
use tracing::debug;

/// How to split the position axis into chunks.
///
/// Example (JSON):
/// ```
/// use mzrecal::Binning;
///
/// let by_width: Binning = serde_json::from_str(r#"{"width": 0.2}"#).unwrap();
/// let by_count: Binning = serde_json::from_str(r#"{"count": 10}"#).unwrap();
/// let explicit: Binning = serde_json::from_str(r#"{"edges": [0.0, 1.0, 5.0]}"#).unwrap();
/// assert_eq!(by_width, Binning::default());
/// assert_eq!(by_count, Binning::Count(10));
/// assert_eq!(explicit, Binning::Edges(vec![0.0, 1.0, 5.0]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binning {
    /// Contiguous bins of this width, starting at the smallest position.
    #[serde(rename = "width")]
    Width(f64),
    /// This many equal-width bins between the smallest and largest position.
    #[serde(rename = "count")]
    Count(usize),
    /// Explicit, strictly increasing bin edges.
    #[serde(rename = "edges")]
    Edges(Vec<f64>),
}

impl Default for Binning {
    fn default() -> Self {
        Binning::Width(0.2)
    }
}

impl Binning {
    /// Checks the parameters that do not depend on the data range.
    pub fn validate(&self) -> Result<(), RecalError> {
        match self {
            Binning::Width(width) => {
                if !width.is_finite() || *width <= 0.0 {
                    return Err(RecalError::InvalidBinWidth(*width));
                }
            }
            Binning::Count(0) => return Err(RecalError::ZeroBins),
            Binning::Count(_) => {}
            Binning::Edges(edges) => {
                Bins::check_edges(edges)?;
            }
        }
        Ok(())
    }

    /// Materializes the bins for a `(min, max)` position range.
    ///
    /// Explicit edges ignore the range.
    pub fn build(&self, range: (f64, f64)) -> Result<Bins, RecalError> {
        match self {
            Binning::Width(width) => Bins::with_width(range, *width),
            Binning::Count(n_bins) => Bins::linspace(range, *n_bins),
            Binning::Edges(edges) => Bins::from_edges(edges.clone()),
        }
    }
}

/// Largest number of bins a [`Binning`] may produce.
///
/// Only occupied bins are ever materialized, so this bounds the bin index
/// arithmetic rather than memory.
pub const MAX_BINS: usize = usize::MAX / 2;

#[derive(Debug, Clone, PartialEq)]
enum Layout {
    /// `n_bins` bins of `width` from `start`; the last one ends at `end`.
    Uniform {
        start: f64,
        width: f64,
        n_bins: usize,
        end: f64,
    },
    Edges(Vec<f64>),
}

/// Bins over the position axis.
///
/// Bin `k` covers `[lo_k, hi_k)`, except the last bin, which also includes
/// its right edge. Positions outside the outermost edges belong to no bin.
/// Uniform bins are located arithmetically, so memory use does not grow
/// with their count.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    layout: Layout,
}

impl Bins {
    pub fn from_edges(edges: Vec<f64>) -> Result<Self, RecalError> {
        Self::check_edges(&edges)?;
        Ok(Self {
            layout: Layout::Edges(edges),
        })
    }

    fn check_edges(edges: &[f64]) -> Result<(), RecalError> {
        if edges.len() < 2
            || edges.iter().any(|e| !e.is_finite())
            || edges.windows(2).any(|w| w[1] <= w[0])
        {
            return Err(RecalError::InvalidEdges);
        }
        Ok(())
    }

    /// `n_bins` equal-width bins spanning exactly `range`.
    pub fn linspace(range: (f64, f64), n_bins: usize) -> Result<Self, RecalError> {
        if n_bins == 0 {
            return Err(RecalError::ZeroBins);
        }
        let (min, max) = range;
        if !(max > min) || !min.is_finite() || !max.is_finite() {
            return Err(RecalError::ZeroRange { min, max });
        }
        let width = (max - min) / n_bins as f64;
        if n_bins > MAX_BINS || !(width > 0.0 && width.is_finite()) {
            return Err(RecalError::TooManyBins { limit: MAX_BINS });
        }
        Ok(Self {
            layout: Layout::Uniform {
                start: min,
                width,
                n_bins,
                end: max,
            },
        })
    }

    /// Contiguous bins of `width` starting at `range.0` and covering `range.1`.
    ///
    /// A zero-width range is valid here and produces a single bin.
    pub fn with_width(range: (f64, f64), width: f64) -> Result<Self, RecalError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(RecalError::InvalidBinWidth(width));
        }
        let (min, max) = range;
        if !(max >= min) || !min.is_finite() || !max.is_finite() {
            return Err(RecalError::ZeroRange { min, max });
        }
        // NaN and infinity fail the comparison too.
        let full_bins = ((max - min) / width).floor();
        if !(full_bins < MAX_BINS as f64) {
            return Err(RecalError::TooManyBins { limit: MAX_BINS });
        }
        let n_bins = full_bins as usize + 1;
        Ok(Self {
            layout: Layout::Uniform {
                start: min,
                width,
                n_bins,
                end: (min + n_bins as f64 * width).max(max),
            },
        })
    }

    /// Bins sharing one geometry over the union range of several peak sets.
    ///
    /// Returns `Ok(None)` when every peak set is empty.
    pub fn spanning(binning: &Binning, peak_sets: &[&PeakSet]) -> Result<Option<Self>, RecalError> {
        binning.validate()?;
        let range = peak_sets
            .iter()
            .filter_map(|p| p.position_range())
            .reduce(|(lo1, hi1), (lo2, hi2)| (lo1.min(lo2), hi1.max(hi2)));
        match range {
            Some(range) => binning.build(range).map(Some),
            None => Ok(None),
        }
    }

    pub fn n_bins(&self) -> usize {
        match &self.layout {
            Layout::Uniform { n_bins, .. } => *n_bins,
            Layout::Edges(edges) => edges.len() - 1,
        }
    }

    /// Lower and upper edge of `bin`.
    pub fn bounds(&self, bin: usize) -> Option<(f64, f64)> {
        match &self.layout {
            Layout::Uniform {
                start,
                width,
                n_bins,
                end,
            } => {
                if bin >= *n_bins {
                    return None;
                }
                let hi = if bin + 1 == *n_bins {
                    *end
                } else {
                    start + (bin + 1) as f64 * width
                };
                Some((start + bin as f64 * width, hi))
            }
            Layout::Edges(edges) => edges
                .get(bin)
                .zip(edges.get(bin + 1))
                .map(|(&lo, &hi)| (lo, hi)),
        }
    }

    /// Index of the bin holding `position`, if any.
    pub fn bin_of(&self, position: f64) -> Option<usize> {
        match &self.layout {
            Layout::Uniform {
                start,
                width,
                n_bins,
                end,
            } => {
                if !(position >= *start && position <= *end) {
                    return None;
                }
                let bin = ((position - start) / width).floor() as usize;
                Some(bin.min(n_bins - 1))
            }
            Layout::Edges(edges) => {
                let first = edges[0];
                let last = edges[edges.len() - 1];
                if !(position >= first && position <= last) {
                    return None;
                }
                if position == last {
                    return Some(edges.len() - 2);
                }
                Some(edges.partition_point(|&e| e <= position) - 1)
            }
        }
    }

    /// Indices of `positions` grouped by bin, occupied bins only, in bin order.
    ///
    /// Also returns how many positions fell outside every bin.
    pub fn group(&self, positions: &[f64]) -> (BTreeMap<usize, Vec<usize>>, usize) {
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut outside = 0;
        for (i, &position) in positions.iter().enumerate() {
            match self.bin_of(position) {
                Some(bin) => members.entry(bin).or_default().push(i),
                None => outside += 1,
            }
        }
        (members, outside)
    }
}

/// Indices of the `n` most intense peaks; ties keep the lower index.
fn most_intense(peaks: &PeakSet, candidates: &[usize], n: usize) -> Vec<usize> {
    let intensities = peaks.intensities();
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|&a, &b| intensities[b].total_cmp(&intensities[a]));
    ranked.truncate(n);
    ranked
}

/// Keeps the `n` most intense peaks, returned in position order.
///
/// When the set holds `n` or fewer peaks all of them are returned, still
/// sorted by position.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn top_n(peaks: &PeakSet, n: usize) -> PeakSet {
    if peaks.len() <= n {
        return peaks.sorted_by_position();
    }
    let all: Vec<usize> = (0..peaks.len()).collect();
    let mut keep = most_intense(peaks, &all, n);
    keep.sort_unstable();
    let positions = peaks.positions();
    keep.sort_by(|&a, &b| positions[a].total_cmp(&positions[b]));
    peaks.select(&keep)
}

/// Keeps at most `max_per_chunk` peaks per bin, the most intense ones.
///
/// Bins holding `max_per_chunk` or fewer peaks are kept whole. The output is
/// in bin order and keeps the input order within each bin, so it is only
/// globally sorted when the input was. Peaks outside the bins are dropped.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn select_per_chunk_in(peaks: &PeakSet, max_per_chunk: usize, bins: &Bins) -> PeakSet {
    let (members, dropped) = bins.group(peaks.positions());
    if dropped > 0 {
        debug!(
            "Dropped {} of {} peaks outside the bin edges",
            dropped,
            peaks.len()
        );
    }

    let mut keep = Vec::with_capacity(peaks.len());
    for bin in members.values() {
        if bin.len() <= max_per_chunk {
            keep.extend_from_slice(bin);
        } else {
            let mut top = most_intense(peaks, bin, max_per_chunk);
            top.sort_unstable();
            keep.extend(top);
        }
    }
    peaks.select(&keep)
}

/// Chunked selection with bins derived from the peaks' own position range.
///
/// An empty peak set yields an empty selection once the binning parameters
/// have been validated.
pub fn select_per_chunk(
    peaks: &PeakSet,
    max_per_chunk: usize,
    binning: &Binning,
) -> Result<PeakSet, RecalError> {
    match Bins::spanning(binning, &[peaks])? {
        Some(bins) => Ok(select_per_chunk_in(peaks, max_per_chunk, &bins)),
        None => Ok(PeakSet::default()),
    }
}
