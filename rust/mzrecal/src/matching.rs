//! Mutual nearest neighbour matching between two peak sets.

use crate::PeakSet;
use serde::{
    Deserialize,
    Serialize,
};

/// Distance used to compare a target peak with a reference peak.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Absolute position difference.
    Position,
    /// Position difference combined with a relative intensity difference.
    ///
    /// `sqrt(dp^2 + di^2)` where `di = (i_t - i_r) / mean(i_t, i_r) / 2`.
    /// Pairs with very different intensities are pushed apart even when
    /// their positions agree.
    #[default]
    PositionIntensity,
}

impl DistanceMetric {
    pub fn distance(&self, target: (f64, f64), reference: (f64, f64)) -> f64 {
        let dpos = (target.0 - reference.0).abs();
        match self {
            DistanceMetric::Position => dpos,
            DistanceMetric::PositionIntensity => {
                let mean = (target.1 + reference.1) / 2.0;
                let dint = if mean > 0.0 {
                    (target.1 - reference.1) / mean / 2.0
                } else {
                    0.0
                };
                dpos.hypot(dint)
            }
        }
    }
}

/// One matched pair, indices into the target and reference peak sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchedPair {
    pub target: usize,
    pub reference: usize,
}

/// Conflict-free set of matched pairs, ordered by target index.
///
/// No target index and no reference index appears more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchSet {
    pairs: Vec<MatchedPair>,
}

impl MatchSet {
    pub fn pairs(&self) -> &[MatchedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MatchedPair> {
        self.pairs.iter()
    }

    /// Same pairs with the target and reference roles exchanged.
    pub fn swapped(&self) -> MatchSet {
        let mut pairs: Vec<MatchedPair> = self
            .pairs
            .iter()
            .map(|p| MatchedPair {
                target: p.reference,
                reference: p.target,
            })
            .collect();
        pairs.sort_unstable();
        MatchSet { pairs }
    }
}

/// Index of the first minimum.
fn first_argmin(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if !(v < b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Pairs every target peak with its nearest reference peak and vice versa,
/// keeping only the pairs on which both directions agree.
///
/// The full `|target| x |reference|` distance matrix is built, so callers
/// should bound both sizes (see [`crate::downselect`]). Ties pick the first
/// minimal index in either direction. An empty input on either side gives an
/// empty match set.
///
/// # Example
/// ```
/// use mzrecal::{
///     DistanceMetric,
///     PeakSet,
///     match_mutual_nearest,
/// };
///
/// let target = PeakSet::new(vec![100.0, 200.0], vec![10.0, 5.0]).unwrap();
/// let reference = PeakSet::new(vec![100.001, 200.002], vec![10.0, 5.0]).unwrap();
///
/// let matches = match_mutual_nearest(&target, &reference, DistanceMetric::Position);
/// let pairs: Vec<_> = matches.iter().map(|p| (p.target, p.reference)).collect();
/// assert_eq!(pairs, vec![(0, 0), (1, 1)]);
/// ```
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn match_mutual_nearest(
    target: &PeakSet,
    reference: &PeakSet,
    metric: DistanceMetric,
) -> MatchSet {
    let n_ref = reference.len();
    if target.is_empty() || reference.is_empty() {
        return MatchSet::default();
    }

    // Row-major, one row per target peak.
    let distances: Vec<f64> = target
        .iter()
        .flat_map(|t| {
            reference
                .iter()
                .map(move |r| metric.distance((t.position, t.intensity), (r.position, r.intensity)))
        })
        .collect();

    let nearest_reference: Vec<usize> = distances
        .chunks_exact(n_ref)
        .filter_map(|row| first_argmin(row.iter().copied()))
        .collect();
    let nearest_target: Vec<usize> = (0..n_ref)
        .filter_map(|j| first_argmin(distances.iter().skip(j).step_by(n_ref).copied()))
        .collect();

    let pairs = nearest_reference
        .into_iter()
        .enumerate()
        .filter(|&(i, j)| nearest_target[j] == i)
        .map(|(target, reference)| MatchedPair { target, reference })
        .collect();

    MatchSet { pairs }
}
