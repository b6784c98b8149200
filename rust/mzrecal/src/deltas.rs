//! Positional deltas between matched or nearest values.

use crate::matching::{
    DistanceMetric,
    MatchSet,
    match_mutual_nearest,
};
use crate::nearest::nearest_values;
use crate::{
    PeakSet,
    RecalError,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Unit of a reported delta.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DeltaUnit {
    /// Parts per million of a normalizing position.
    #[default]
    Ppm,
    /// Same unit as the positions.
    Absolute,
}

impl DeltaUnit {
    /// Expresses `delta` in this unit, normalizing by `base` for ppm.
    pub fn scale(&self, delta: f64, base: f64) -> f64 {
        match self {
            DeltaUnit::Ppm => 1e6 * delta / base,
            DeltaUnit::Absolute => delta,
        }
    }
}

/// Dense deltas for a match set, aligned to the reference index space.
///
/// Entry `j` is `target - reference` for the target peak matched to
/// reference peak `j` (ppm relative to the reference position), or NaN when
/// reference peak `j` has no match.
///
/// # Panics
/// Panics if `matches` holds indices outside `target` or `reference`, which
/// cannot happen when it was computed from these two peak sets.
pub fn deltas_from_matches(
    target: &PeakSet,
    reference: &PeakSet,
    matches: &MatchSet,
    unit: DeltaUnit,
) -> Vec<f64> {
    let mut out = vec![f64::NAN; reference.len()];
    for pair in matches.iter() {
        let t = target.positions()[pair.target];
        let r = reference.positions()[pair.reference];
        out[pair.reference] = unit.scale(t - r, r);
    }
    out
}

/// Matches on position and intensity, then reports `reference - target`.
///
/// Aligned to the reference index space like [`deltas_from_matches`], with
/// the opposite sign; ppm values are relative to the matched reference
/// position.
pub fn deltas_intensity_aware(target: &PeakSet, reference: &PeakSet, unit: DeltaUnit) -> Vec<f64> {
    let matches = match_mutual_nearest(target, reference, DistanceMetric::PositionIntensity);
    let mut out = vec![f64::NAN; reference.len()];
    for pair in matches.iter() {
        let t = target.positions()[pair.target];
        let r = reference.positions()[pair.reference];
        out[pair.reference] = unit.scale(r - t, r);
    }
    out
}

/// For every query, the delta to the nearest value of a sorted reference.
///
/// Reports `query - nearest`, in ppm relative to the query. Used to check
/// single values against a lookup array rather than two peak sets.
///
/// # Example
/// ```
/// use mzrecal::{
///     DeltaUnit,
///     deltas_nearest,
/// };
///
/// let deltas = deltas_nearest(&[100.0, 200.0], &[100.5, 199.0], DeltaUnit::Absolute).unwrap();
/// assert_eq!(deltas, vec![0.5, -1.0]);
/// ```
pub fn deltas_nearest(
    reference_sorted: &[f64],
    queries: &[f64],
    unit: DeltaUnit,
) -> Result<Vec<f64>, RecalError> {
    let (_, nearest) = nearest_values(reference_sorted, queries)?;
    Ok(queries
        .iter()
        .zip(nearest)
        .map(|(&q, found)| unit.scale(q - found, q))
        .collect())
}

/// Gaps between consecutive values of the sorted union of two arrays.
///
/// ppm values are relative to the upper value of each gap. This is a coarse
/// spacing diagnostic, not a matching operation.
pub fn deltas_sorted_gap(values1: &[f64], values2: &[f64], unit: DeltaUnit) -> Vec<f64> {
    let mut merged: Vec<f64> = values1.iter().chain(values2.iter()).copied().collect();
    merged.sort_by(|a, b| a.total_cmp(b));
    merged
        .windows(2)
        .map(|w| unit.scale(w[1] - w[0], w[1]))
        .collect()
}
