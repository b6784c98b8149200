//! Robust estimation of a single linear shift between two spectra.

use crate::deltas::{
    DeltaUnit,
    deltas_from_matches,
};
use crate::downselect::{
    Binning,
    Bins,
    select_per_chunk_in,
    top_n,
};
use crate::matching::{
    DistanceMetric,
    match_mutual_nearest,
};
use crate::{
    PeakSet,
    RecalError,
    plotting,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Width of the sorted-delta diagnostic plot.
const DELTA_PLOT_WIDTH: usize = 60;

/// Height of the sorted-delta diagnostic plot.
const DELTA_PLOT_HEIGHT: usize = 20;

/// Settings for [`estimate_linear_shift`].
///
/// Missing fields take their default when deserializing:
/// ```
/// use mzrecal::{
///     Binning,
///     ShiftConfig,
/// };
///
/// let config: ShiftConfig = serde_json::from_str(r#"{"max_peaks": 500}"#).unwrap();
/// assert_eq!(config.max_peaks, Some(500));
/// assert_eq!(config.binning, Binning::Width(0.2));
/// assert_eq!(config.max_per_chunk, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Chunks shared by both spectra, built over their joint position range.
    pub binning: Binning,
    /// Peaks kept per chunk and spectrum (the most intense ones).
    pub max_per_chunk: usize,
    /// Optional cap on the peaks kept per spectrum after chunking.
    pub max_peaks: Option<usize>,
    pub metric: DistanceMetric,
    pub unit: DeltaUnit,
    /// Print the sorted delta curve to the terminal.
    pub plot: bool,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            binning: Binning::default(),
            max_per_chunk: 1,
            max_peaks: None,
            metric: DistanceMetric::PositionIntensity,
            unit: DeltaUnit::Ppm,
            plot: false,
        }
    }
}

/// Result of a shift estimation.
///
/// `shift` is expressed in `unit`; subtracting it from the spectrum's
/// positions (as ppm of each position, or absolutely) aligns the spectrum to
/// the reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftEstimate {
    pub shift: f64,
    pub unit: DeltaUnit,
    /// Spectrum peaks left after down-selection (all of them when either
    /// side was empty).
    pub n_spectrum_peaks: usize,
    /// Reference peaks left after down-selection, counted like
    /// `n_spectrum_peaks`.
    pub n_reference_peaks: usize,
    pub n_matches: usize,
    /// `reference - spectrum` per matched pair, ascending.
    pub sorted_deltas: Vec<f64>,
}

impl ShiftEstimate {
    /// Zero shift without matching, reporting the peak counts as given.
    fn unmatched(spectrum: &PeakSet, reference: &PeakSet, unit: DeltaUnit) -> Self {
        Self {
            shift: 0.0,
            unit,
            n_spectrum_peaks: spectrum.len(),
            n_reference_peaks: reference.len(),
            n_matches: 0,
            sorted_deltas: Vec::new(),
        }
    }
}

/// Median of an ascending slice; the mean of the middle pair for even lengths.
pub fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

fn downselect(peaks: &PeakSet, bins: &Bins, config: &ShiftConfig) -> PeakSet {
    let chunked = select_per_chunk_in(peaks, config.max_per_chunk, bins);
    match config.max_peaks {
        Some(n) => top_n(&chunked, n),
        None => chunked.sorted_by_position(),
    }
}

/// Estimates the offset of `spectrum` relative to `reference`.
///
/// Both spectra are chunked over their joint position range and reduced to
/// their most intense peaks per chunk (then optionally capped), so that dense
/// regions do not dominate. The survivors are matched by mutual nearest
/// neighbours and the shift is the negated median of the matched
/// `reference - spectrum` deltas. With no matches the shift is 0.
///
/// # Example
/// ```
/// use mzrecal::{
///     PeakSet,
///     ShiftConfig,
///     estimate_linear_shift,
/// };
///
/// let spectrum = PeakSet::new(vec![100.0, 200.0, 300.0], vec![1.0, 2.0, 3.0]).unwrap();
/// let estimate = estimate_linear_shift(&spectrum, &spectrum, &ShiftConfig::default()).unwrap();
/// assert_eq!(estimate.shift, 0.0);
/// assert_eq!(estimate.n_matches, 3);
/// ```
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn estimate_linear_shift(
    spectrum: &PeakSet,
    reference: &PeakSet,
    config: &ShiftConfig,
) -> Result<ShiftEstimate, RecalError> {
    config.binning.validate()?;
    if spectrum.is_empty() || reference.is_empty() {
        warn!(
            "Cannot estimate a shift with an empty peak list (spectrum: {}, reference: {})",
            spectrum.len(),
            reference.len()
        );
        return Ok(ShiftEstimate::unmatched(spectrum, reference, config.unit));
    }
    let bins = match Bins::spanning(&config.binning, &[spectrum, reference])? {
        Some(bins) => bins,
        None => return Ok(ShiftEstimate::unmatched(spectrum, reference, config.unit)),
    };
    debug!("Using {} shared bins", bins.n_bins());

    let spectrum = downselect(spectrum, &bins, config);
    let reference = downselect(reference, &bins, config);

    // Reference in the target role aligns the deltas to the spectrum.
    let matches = match_mutual_nearest(&reference, &spectrum, config.metric);
    let mut sorted_deltas: Vec<f64> =
        deltas_from_matches(&reference, &spectrum, &matches, config.unit)
            .into_iter()
            .filter(|d| !d.is_nan())
            .collect();
    sorted_deltas.sort_by(|a, b| a.total_cmp(b));

    let shift = match median_of_sorted(&sorted_deltas) {
        Some(m) if m != 0.0 => -m,
        _ => 0.0,
    };
    info!(
        "Matched {} pairs between {} spectrum and {} reference peaks, shift: {} {:?}",
        matches.len(),
        spectrum.len(),
        reference.len(),
        shift,
        config.unit
    );

    if config.plot && !sorted_deltas.is_empty() {
        plotting::plot_delta_curve(
            &sorted_deltas,
            -shift,
            DELTA_PLOT_WIDTH,
            DELTA_PLOT_HEIGHT,
        );
    }

    Ok(ShiftEstimate {
        shift,
        unit: config.unit,
        n_spectrum_peaks: spectrum.len(),
        n_reference_peaks: reference.len(),
        n_matches: matches.len(),
        sorted_deltas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(positions: &[f64], intensities: &[f64]) -> PeakSet {
        PeakSet::new(positions.to_vec(), intensities.to_vec()).unwrap()
    }

    #[test]
    fn test_median_of_sorted() {
        assert_eq!(median_of_sorted(&[]), None);
        assert_eq!(median_of_sorted(&[3.0]), Some(3.0));
        assert_eq!(median_of_sorted(&[1.0, 2.0, 10.0]), Some(2.0));
        assert_eq!(median_of_sorted(&[1.0, 2.0, 4.0, 10.0]), Some(3.0));
    }

    #[test]
    fn test_known_ppm_offset() {
        let spectrum = peaks(&[100.0, 200.0], &[10.0, 5.0]);
        let reference = peaks(&[100.001, 200.002], &[10.0, 5.0]);
        let estimate =
            estimate_linear_shift(&spectrum, &reference, &ShiftConfig::default()).unwrap();
        assert_eq!(estimate.n_matches, 2);
        assert!((estimate.shift + 10.0).abs() < 1e-6, "{:?}", estimate);
        assert!(estimate.sorted_deltas.iter().all(|d| (d - 10.0).abs() < 1e-6));
    }

    #[test]
    fn test_absolute_offset_and_outlier() {
        // Four peaks agree on +0.05, one matched pair is off by +0.15.
        let spectrum = peaks(
            &[100.0, 150.0, 200.0, 250.0, 300.0],
            &[5.0, 5.0, 5.0, 5.0, 5.0],
        );
        let reference = peaks(
            &[100.05, 150.05, 200.05, 250.15, 300.05],
            &[5.0, 5.0, 5.0, 5.0, 5.0],
        );
        let config = ShiftConfig {
            unit: DeltaUnit::Absolute,
            ..Default::default()
        };
        let estimate = estimate_linear_shift(&spectrum, &reference, &config).unwrap();
        assert_eq!(estimate.n_matches, 5);
        assert!((estimate.shift + 0.05).abs() < 1e-9, "{:?}", estimate);
    }

    #[test]
    fn test_empty_inputs_give_zero_shift() {
        let reference = peaks(&[100.0, 200.0], &[1.0, 1.0]);
        let config = ShiftConfig::default();
        let estimate = estimate_linear_shift(&PeakSet::default(), &reference, &config).unwrap();
        assert_eq!(estimate.shift, 0.0);
        assert_eq!(estimate.n_matches, 0);
        assert_eq!(estimate.n_spectrum_peaks, 0);
        assert_eq!(estimate.n_reference_peaks, 2);
        let estimate = estimate_linear_shift(&reference, &PeakSet::default(), &config).unwrap();
        assert_eq!(estimate.shift, 0.0);
        assert_eq!(estimate.n_spectrum_peaks, 2);
        assert_eq!(estimate.n_reference_peaks, 0);
    }

    #[test]
    fn test_wide_position_range_does_not_panic() {
        let spectrum = peaks(&[0.0, 1e18], &[1.0, 1.0]);
        let estimate =
            estimate_linear_shift(&spectrum, &spectrum, &ShiftConfig::default()).unwrap();
        assert_eq!(estimate.n_matches, 2);
        assert_eq!(estimate.shift, 0.0);

        let config = ShiftConfig {
            binning: Binning::Width(1e-300),
            ..Default::default()
        };
        let spectrum = peaks(&[100.0, 2000.0], &[1.0, 1.0]);
        assert_eq!(
            estimate_linear_shift(&spectrum, &spectrum, &config),
            Err(RecalError::TooManyBins {
                limit: crate::downselect::MAX_BINS
            })
        );
    }

    #[test]
    fn test_invalid_binning_is_reported() {
        let reference = peaks(&[100.0, 200.0], &[1.0, 1.0]);
        let config = ShiftConfig {
            binning: Binning::Width(-1.0),
            ..Default::default()
        };
        assert_eq!(
            estimate_linear_shift(&reference, &reference, &config),
            Err(RecalError::InvalidBinWidth(-1.0))
        );
    }

    #[test]
    fn test_dense_cluster_is_thinned_per_chunk() {
        // Ten peaks crowd one 0.2-wide chunk; only the most intense survives.
        let mut positions: Vec<f64> = (0..10).map(|i| 100.0 + i as f64 * 0.01).collect();
        let mut intensities: Vec<f64> = (0..10).map(|i| 1.0 + i as f64).collect();
        positions.push(500.0);
        intensities.push(3.0);
        let spectrum = peaks(&positions, &intensities);
        let estimate =
            estimate_linear_shift(&spectrum, &spectrum, &ShiftConfig::default()).unwrap();
        assert_eq!(estimate.n_spectrum_peaks, 2);
        assert_eq!(estimate.n_matches, 2);
        assert_eq!(estimate.shift, 0.0);
    }

    #[test]
    fn test_max_peaks_caps_selection() {
        let positions: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let intensities: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let spectrum = peaks(&positions, &intensities);
        let config = ShiftConfig {
            max_peaks: Some(5),
            ..Default::default()
        };
        let estimate = estimate_linear_shift(&spectrum, &spectrum, &config).unwrap();
        assert_eq!(estimate.n_spectrum_peaks, 5);
        assert_eq!(estimate.n_reference_peaks, 5);
        assert_eq!(estimate.n_matches, 5);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ShiftConfig {
            binning: Binning::Count(25),
            max_per_chunk: 3,
            max_peaks: Some(200),
            metric: DistanceMetric::Position,
            unit: DeltaUnit::Absolute,
            plot: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ShiftConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let defaulted: ShiftConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted, ShiftConfig::default());
    }
}
