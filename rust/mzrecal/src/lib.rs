//! Peak matching and linear mass-shift estimation between two spectra.
//!
//! The crate matches peaks of an observed spectrum against a reference
//! spectrum using mutual nearest neighbours and estimates a single robust
//! offset (ppm or absolute) that recalibrates the observed spectrum.
//!
//! ```
//! use mzrecal::{
//!     PeakSet,
//!     ShiftConfig,
//!     estimate_linear_shift,
//! };
//!
//! let observed = PeakSet::new(vec![100.0, 200.0], vec![10.0, 5.0]).unwrap();
//! let reference = PeakSet::new(vec![100.001, 200.002], vec![10.0, 5.0]).unwrap();
//!
//! let estimate = estimate_linear_shift(&observed, &reference, &ShiftConfig::default()).unwrap();
//! assert!((estimate.shift + 10.0).abs() < 1e-6);
//! ```

pub mod deltas;
pub mod downselect;
pub mod matching;
pub mod nearest;
pub mod peaks;
pub mod plotting;
pub mod shift;
pub mod smoothing;

pub use deltas::{
    DeltaUnit,
    deltas_from_matches,
    deltas_intensity_aware,
    deltas_nearest,
    deltas_sorted_gap,
};
pub use downselect::{
    Binning,
    Bins,
    MAX_BINS,
    select_per_chunk,
    select_per_chunk_in,
    top_n,
};
pub use matching::{
    DistanceMetric,
    MatchSet,
    MatchedPair,
    match_mutual_nearest,
};
pub use nearest::{
    nearest_value,
    nearest_values,
};
pub use peaks::{
    Peak,
    PeakSet,
};
pub use shift::{
    ShiftConfig,
    ShiftEstimate,
    estimate_linear_shift,
};
pub use smoothing::moving_median;

/// Errors raised at the boundary of the component receiving bad input.
///
/// Finding no matches is not an error; it yields empty results instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecalError {
    /// Nearest value search was given an empty reference array.
    #[error("reference array is empty")]
    EmptyReference,
    /// Nothing to bin.
    #[error("no values to bin")]
    EmptyInput,
    /// Positions and intensities of a peak set differ in length.
    #[error("got {positions} positions but {intensities} intensities")]
    LengthMismatch {
        positions: usize,
        intensities: usize,
    },
    /// A peak position is NaN or infinite.
    #[error("position at index {index} is not finite: {value}")]
    NonFinitePosition { index: usize, value: f64 },
    /// A peak intensity is negative, NaN or infinite.
    #[error("intensity at index {index} is invalid: {value}")]
    InvalidIntensity { index: usize, value: f64 },
    /// A bin count of zero was requested.
    #[error("requested zero bins")]
    ZeroBins,
    /// A range of zero width cannot be split into bins.
    #[error("cannot bin a zero-width range ({min}, {max})")]
    ZeroRange { min: f64, max: f64 },
    /// Bin widths must be finite and positive.
    #[error("invalid bin width: {0}")]
    InvalidBinWidth(f64),
    /// The range would need more bins than `limit`.
    #[error("binning would need more than {limit} bins")]
    TooManyBins { limit: usize },
    /// Explicit edges need at least two finite, strictly increasing values.
    #[error("bin edges must be at least two finite, strictly increasing values")]
    InvalidEdges,
}
