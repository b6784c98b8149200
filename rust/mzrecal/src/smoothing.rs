use crate::RecalError;
use crate::downselect::Bins;
use crate::shift::median_of_sorted;

/// Most points [`moving_median`] will report.
pub const MAX_CURVE_POINTS: usize = 1 << 24;

/// Binned moving median of `y` over `x`.
///
/// `x` is split into contiguous bins of `window` width starting at its
/// minimum (same edge convention as [`Bins`]). Returns the bin centres and
/// the median of the `y` values falling in each bin, NaN for empty bins.
/// Spans needing more than [`MAX_CURVE_POINTS`] bins are rejected with
/// [`RecalError::TooManyBins`].
///
/// # Example
/// ```
/// use mzrecal::moving_median;
///
/// let x = [0.0, 0.25, 0.5, 1.5, 1.75];
/// let y = [1.0, 9.0, 2.0, 4.0, 6.0];
/// let (centres, medians) = moving_median(&x, &y, 1.0).unwrap();
/// assert_eq!(centres, vec![0.5, 1.5]);
/// assert_eq!(medians, vec![2.0, 5.0]);
/// ```
pub fn moving_median(x: &[f64], y: &[f64], window: f64) -> Result<(Vec<f64>, Vec<f64>), RecalError> {
    if x.len() != y.len() {
        return Err(RecalError::LengthMismatch {
            positions: x.len(),
            intensities: y.len(),
        });
    }
    if let Some((index, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(RecalError::NonFinitePosition { index, value });
    }
    let range = x
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or(RecalError::EmptyInput)?;
    let bins = Bins::with_width(range, window)?;

    if bins.n_bins() > MAX_CURVE_POINTS {
        return Err(RecalError::TooManyBins {
            limit: MAX_CURVE_POINTS,
        });
    }
    let (members, _) = bins.group(x);

    let mut centres = Vec::with_capacity(bins.n_bins());
    let mut medians = vec![f64::NAN; bins.n_bins()];
    for bin in 0..bins.n_bins() {
        if let Some((lo, _)) = bins.bounds(bin) {
            centres.push(lo + window / 2.0);
        }
    }
    for (bin, indices) in members {
        let mut values: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        if let Some(median) = median_of_sorted(&values) {
            medians[bin] = median;
        }
    }
    Ok((centres, medians))
}
