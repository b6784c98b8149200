use crate::RecalError;

/// Finds the entry of a sorted slice closest to `query`.
///
/// `reference` must be sorted ascending. Returns the index and value of the
/// closest entry; when two entries are equally close the lower index wins.
///
/// # Example
/// ```
/// use mzrecal::nearest_value;
///
/// let reference = [1.0, 2.0, 4.0];
/// assert_eq!(nearest_value(&reference, 2.9).unwrap(), (1, 2.0));
/// assert_eq!(nearest_value(&reference, 3.0).unwrap(), (1, 2.0));
/// assert_eq!(nearest_value(&reference, 10.0).unwrap(), (2, 4.0));
/// ```
pub fn nearest_value(reference: &[f64], query: f64) -> Result<(usize, f64), RecalError> {
    if reference.is_empty() {
        return Err(RecalError::EmptyReference);
    }
    let index = nearest_index(reference, query);
    Ok((index, reference[index]))
}

/// Vectorized version of [`nearest_value`]. Queries need not be sorted.
pub fn nearest_values(
    reference: &[f64],
    queries: &[f64],
) -> Result<(Vec<usize>, Vec<f64>), RecalError> {
    if reference.is_empty() {
        return Err(RecalError::EmptyReference);
    }
    Ok(queries
        .iter()
        .map(|&q| {
            let index = nearest_index(reference, q);
            (index, reference[index])
        })
        .unzip())
}

/// Caller guarantees a non-empty reference.
fn nearest_index(reference: &[f64], query: f64) -> usize {
    if reference.len() == 1 {
        return 0;
    }
    // Insertion point, clamped so both neighbours exist.
    let ix = reference
        .partition_point(|&x| x < query)
        .clamp(1, reference.len() - 1);
    let below = (reference[ix - 1] - query).abs();
    let above = (reference[ix] - query).abs();
    let mut best = if above < below { ix } else { ix - 1 };
    // First occurrence of a repeated value.
    while best > 0 && reference[best - 1] == reference[best] {
        best -= 1;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reference_is_rejected() {
        assert_eq!(nearest_value(&[], 1.0), Err(RecalError::EmptyReference));
        assert_eq!(nearest_values(&[], &[1.0]), Err(RecalError::EmptyReference));
    }

    #[test]
    fn test_single_element_reference() {
        assert_eq!(nearest_value(&[5.0], -100.0).unwrap(), (0, 5.0));
        assert_eq!(nearest_value(&[5.0], 100.0).unwrap(), (0, 5.0));
    }

    #[test]
    fn test_ends_are_clamped() {
        let reference = [10.0, 20.0, 30.0];
        assert_eq!(nearest_value(&reference, 0.0).unwrap(), (0, 10.0));
        assert_eq!(nearest_value(&reference, 10.0).unwrap(), (0, 10.0));
        assert_eq!(nearest_value(&reference, 30.0).unwrap(), (2, 30.0));
        assert_eq!(nearest_value(&reference, 99.0).unwrap(), (2, 30.0));
    }

    #[test]
    fn test_ties_go_to_lower_index() {
        let reference = [1.0, 3.0, 5.0];
        assert_eq!(nearest_value(&reference, 2.0).unwrap(), (0, 1.0));
        assert_eq!(nearest_value(&reference, 4.0).unwrap(), (1, 3.0));
    }

    #[test]
    fn test_repeated_values_resolve_to_first() {
        let reference = [1.0, 1.0, 1.0, 2.0];
        assert_eq!(nearest_value(&reference, 1.4).unwrap(), (0, 1.0));
        assert_eq!(nearest_value(&[0.0, 3.0, 3.0], 10.0).unwrap(), (1, 3.0));
    }

    #[test]
    fn test_unsorted_queries() {
        let reference = [1.0, 2.0, 3.0, 4.0];
        let (ixs, vals) = nearest_values(&reference, &[3.9, 0.2, 2.4]).unwrap();
        assert_eq!(ixs, vec![3, 0, 1]);
        assert_eq!(vals, vec![4.0, 1.0, 2.0]);
    }
}
