use crate::RecalError;
use serde::{
    Deserialize,
    Serialize,
};

/// A single centroided peak.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Peak {
    pub position: f64,
    pub intensity: f64,
}

/// Column-major peak list (positions and intensities of equal length).
///
/// Every constructor validates its input, so any `PeakSet` in hand has
/// finite positions and finite, non-negative intensities. Order is whatever
/// the caller supplied; components that need position order sort a copy.
///
/// Serializes as `{"positions": [...], "intensities": [...]}`, and
/// `{"mz": [...], "intensity": [...]}` is accepted when reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawPeakSet")]
pub struct PeakSet {
    positions: Vec<f64>,
    intensities: Vec<f64>,
}

#[derive(Deserialize)]
struct RawPeakSet {
    #[serde(alias = "mz")]
    positions: Vec<f64>,
    #[serde(alias = "intensity")]
    intensities: Vec<f64>,
}

impl TryFrom<RawPeakSet> for PeakSet {
    type Error = RecalError;

    fn try_from(raw: RawPeakSet) -> Result<Self, Self::Error> {
        PeakSet::new(raw.positions, raw.intensities)
    }
}

impl PeakSet {
    pub fn new(positions: Vec<f64>, intensities: Vec<f64>) -> Result<Self, RecalError> {
        if positions.len() != intensities.len() {
            return Err(RecalError::LengthMismatch {
                positions: positions.len(),
                intensities: intensities.len(),
            });
        }
        if let Some((index, &value)) = positions.iter().enumerate().find(|(_, x)| !x.is_finite())
        {
            return Err(RecalError::NonFinitePosition { index, value });
        }
        if let Some((index, &value)) = intensities
            .iter()
            .enumerate()
            .find(|(_, x)| !x.is_finite() || **x < 0.0)
        {
            return Err(RecalError::InvalidIntensity { index, value });
        }

        Ok(Self {
            positions,
            intensities,
        })
    }

    pub fn from_peaks(peaks: impl IntoIterator<Item = Peak>) -> Result<Self, RecalError> {
        let (positions, intensities) = peaks
            .into_iter()
            .map(|p| (p.position, p.intensity))
            .unzip();
        Self::new(positions, intensities)
    }

    /// Builds a subset from indices that are known to be valid.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            positions: indices.iter().map(|&i| self.positions[i]).collect(),
            intensities: indices.iter().map(|&i| self.intensities[i]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn get(&self, index: usize) -> Option<Peak> {
        Some(Peak {
            position: *self.positions.get(index)?,
            intensity: self.intensities[index],
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Peak> + '_ {
        self.positions
            .iter()
            .zip(self.intensities.iter())
            .map(|(&position, &intensity)| Peak {
                position,
                intensity,
            })
    }

    /// Smallest and largest position, `None` for an empty set.
    pub fn position_range(&self) -> Option<(f64, f64)> {
        self.positions.iter().fold(None, |acc, &x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
    }

    /// Indices that sort the set by position (stable).
    pub(crate) fn position_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.positions[a].total_cmp(&self.positions[b]));
        order
    }

    /// Returns a copy sorted by position.
    pub fn sorted_by_position(&self) -> Self {
        self.select(&self.position_order())
    }
}
