//! Summary statistics across simulation runs.

use crate::schema::Statistic;

/// Mean and quartiles of one group of per-run values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Summary {
    /// Summarise a sample; `None` for an empty one
    ///
    /// NaN values are ignored. The slice is reordered.
    #[must_use]
    pub fn from_values(values: &mut Vec<f64>) -> Option<Self> {
        values.retain(|v| !v.is_nan());
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        Some(Self {
            mean: mean(values),
            median: quantile_sorted(values, 0.5),
            q25: quantile_sorted(values, 0.25),
            q75: quantile_sorted(values, 0.75),
        })
    }

    #[must_use]
    pub fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Mean => self.mean,
            Statistic::Median => self.median,
            Statistic::Q25 => self.q25,
            Statistic::Q75 => self.q75,
        }
    }

    /// Values in [`Statistic::ALL`] order
    #[must_use]
    pub fn values(&self) -> [f64; 4] {
        Statistic::ALL.map(|s| self.get(s))
    }
}

/// Arithmetic mean of a non-empty sample
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Quantile `q` of an ascending, non-empty sample.
///
/// Linear interpolation between the closest ranks: the quantile sits at
/// position `q * (n - 1)` in the sorted sample.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
