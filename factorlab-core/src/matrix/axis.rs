//! Time and asset axes.
//!
//! The time axis is an ordered index (strictly increasing dates). The asset axis is an
//! ordered set: identifiers are kept sorted so two axes with the same content always
//! share the same column order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Axis, PipelineError, Result};

// ─── TimeAxis ────────────────────────────────────────────────────────

/// Strictly increasing sequence of dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct TimeAxis {
    dates: Vec<NaiveDate>,
}

impl TimeAxis {
    /// Build a time axis, rejecting unsorted or duplicated dates.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidMatrix(format!(
                "time axis must be strictly increasing ({} is followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self { dates })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// The first `n` dates (or all of them if `n` exceeds the length).
    pub fn head(&self, n: usize) -> Self {
        Self {
            dates: self.dates[..n.min(self.dates.len())].to_vec(),
        }
    }

    /// Sorted union of two axes.
    pub fn union(&self, other: &TimeAxis) -> Self {
        let mut dates = Vec::with_capacity(self.len().max(other.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.dates.len() && j < other.dates.len() {
            let (a, b) = (self.dates[i], other.dates[j]);
            if a < b {
                dates.push(a);
                i += 1;
            } else if b < a {
                dates.push(b);
                j += 1;
            } else {
                dates.push(a);
                i += 1;
                j += 1;
            }
        }
        dates.extend_from_slice(&self.dates[i..]);
        dates.extend_from_slice(&other.dates[j..]);
        Self { dates }
    }

    /// Fail with an alignment error unless both axes hold the same dates.
    pub fn check_same(&self, other: &TimeAxis) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(PipelineError::Alignment {
            axis: Axis::Time,
            missing: sorted_difference(&self.dates, &other.dates)
                .map(|d| d.to_string())
                .collect(),
            extra: sorted_difference(&other.dates, &self.dates)
                .map(|d| d.to_string())
                .collect(),
        })
    }
}

impl TryFrom<Vec<NaiveDate>> for TimeAxis {
    type Error = PipelineError;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self> {
        Self::new(dates)
    }
}

impl From<TimeAxis> for Vec<NaiveDate> {
    fn from(axis: TimeAxis) -> Self {
        axis.dates
    }
}

// ─── AssetAxis ───────────────────────────────────────────────────────

/// Sorted set of asset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AssetAxis {
    assets: Vec<String>,
}

impl AssetAxis {
    /// Build an asset axis from identifiers in any order. Duplicates are rejected.
    pub fn new<I, S>(assets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut assets: Vec<String> = assets.into_iter().map(Into::into).collect();
        assets.sort();
        if let Some(w) = assets.windows(2).find(|w| w[0] == w[1]) {
            return Err(PipelineError::InvalidMatrix(format!(
                "duplicate asset identifier '{}'",
                w[0]
            )));
        }
        Ok(Self { assets })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.assets.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.assets
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.assets.iter().map(String::as_str)
    }

    pub fn position(&self, asset: &str) -> Option<usize> {
        self.assets
            .binary_search_by(|probe| probe.as_str().cmp(asset))
            .ok()
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.position(asset).is_some()
    }

    /// Sorted union of two axes.
    pub fn union(&self, other: &AssetAxis) -> Self {
        let mut assets: Vec<String> = self
            .assets
            .iter()
            .chain(other.assets.iter())
            .cloned()
            .collect();
        assets.sort();
        assets.dedup();
        Self { assets }
    }

    /// Fail with an alignment error unless both axes hold the same identifiers.
    pub fn check_same(&self, other: &AssetAxis) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(PipelineError::Alignment {
            axis: Axis::Asset,
            missing: sorted_difference(&self.assets, &other.assets)
                .cloned()
                .collect(),
            extra: sorted_difference(&other.assets, &self.assets)
                .cloned()
                .collect(),
        })
    }
}

/// Items of sorted `left` that do not appear in sorted `right`.
fn sorted_difference<'a, T: Ord>(left: &'a [T], right: &'a [T]) -> impl Iterator<Item = &'a T> {
    left.iter().filter(move |item| right.binary_search(*item).is_err())
}
