//! Core data types used across the pipeline

use chrono::NaiveDate;
use itertools::{EitherOrBoth, Itertools};
use statrs::statistics::Statistics;
use std::collections::BTreeSet;

use crate::error::{PipelineError, Result};

/// Date-indexed scalar series
///
/// Dates are strictly increasing and unique. A missing observation is stored
/// as `NaN`. Every transform returns a new series; nothing mutates in place.
///
/// Prices, rates, implied volatility, returns and weights are all carried in
/// this one type.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from already ordered observations
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(PipelineError::malformed(
                name,
                format!(
                    "length mismatch: {} dates vs {} values",
                    dates.len(),
                    values.len()
                ),
            ));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            let reason = if w[1] == w[0] {
                format!("duplicate date {}", w[0])
            } else {
                format!("dates not increasing: {} follows {}", w[1], w[0])
            };
            return Err(PipelineError::malformed(name, reason));
        }
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    /// Create a series from observations in any order, rejecting duplicate dates
    pub fn from_unsorted(name: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        points.sort_by_key(|(d, _)| *d);
        let (dates, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        Self::new(name, dates, values)
    }

    /// Series with no observations
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dates: Vec::new(),
            values: Vec::new(),
        }
    }

    // Internal constructor for transforms that preserve ordering.
    fn from_parts(name: String, dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            name,
            dates,
            values,
        }
    }

    fn from_points(name: String, points: impl Iterator<Item = (NaiveDate, f64)>) -> Self {
        let (dates, values): (Vec<_>, Vec<_>) = points.unzip();
        Self::from_parts(name, dates, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Same observations under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::from_parts(name.into(), self.dates.clone(), self.values.clone())
    }

    /// Apply a function to every value
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_parts(
            self.name.clone(),
            self.dates.clone(),
            self.values.iter().map(|&v| f(v)).collect(),
        )
    }

    /// Multiply every observation by a single factor
    pub fn scale(&self, k: f64) -> Self {
        self.map(|v| v * k)
    }

    /// `ln(1 + r)` for every observation
    pub fn log1p(&self) -> Self {
        self.map(f64::ln_1p)
    }

    /// Period-over-period percentage change along this series' own index
    ///
    /// The first observation has no predecessor and is excluded. A change from
    /// exactly zero to exactly zero is 0; any other change from zero is
    /// infinite and gets removed by [`TimeSeries::drop_missing`].
    pub fn pct_change(&self) -> Self {
        let points = self
            .dates
            .iter()
            .skip(1)
            .zip(self.values.windows(2))
            .map(|(&date, w)| {
                let (prev, cur) = (w[0], w[1]);
                let change = if prev == 0.0 && cur == 0.0 {
                    0.0
                } else {
                    cur / prev - 1.0
                };
                (date, change)
            });
        Self::from_points(self.name.clone(), points)
    }

    /// Lag values by `periods` observations along this series' own index
    ///
    /// The value on date `t` becomes the value observed `periods` rows
    /// earlier. The first `periods` dates have no lagged value and are
    /// excluded.
    pub fn shift(&self, periods: usize) -> Self {
        if periods >= self.len() {
            return Self::empty(self.name.clone());
        }
        Self::from_parts(
            self.name.clone(),
            self.dates[periods..].to_vec(),
            self.values[..self.len() - periods].to_vec(),
        )
    }

    /// Drop missing (`NaN`) and infinite observations
    pub fn drop_missing(&self) -> Self {
        Self::from_points(
            self.name.clone(),
            self.iter().filter(|(_, v)| v.is_finite()),
        )
    }

    /// Combine two series on their common dates
    ///
    /// This is an inner join on the date index; unmatched dates on either side
    /// are dropped. The result keeps this series' name.
    pub fn zip_with(&self, other: &TimeSeries, f: impl Fn(f64, f64) -> f64) -> Self {
        let points = self
            .iter()
            .merge_join_by(other.iter(), |a, b| a.0.cmp(&b.0))
            .filter_map(|pair| match pair {
                EitherOrBoth::Both((date, a), (_, b)) => Some((date, f(a, b))),
                _ => None,
            });
        Self::from_points(self.name.clone(), points)
    }

    pub fn sub(&self, other: &TimeSeries) -> Self {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &TimeSeries) -> Self {
        self.zip_with(other, |a, b| a * b)
    }

    /// Keep only the dates that also appear in `other`
    pub fn restrict_to(&self, other: &TimeSeries) -> Self {
        self.zip_with(other, |a, _| a)
    }

    /// Observations within `[start, end]`, either bound optional
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self::from_points(
            self.name.clone(),
            self.iter().filter(|(d, _)| {
                start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e)
            }),
        )
    }

    /// Restrict several series to the dates common to all of them
    pub fn intersect(series: &[&TimeSeries]) -> Vec<TimeSeries> {
        let Some((first, rest)) = series.split_first() else {
            return Vec::new();
        };
        let common = rest.iter().fold(
            first.dates.iter().copied().collect::<BTreeSet<_>>(),
            |acc, s| {
                let dates: BTreeSet<NaiveDate> = s.dates.iter().copied().collect();
                acc.intersection(&dates).copied().collect()
            },
        );
        series
            .iter()
            .map(|s| {
                Self::from_points(
                    s.name.clone(),
                    s.iter().filter(|(d, _)| common.contains(d)),
                )
            })
            .collect()
    }

    /// Arithmetic mean of the values (`NaN` when empty)
    pub fn mean(&self) -> f64 {
        self.values.iter().mean()
    }

    /// Sample standard deviation (n - 1), `NaN` with fewer than 2 values
    pub fn std_dev(&self) -> f64 {
        self.values.iter().std_dev()
    }
}
