//! Streaming statistics for one metric key within one interval.
//!
//! No raw values are kept: mean and standard deviation are derived from
//! the running count, sum and sum of squares.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Rolled-up view of every value ingested for a key
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateSample {
    /// Number of ingested values
    pub count: u64,
    /// `sum` normalized to one second of interval
    pub rate: f64,
    /// Sum of values
    pub sum: f64,
    /// Sum of squared values
    #[serde(skip)]
    pub sum_sq: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// When a value was last ingested
    #[serde(skip)]
    pub last_updated: Option<SystemTime>,
}

impl Default for AggregateSample {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateSample {
    /// An empty sample
    pub const fn new() -> Self {
        Self {
            count: 0,
            rate: 0.0,
            sum: 0.0,
            sum_sq: 0.0,
            min: 0.0,
            max: 0.0,
            last_updated: None,
        }
    }

    /// Ingest one value, stamping the current time
    #[inline]
    pub fn ingest(&mut self, value: f64, rate_denom: f64) {
        self.ingest_at(value, rate_denom, SystemTime::now());
    }

    /// Ingest one value observed at `now`
    #[inline]
    pub fn ingest_at(&mut self, value: f64, rate_denom: f64, now: SystemTime) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        if value < self.min || self.count == 1 {
            self.min = value;
        }
        if value > self.max || self.count == 1 {
            self.max = value;
        }
        self.rate = self.sum / rate_denom;
        self.last_updated = Some(now);
    }

    /// Arithmetic mean, 0 when nothing was ingested
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Sample standard deviation, 0 for fewer than two values
    pub fn stddev(&self) -> f64 {
        if self.count <= 1 {
            return 0.0;
        }
        let n = self.count as f64;
        let num = n * self.sum_sq - self.sum * self.sum;
        let div = n * (n - 1.0);
        // Rounding can push a zero-variance numerator slightly negative
        (num / div).max(0.0).sqrt()
    }
}

impl fmt::Display for AggregateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let updated = self
            .last_updated
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();

        if self.count == 0 {
            write!(f, "Count: 0")
        } else if self.stddev() == 0.0 {
            write!(
                f,
                "Count: {} Sum: {:.3} LastUpdated: {}",
                self.count, self.sum, updated
            )
        } else {
            write!(
                f,
                "Count: {} Min: {:.3} Mean: {:.3} Max: {:.3} Stddev: {:.3} Sum: {:.3} LastUpdated: {}",
                self.count,
                self.min,
                self.mean(),
                self.max,
                self.stddev(),
                self.sum,
                updated
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest_all(values: &[f64]) -> AggregateSample {
        let mut sample = AggregateSample::new();
        for &v in values {
            sample.ingest(v, 1.0);
        }
        sample
    }

    #[test]
    fn test_empty_sample_is_zero() {
        let sample = AggregateSample::new();
        assert_eq!(sample.count, 0);
        assert_eq!(sample.mean(), 0.0);
        assert_eq!(sample.stddev(), 0.0);
        assert!(!sample.mean().is_nan());
        assert!(!sample.stddev().is_nan());
        assert_eq!(sample.to_string(), "Count: 0");
    }

    #[test]
    fn test_single_value() {
        let sample = ingest_all(&[7.5]);
        assert_eq!(sample.count, 1);
        assert_eq!(sample.min, 7.5);
        assert_eq!(sample.max, 7.5);
        assert_eq!(sample.mean(), 7.5);
        assert_eq!(sample.stddev(), 0.0);
        assert!(sample.last_updated.is_some());
    }

    #[test]
    fn test_two_values() {
        let sample = ingest_all(&[20.0, 22.0]);
        assert_eq!(sample.count, 2);
        assert_eq!(sample.sum, 42.0);
        assert_eq!(sample.sum_sq, 884.0);
        assert_eq!(sample.min, 20.0);
        assert_eq!(sample.max, 22.0);
        assert_eq!(sample.mean(), 21.0);
        assert_eq!(sample.stddev(), 2f64.sqrt());
    }

    #[test]
    fn test_matches_closed_form() {
        let values = [3.0, -1.5, 8.25, 0.0, 12.0, 4.5, -7.0];
        let sample = ingest_all(&values);

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        assert_eq!(sample.count, values.len() as u64);
        assert!((sample.mean() - mean).abs() < 1e-12);
        assert!((sample.stddev() - var.sqrt()).abs() < 1e-9);
        assert_eq!(sample.min, -7.0);
        assert_eq!(sample.max, 12.0);
    }

    #[test]
    fn test_negative_first_value_sets_extrema() {
        let sample = ingest_all(&[-5.0, -10.0, -1.0]);
        assert_eq!(sample.min, -10.0);
        assert_eq!(sample.max, -1.0);
    }

    #[test]
    fn test_constant_values_never_nan() {
        let sample = ingest_all(&[0.1; 50]);
        assert!(!sample.stddev().is_nan());
        assert!(sample.stddev() < 1e-6);
    }

    #[test]
    fn test_rate_uses_denominator() {
        let mut sample = AggregateSample::new();
        sample.ingest(20.0, 0.01);
        sample.ingest(22.0, 0.01);
        assert!((sample.rate - 4200.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_collapsed_and_full() {
        let single = ingest_all(&[5.0]);
        let rendered = single.to_string();
        assert!(rendered.starts_with("Count: 1 Sum: 5.000 LastUpdated: "));

        let many = ingest_all(&[20.0, 24.0]);
        let rendered = many.to_string();
        assert!(rendered.starts_with(
            "Count: 2 Min: 20.000 Mean: 22.000 Max: 24.000 Stddev: 2.828 Sum: 44.000 LastUpdated: "
        ));
    }
}
