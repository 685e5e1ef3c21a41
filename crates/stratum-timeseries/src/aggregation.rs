//! Stratum Time-Series Aggregation
//!
//! Aggregation functions, fill policies and downsampling for range reads.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// Aggregate Function
// =============================================================================

/// Aggregation applied per dimension column when a query supplies an
/// interval. Names follow the backend's query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AggregateFunction {
    #[default]
    Mean,
    Sum,
    Count,
    Min,
    Max,
    First,
    Last,
    Median,
}

impl AggregateFunction {
    /// Query-language spelling (`MEAN(column)`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "MEAN",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::First => "FIRST",
            Self::Last => "LAST",
            Self::Median => "MEDIAN",
        }
    }

    /// Parse a caller-supplied function name; case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MEAN" => Some(Self::Mean),
            "SUM" => Some(Self::Sum),
            "COUNT" => Some(Self::Count),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "FIRST" => Some(Self::First),
            "LAST" => Some(Self::Last),
            "MEDIAN" => Some(Self::Median),
            _ => None,
        }
    }

    /// Apply the aggregation to a set of values.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        Some(match self {
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Sum => values.iter().sum(),
            Self::Count => values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::First => *values.first()?,
            Self::Last => *values.last()?,
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        })
    }
}

// =============================================================================
// Fill Policy
// =============================================================================

/// How empty buckets are represented in a downsampled result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Fill {
    /// Empty buckets are absent from the result.
    #[default]
    None,
    /// Empty buckets carry zero.
    Zero,
    /// Empty buckets repeat the previous bucket's value.
    Previous,
}

impl Fill {
    /// Query-language spelling (`fill(none)`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zero => "0",
            Self::Previous => "previous",
        }
    }

    /// Parse a caller-supplied fill name; unknown policies degrade to
    /// `none`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "0" | "zero" => Self::Zero,
            "previous" => Self::Previous,
            _ => Self::None,
        }
    }
}

// =============================================================================
// Downsampler
// =============================================================================

/// Downsamples multi-column rows to one aggregated row per time bucket.
pub struct Downsampler {
    interval: i64,
    function: AggregateFunction,
}

impl Downsampler {
    /// `interval` is the bucket width in milliseconds; must be positive.
    pub fn new(interval: i64, function: AggregateFunction) -> Self {
        Self { interval, function }
    }

    fn bucket_start(&self, timestamp: i64) -> i64 {
        (timestamp.div_euclid(self.interval)) * self.interval
    }

    /// Aggregate `(timestamp, columns)` rows into buckets over `[from, to]`.
    /// Rows must be ascending by timestamp. With `Fill::None` only buckets
    /// that contain data appear; other policies emit every bucket in range.
    pub fn downsample(
        &self,
        rows: &[(i64, Vec<f64>)],
        width: usize,
        from: i64,
        to: i64,
        fill: Fill,
    ) -> Vec<(i64, Vec<f64>)> {
        let mut buckets: Vec<(i64, Vec<Vec<f64>>)> = Vec::new();
        for (timestamp, columns) in rows {
            let start = self.bucket_start(*timestamp);
            if buckets.last().map(|(b, _)| *b != start).unwrap_or(true) {
                buckets.push((start, vec![Vec::new(); width]));
            }
            let (_, collected) = buckets.last_mut().expect("bucket was just pushed");
            for (index, value) in columns.iter().enumerate().take(width) {
                collected[index].push(*value);
            }
        }

        let mut aggregated: Vec<(i64, Vec<f64>)> = buckets
            .into_iter()
            .filter_map(|(start, columns)| {
                let row: Option<Vec<f64>> =
                    columns.iter().map(|values| self.function.apply(values)).collect();
                row.map(|row| (start, row))
            })
            .collect();

        if fill == Fill::None {
            return aggregated;
        }

        // Emit every bucket in range, filling gaps per policy.
        let mut filled = Vec::new();
        let mut previous: Option<Vec<f64>> = None;
        let mut next = aggregated.drain(..).peekable();
        let mut start = self.bucket_start(from);
        while start <= to {
            let row = match next.peek() {
                Some((bucket, _)) if *bucket == start => {
                    let (_, row) = next.next().expect("peeked bucket exists");
                    row
                }
                _ => match fill {
                    Fill::Zero => vec![0.0; width],
                    Fill::Previous => match &previous {
                        Some(row) => row.clone(),
                        None => {
                            start += self.interval;
                            continue;
                        }
                    },
                    Fill::None => unreachable!("handled above"),
                },
            };
            previous = Some(row.clone());
            filled.push((start, row));
            start += self.interval;
        }
        filled
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_functions() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(AggregateFunction::Mean.apply(&values), Some(3.0));
        assert_eq!(AggregateFunction::Sum.apply(&values), Some(15.0));
        assert_eq!(AggregateFunction::Count.apply(&values), Some(5.0));
        assert_eq!(AggregateFunction::Min.apply(&values), Some(1.0));
        assert_eq!(AggregateFunction::Max.apply(&values), Some(5.0));
        assert_eq!(AggregateFunction::First.apply(&values), Some(1.0));
        assert_eq!(AggregateFunction::Last.apply(&values), Some(5.0));
        assert_eq!(AggregateFunction::Median.apply(&values), Some(3.0));
    }

    #[test]
    fn test_parse_function_names() {
        assert_eq!(AggregateFunction::parse("mean"), Some(AggregateFunction::Mean));
        assert_eq!(AggregateFunction::parse("MAX"), Some(AggregateFunction::Max));
        assert_eq!(AggregateFunction::parse("mystery"), None);
    }

    #[test]
    fn test_fill_parse() {
        assert_eq!(Fill::parse("none"), Fill::None);
        assert_eq!(Fill::parse("0"), Fill::Zero);
        assert_eq!(Fill::parse("previous"), Fill::Previous);
        assert_eq!(Fill::parse("linear"), Fill::None);
    }

    #[test]
    fn test_downsample_mean_buckets() {
        let rows: Vec<(i64, Vec<f64>)> = (0..10)
            .map(|i| (i * 1000, vec![i as f64, (i * 10) as f64]))
            .collect();
        let downsampler = Downsampler::new(5000, AggregateFunction::Mean);
        let result = downsampler.downsample(&rows, 2, 0, 9000, Fill::None);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], (0, vec![2.0, 20.0]));
        assert_eq!(result[1], (5000, vec![7.0, 70.0]));
    }

    #[test]
    fn test_downsample_fill_none_drops_empty_buckets() {
        // Data only in the first and last of four buckets.
        let rows = vec![(0, vec![1.0]), (15_000, vec![3.0])];
        let downsampler = Downsampler::new(5000, AggregateFunction::Mean);
        let result = downsampler.downsample(&rows, 1, 0, 19_999, Fill::None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, 0);
        assert_eq!(result[1].0, 15_000);
    }

    #[test]
    fn test_downsample_fill_zero_emits_all_buckets() {
        let rows = vec![(0, vec![1.0]), (15_000, vec![3.0])];
        let downsampler = Downsampler::new(5000, AggregateFunction::Mean);
        let result = downsampler.downsample(&rows, 1, 0, 19_999, Fill::Zero);
        assert_eq!(result.len(), 4);
        assert_eq!(result[1], (5000, vec![0.0]));
        assert_eq!(result[2], (10_000, vec![0.0]));
    }

    #[test]
    fn test_downsample_fill_previous_carries_value() {
        let rows = vec![(0, vec![1.0]), (15_000, vec![3.0])];
        let downsampler = Downsampler::new(5000, AggregateFunction::Mean);
        let result = downsampler.downsample(&rows, 1, 0, 19_999, Fill::Previous);
        assert_eq!(result.len(), 4);
        assert_eq!(result[1], (5000, vec![1.0]));
        assert_eq!(result[2], (10_000, vec![1.0]));
        assert_eq!(result[3], (15_000, vec![3.0]));
    }
}
