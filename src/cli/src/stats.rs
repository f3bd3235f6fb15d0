// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;

/// Percentile ranks reported for every table, ascending.
pub const REPORT_RANKS: [f64; 5] = [10.0, 50.0, 90.0, 99.0, 100.0];

/// Pruning statistics of one table-scan operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanStat {
    pub partitions_scanned: u64,
    pub partitions_total: u64,
}

impl ScanStat {
    /// Share of the table's partitions the scan actually touched, in
    /// [0, 100] whenever `partitions_scanned <= partitions_total`. A table
    /// with no partitions at all reads as 0 (the platform's `div0`).
    pub fn percent_scanned(&self) -> f64 {
        if self.partitions_total == 0 {
            0.0
        } else {
            100.0 * self.partitions_scanned as f64 / self.partitions_total as f64
        }
    }
}

/// The q-th percentile of a sorted sample, `0 <= q <= 100`, with linear
/// interpolation between the two nearest ranks. Same definition as
/// `numpy.percentile` with the default method: the value `q/100` of the way
/// from the minimum to the maximum, so q=0 is the minimum, q=50 the median
/// and q=100 the maximum.
///
/// The input must be non-empty and sorted ascending.
fn percentile_of_sorted(sorted: &[f64], rank: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=100.0).contains(&rank));

    let index = (sorted.len() - 1) as f64 * rank / 100.0;
    let floor = index.floor() as usize;
    let fract = index.fract();
    if fract == 0.0 {
        sorted[floor]
    } else {
        sorted[floor] * (1.0 - fract) + sorted[floor + 1] * fract
    }
}

/// One summary row: the table plus the percentile distribution of
/// percent-scanned across the sampled queries.
#[derive(Clone, Debug, Serialize)]
pub struct ScanSummary {
    pub table_name: String,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub p100: f64,
}

impl ScanSummary {
    /// Summarizes the collected percent-scanned samples. `None` when no
    /// sample was collected; the percentile of an empty sample is
    /// undefined.
    ///
    /// By construction `p10 <= p50 <= p90 <= p99 <= p100`.
    pub fn from_samples(table_name: &str, mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);
        let [p10, p50, p90, p99, p100] =
            REPORT_RANKS.map(|rank| percentile_of_sorted(&samples, rank));
        Some(Self {
            table_name: table_name.to_string(),
            p10,
            p50,
            p90,
            p99,
            p100,
        })
    }

    pub fn percentiles(&self) -> [f64; 5] {
        [self.p10, self.p50, self.p90, self.p99, self.p100]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_percent_scanned() {
        let stat = ScanStat {
            partitions_scanned: 12,
            partitions_total: 40,
        };
        assert_close(30.0, stat.percent_scanned());

        let full = ScanStat {
            partitions_scanned: 7,
            partitions_total: 7,
        };
        assert_close(100.0, full.percent_scanned());
    }

    #[test]
    fn test_percent_scanned_guards_division_by_zero() {
        let stat = ScanStat {
            partitions_scanned: 0,
            partitions_total: 0,
        };
        assert_close(0.0, stat.percent_scanned());
    }

    #[test]
    fn test_median_of_synthetic_samples() {
        let summary =
            ScanSummary::from_samples("db.s.t", vec![10.0, 20.0, 50.0, 80.0, 100.0]).unwrap();
        assert_close(50.0, summary.p50);
        assert_close(100.0, summary.p100);
    }

    #[test]
    fn test_percentile_matches_numpy() {
        // np.percentile([10, 7, 4], 40) == 6.4
        // np.percentile([10, 7, 4], 95) == 9.7000000000000011
        let sorted = [4.0, 7.0, 10.0];
        assert_close(6.4, percentile_of_sorted(&sorted, 40.0));
        assert_close(9.7, percentile_of_sorted(&sorted, 95.0));
        assert_close(4.0, percentile_of_sorted(&sorted, 0.0));
        assert_close(7.0, percentile_of_sorted(&sorted, 50.0));
        assert_close(10.0, percentile_of_sorted(&sorted, 100.0));
    }

    #[test]
    fn test_percentiles_are_sorted_ascending() {
        let samples = vec![88.0, 3.0, 100.0, 42.5, 0.0, 67.0, 12.0, 95.5, 23.0];
        let summary = ScanSummary::from_samples("db.s.t", samples).unwrap();
        let percentiles = summary.percentiles();
        for pair in percentiles.windows(2) {
            assert!(pair[0] <= pair[1], "{percentiles:?} not ascending");
        }
        // Percent-scanned samples stay within [0, 100], so must the summary.
        assert!(percentiles.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[test]
    fn test_single_sample_collapses_all_ranks() {
        let summary = ScanSummary::from_samples("db.s.t", vec![37.5]).unwrap();
        assert_eq!([37.5; 5], summary.percentiles());
    }

    #[test]
    fn test_empty_samples_have_no_summary() {
        assert!(ScanSummary::from_samples("db.s.t", vec![]).is_none());
    }
}
