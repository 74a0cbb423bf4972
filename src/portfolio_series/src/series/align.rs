//! Forward-fill join of arbitrary `(timestamp, value)` series onto a shared axis.
//!
//! Cash balances and position existence are step functions in time, so a
//! reference point takes the latest source value at or before it. Values are
//! never interpolated between samples.

use crate::models::bar::BarSeries;

/// Builds the reference axis from the first series with at least one bar.
///
/// `series` is expected in position order. The result is sorted and free of
/// duplicates; an empty vector means no instrument returned any data.
pub fn reference_axis<'a, I>(series: I) -> Vec<i64>
where
    I: IntoIterator<Item = &'a BarSeries>,
{
    let Some(source) = series.into_iter().find(|s| !s.is_empty()) else {
        return Vec::new();
    };
    let mut axis: Vec<i64> = source.bars.iter().map(|b| b.timestamp).collect();
    axis.sort_unstable();
    axis.dedup();
    axis
}

/// Sorted, finite copy of `source`. Equal timestamps keep input order, so the
/// later entry wins during lookup.
fn prepared(source: &[(i64, f64)]) -> Vec<(i64, f64)> {
    let mut points: Vec<(i64, f64)> = source
        .iter()
        .copied()
        .filter(|(_, v)| v.is_finite())
        .collect();
    points.sort_by_key(|(t, _)| *t);
    points
}

fn latest_at(points: &[(i64, f64)], at: i64) -> Option<f64> {
    let idx = points.partition_point(|(t, _)| *t <= at);
    idx.checked_sub(1).map(|i| points[i].1)
}

/// Aligns `source` onto `axis`, using `default` before the first source point.
pub fn forward_fill(axis: &[i64], source: &[(i64, f64)], default: f64) -> Vec<f64> {
    let points = prepared(source);
    axis.iter()
        .map(|&t| latest_at(&points, t).unwrap_or(default))
        .collect()
}

/// Like [`forward_fill`], but leaves a gap before the first source point.
pub fn forward_fill_opt(axis: &[i64], source: &[(i64, f64)]) -> Vec<Option<f64>> {
    let points = prepared(source);
    axis.iter().map(|&t| latest_at(&points, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bar::Bar;
    use crate::models::period::Period;

    fn series(symbol: &str, stamps: &[i64]) -> BarSeries {
        BarSeries {
            symbol: symbol.into(),
            period: Period::OneMonth,
            bars: stamps
                .iter()
                .map(|&t| Bar {
                    timestamp: t,
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 0,
                })
                .collect(),
            meta: None,
        }
    }

    #[test]
    fn step_fill_with_default() {
        let out = forward_fill(&[1, 2, 3, 4, 5], &[(2, 10.0), (4, 20.0)], 0.0);
        assert_eq!(out, vec![0.0, 10.0, 10.0, 20.0, 20.0]);
    }

    #[test]
    fn gaps_before_first_point() {
        let out = forward_fill_opt(&[1, 2, 3], &[(2, 5.0)]);
        assert_eq!(out, vec![None, Some(5.0), Some(5.0)]);
    }

    #[test]
    fn unordered_source_and_nan_are_handled() {
        let out = forward_fill(&[1, 2, 3], &[(3, 30.0), (1, 10.0), (2, f64::NAN)], -1.0);
        assert_eq!(out, vec![10.0, 10.0, 30.0]);
    }

    #[test]
    fn duplicate_timestamps_take_the_later_entry() {
        let out = forward_fill(&[5], &[(5, 1.0), (5, 2.0)], 0.0);
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn empty_inputs() {
        assert!(forward_fill(&[], &[(1, 1.0)], 0.0).is_empty());
        assert_eq!(forward_fill(&[1, 2], &[], 7.0), vec![7.0, 7.0]);
    }

    #[test]
    fn axis_comes_from_first_nonempty_series() {
        let axis = reference_axis(&[
            series("A", &[]),
            series("B", &[30, 10, 20, 20]),
            series("C", &[1, 2, 3, 4, 5]),
        ]);
        assert_eq!(axis, vec![10, 20, 30]);
        assert!(reference_axis(&[series("A", &[])]).is_empty());
    }
}
