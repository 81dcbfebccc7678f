use crate::models::gbm::TrajectoryMatrix;
use rayon::prelude::*;

/// Direction of reduction over a trajectory matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Reduce across paths: one value per time step.
    AcrossPaths,
    /// Reduce across time: one value per path.
    #[allow(dead_code)]
    AcrossTime,
}

/// Percentile `q` (0..=100) of `values` with linear interpolation,
/// rank = q/100 * (n - 1). Sorts `values` in place. NaN for empty input.
pub fn percentile(values: &mut [f64], q: f64) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    percentile_sorted(values, q)
}

/// Same as [`percentile`] for data that is already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);

    // Equal neighbours return exactly, so constant lanes carry no rounding.
    if lower == upper || sorted[lower] == sorted[upper] {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}

/// Several percentiles of every lane along `axis`. Each lane is sorted once
/// and all of `qs` are read from it.
///
/// Returns one vector per entry of `qs`, each holding one value per lane.
pub fn percentiles_along(matrix: &TrajectoryMatrix, qs: &[f64], axis: Axis) -> Vec<Vec<f64>> {
    let (lanes, lane_len) = match axis {
        Axis::AcrossPaths => (matrix.cols(), matrix.rows()),
        Axis::AcrossTime => (matrix.rows(), matrix.cols()),
    };

    let per_lane: Vec<Vec<f64>> = (0..lanes)
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(lane_len),
            |buf, lane| {
                match axis {
                    Axis::AcrossPaths => matrix.column_into(lane, buf),
                    Axis::AcrossTime => {
                        buf.clear();
                        buf.extend_from_slice(matrix.row(lane));
                    }
                }
                buf.sort_unstable_by(f64::total_cmp);
                let sorted: &[f64] = buf;
                qs.iter()
                    .map(|&q| percentile_sorted(sorted, q))
                    .collect::<Vec<f64>>()
            },
        )
        .collect();

    (0..qs.len())
        .map(|k| per_lane.iter().map(|lane| lane[k]).collect())
        .collect()
}
