use crate::models::gbm::TrajectoryMatrix;
use crate::models::params::SimulationParameters;
use crate::risk::percentile::{percentile, percentiles_along, Axis};
use rayon::prelude::*;
use statrs::statistics::Statistics;

/// Lower band and VaR tail (5th percentile).
pub const LOWER_PERCENTILE: f64 = 5.0;
/// Upper band (95th percentile).
pub const UPPER_PERCENTILE: f64 = 95.0;

/// Everything returned for one simulation. Field names on the wire match
/// what the front-end reads.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultBundle {
    #[serde(rename = "simulations")]
    pub paths: TrajectoryMatrix,
    pub average_path: Vec<f64>,
    pub percentile_5: Vec<f64>,
    pub percentile_95: Vec<f64>,
    pub var_95: f64,
    #[serde(rename = "time_steps")]
    pub num_steps: usize,
    #[serde(rename = "num_simulations")]
    pub num_paths: usize,
    #[serde(rename = "current_price")]
    pub initial_price: f64,
    #[serde(skip_serializing)]
    pub terminal_p5: f64,
}

/// Per-step arithmetic mean across all paths.
pub fn average_path(matrix: &TrajectoryMatrix) -> Vec<f64> {
    (0..matrix.cols())
        .into_par_iter()
        .map(|t| matrix.iter_rows().map(|row| row[t]).mean())
        .collect()
}

/// 95% Value-at-Risk: `initial_price - p5(terminal prices)`.
///
/// Negative when the 5th percentile of terminal prices sits above the start
/// price. That sign is kept as-is.
#[inline]
pub fn value_at_risk(initial_price: f64, terminal_p5: f64) -> f64 {
    initial_price - terminal_p5
}

/// Reduce a trajectory matrix to the result bundle. The matrix is moved into
/// the bundle so callers get the raw ensemble alongside the statistics.
pub fn reduce(params: &SimulationParameters, paths: TrajectoryMatrix) -> ResultBundle {
    let average_path = average_path(&paths);

    let mut bands = percentiles_along(&paths, &[LOWER_PERCENTILE, UPPER_PERCENTILE], Axis::AcrossPaths);
    let percentile_95 = bands.pop().unwrap_or_default();
    let percentile_5 = bands.pop().unwrap_or_default();

    let mut terminal = paths.column(paths.cols() - 1);
    let terminal_p5 = percentile(&mut terminal, LOWER_PERCENTILE);
    let var_95 = value_at_risk(params.initial_price, terminal_p5);

    ResultBundle {
        paths,
        average_path,
        percentile_5,
        percentile_95,
        var_95,
        num_steps: params.num_steps,
        num_paths: params.num_paths,
        initial_price: params.initial_price,
        terminal_p5,
    }
}
