use crate::errors::{EngineError, EngineResult};
use crate::models::params::SimulationParameters;
use crate::models::NormalSampler;
use crate::state::CancelFlag;
use rayon::prelude::*;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Simulated price paths, row-major: `data[path * cols + step]`.
/// Column 0 holds the initial price for every row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl TrajectoryMatrix {
    /// Number of paths.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of time points (`num_steps + 1`).
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.cols)
    }

    /// Copy column `col` (one value per path) into `buf`, replacing its contents.
    pub fn column_into(&self, col: usize, buf: &mut Vec<f64>) {
        buf.clear();
        buf.extend(self.iter_rows().map(|r| r[col]));
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        let mut buf = Vec::with_capacity(self.rows);
        self.column_into(col, &mut buf);
        buf
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Serialized as a sequence of rows, one inner sequence per path.
impl Serialize for TrajectoryMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for row in self.iter_rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// Total number of values the ensemble would hold, or `ResourceExhausted`
/// when it overflows or exceeds `max_values`.
pub fn ensemble_size(params: &SimulationParameters, max_values: usize) -> EngineResult<usize> {
    let total = params
        .num_steps
        .checked_add(1)
        .and_then(|cols| params.num_paths.checked_mul(cols))
        .ok_or_else(|| {
            EngineError::ResourceExhausted(format!(
                "{} paths x {} steps overflows the address space",
                params.num_paths, params.num_steps
            ))
        })?;

    if total > max_values {
        return Err(EngineError::ResourceExhausted(format!(
            "{} paths x {} columns = {total} values exceeds the limit of {max_values}",
            params.num_paths,
            params.num_columns()
        )));
    }
    Ok(total)
}

/// Generate GBM paths under the log-space discretisation
///
/// S(t+dt) = S(t) * exp((r - sigma^2/2) dt + sigma sqrt(dt) Z)
///
/// Each row is filled with its normal draws and then scanned once along the
/// time axis: the running sum of log-returns is exponentiated, so
/// `S(t) = S0 * exp(sum of the first t log-returns)`. Rows run in parallel;
/// the scan inside a row is sequential. `cancel` is checked before each row.
pub fn generate_paths(
    params: &SimulationParameters,
    sampler: &dyn NormalSampler,
    cancel: &CancelFlag,
    max_values: usize,
) -> EngineResult<TrajectoryMatrix> {
    let total = ensemble_size(params, max_values)?;
    let cols = params.num_columns();

    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(total).map_err(|e| {
        EngineError::ResourceExhausted(format!("cannot allocate {total} values: {e}"))
    })?;
    data.resize(total, 0.0);

    let s0 = params.initial_price;
    let drift_dt = params.drift_dt();
    let vol_sqrt_dt = params.vol_sqrt_dt();

    data.par_chunks_mut(cols)
        .enumerate()
        .try_for_each(|(i, row)| {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled(format!("aborted before path {i}")));
            }

            row[0] = s0;
            let steps = &mut row[1..];
            sampler.fill_row(i, steps);

            let mut log_sum = 0.0;
            for x in steps.iter_mut() {
                log_sum += drift_dt + vol_sqrt_dt * *x;
                *x = s0 * log_sum.exp();
            }
            Ok(())
        })?;

    tracing::debug!(
        paths = params.num_paths,
        steps = params.num_steps,
        sampler = sampler.name(),
        "paths generated"
    );

    Ok(TrajectoryMatrix {
        data,
        rows: params.num_paths,
        cols,
    })
}
