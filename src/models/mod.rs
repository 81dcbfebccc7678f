pub mod params;
pub mod sampler;
pub mod gbm;

/// Source of standard-normal draws for the path generator.
///
/// Rows are filled independently and possibly from several threads at once,
/// so implementations must be Send + Sync and must not assume any ordering
/// between rows. Every value written must be an i.i.d. N(0, 1) sample.
pub trait NormalSampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fill `out` with the draws for path `row`.
    fn fill_row(&self, row: usize, out: &mut [f64]);
}
