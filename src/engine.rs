use crate::errors::{EngineError, EngineResult};
use crate::models::gbm::generate_paths;
use crate::models::params::SimulationParameters;
use crate::models::NormalSampler;
use crate::risk::var::{reduce, ResultBundle};
use crate::state::CancelFlag;

/// Generator -> reducer. Synchronous and CPU-bound; callers on an async
/// runtime should run it on a blocking thread.
pub fn run_simulation(
    params: &SimulationParameters,
    sampler: &dyn NormalSampler,
    cancel: &CancelFlag,
    max_values: usize,
) -> EngineResult<ResultBundle> {
    let paths = generate_paths(params, sampler, cancel, max_values)?;

    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled("aborted before reduction".into()));
    }

    Ok(reduce(params, paths))
}

/// Validate a raw key/value bag, then simulate.
pub fn simulate_bag(
    bag: &serde_json::Value,
    sampler: &dyn NormalSampler,
    cancel: &CancelFlag,
    max_values: usize,
) -> EngineResult<ResultBundle> {
    let params = SimulationParameters::from_bag(bag)?;

    tracing::info!(
        initial_price = params.initial_price,
        volatility = params.volatility,
        num_steps = params.num_steps,
        num_paths = params.num_paths,
        risk_free_rate = params.risk_free_rate,
        sampler = sampler.name(),
        "simulation requested"
    );

    run_simulation(&params, sampler, cancel, max_values)
}
