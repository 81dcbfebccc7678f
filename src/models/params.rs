use crate::errors::{EngineError, EngineResult};
use serde_json::Value;

pub const DEFAULT_INITIAL_PRICE: f64 = 100.0;
pub const DEFAULT_VOLATILITY: f64 = 0.20;
pub const DEFAULT_NUM_STEPS: usize = 252;
pub const DEFAULT_NUM_PATHS: usize = 1000;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Fully populated, sanitized GBM parameters.
///
/// Only constructed through [`SimulationParameters::sanitized`] (directly or via
/// [`SimulationParameters::from_bag`]), so `num_steps` and `num_paths` are
/// always positive and `volatility` is always strictly positive.
///
/// `initial_price` and `risk_free_rate` are taken as given. A zero or negative
/// price is simulated as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    pub initial_price: f64,
    pub volatility: f64,
    pub num_steps: usize,
    pub num_paths: usize,
    pub risk_free_rate: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            initial_price: DEFAULT_INITIAL_PRICE,
            volatility: DEFAULT_VOLATILITY,
            num_steps: DEFAULT_NUM_STEPS,
            num_paths: DEFAULT_NUM_PATHS,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

impl SimulationParameters {
    /// Apply the sanitization policy, in order: steps, paths, volatility.
    pub fn sanitized(
        initial_price: f64,
        volatility: f64,
        num_steps: i64,
        num_paths: i64,
        risk_free_rate: f64,
    ) -> EngineResult<Self> {
        let num_steps = if num_steps <= 0 {
            DEFAULT_NUM_STEPS
        } else {
            usize::try_from(num_steps)
                .map_err(|_| EngineError::invalid("time_steps", format!("{num_steps} is out of range")))?
        };

        let num_paths = if num_paths <= 0 {
            DEFAULT_NUM_PATHS
        } else {
            usize::try_from(num_paths)
                .map_err(|_| EngineError::invalid("num_simulations", format!("{num_paths} is out of range")))?
        };

        let volatility = if volatility <= 0.0 { DEFAULT_VOLATILITY } else { volatility };

        Ok(Self {
            initial_price,
            volatility,
            num_steps,
            num_paths,
            risk_free_rate,
        })
    }

    /// Build parameters from a loosely-typed JSON bag. Absent keys take their
    /// defaults; present keys must coerce to the field's numeric type.
    pub fn from_bag(bag: &Value) -> EngineResult<Self> {
        let map = match bag {
            Value::Object(map) => map,
            other => {
                return Err(EngineError::invalid(
                    "body",
                    format!("expected a JSON object, got {}", kind(other)),
                ))
            }
        };

        let initial_price = match map.get("current_price") {
            Some(v) => coerce_f64("current_price", v)?,
            None => DEFAULT_INITIAL_PRICE,
        };
        let volatility = match map.get("volatility") {
            Some(v) => coerce_f64("volatility", v)?,
            None => DEFAULT_VOLATILITY,
        };
        let num_steps = match map.get("time_steps") {
            Some(v) => coerce_i64("time_steps", v)?,
            None => DEFAULT_NUM_STEPS as i64,
        };
        let num_paths = match map.get("num_simulations") {
            Some(v) => coerce_i64("num_simulations", v)?,
            None => DEFAULT_NUM_PATHS as i64,
        };
        let risk_free_rate = match map.get("risk_free_rate") {
            Some(v) => coerce_f64("risk_free_rate", v)?,
            None => DEFAULT_RISK_FREE_RATE,
        };

        Self::sanitized(initial_price, volatility, num_steps, num_paths, risk_free_rate)
    }

    /// Time increment, `1 / num_steps`.
    #[inline]
    pub fn dt(&self) -> f64 {
        1.0 / self.num_steps as f64
    }

    /// Deterministic part of each log-return: `(r - sigma^2/2) * dt`.
    #[inline]
    pub fn drift_dt(&self) -> f64 {
        (self.risk_free_rate - 0.5 * self.volatility * self.volatility) * self.dt()
    }

    /// Scale applied to each normal draw: `sigma * sqrt(dt)`.
    #[inline]
    pub fn vol_sqrt_dt(&self) -> f64 {
        self.volatility * self.dt().sqrt()
    }

    /// Number of columns in the trajectory matrix.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.num_steps + 1
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_f64(name: &'static str, v: &Value) -> EngineResult<f64> {
    let x = match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| EngineError::invalid(name, format!("{n} is not representable as f64")))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EngineError::invalid(name, format!("cannot parse {s:?} as a number")))?,
        other => {
            return Err(EngineError::invalid(
                name,
                format!("expected a number, got {}", kind(other)),
            ))
        }
    };

    if !x.is_finite() {
        return Err(EngineError::invalid(name, "value must be finite"));
    }
    Ok(x)
}

fn coerce_i64(name: &'static str, v: &Value) -> EngineResult<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            // Integers above i64::MAX: let the ensemble limit reject them later.
            if n.as_u64().is_some() {
                return Ok(i64::MAX);
            }
            integral_f64(name, n.as_f64().unwrap_or(f64::NAN))
        }
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => {
                    let x = s
                        .parse::<f64>()
                        .map_err(|_| EngineError::invalid(name, format!("cannot parse {s:?} as an integer")))?;
                    integral_f64(name, x)
                }
            }
        }
        other => Err(EngineError::invalid(
            name,
            format!("expected an integer, got {}", kind(other)),
        )),
    }
}

fn integral_f64(name: &'static str, x: f64) -> EngineResult<i64> {
    if !x.is_finite() {
        return Err(EngineError::invalid(name, "value must be finite"));
    }
    if x.fract() != 0.0 {
        return Err(EngineError::invalid(name, format!("{x} is not an integer")));
    }
    // `as` saturates at the i64 bounds.
    Ok(x as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_bag_gives_defaults() {
        let p = SimulationParameters::from_bag(&json!({})).unwrap();
        assert_eq!(p, SimulationParameters::default());
    }

    #[test]
    fn test_explicit_values_are_used() {
        let p = SimulationParameters::from_bag(&json!({
            "current_price": 50,
            "volatility": 0.35,
            "time_steps": 10,
            "num_simulations": 5,
            "risk_free_rate": 0.0,
        }))
        .unwrap();
        assert_eq!(p.initial_price, 50.0);
        assert_eq!(p.volatility, 0.35);
        assert_eq!(p.num_steps, 10);
        assert_eq!(p.num_paths, 5);
        assert_eq!(p.risk_free_rate, 0.0);
    }

    #[test]
    fn test_non_positive_counts_reset_to_defaults() {
        let p = SimulationParameters::from_bag(&json!({
            "time_steps": 0,
            "num_simulations": -3,
        }))
        .unwrap();
        assert_eq!(p.num_steps, DEFAULT_NUM_STEPS);
        assert_eq!(p.num_paths, DEFAULT_NUM_PATHS);
    }

    #[test]
    fn test_non_positive_volatility_resets() {
        for vol in [0.0, -0.4] {
            let p = SimulationParameters::from_bag(&json!({ "volatility": vol })).unwrap();
            assert_eq!(p.volatility, DEFAULT_VOLATILITY, "vol={vol}");
        }
    }

    #[test]
    fn test_price_and_rate_not_range_checked() {
        let p = SimulationParameters::from_bag(&json!({
            "current_price": -20.0,
            "risk_free_rate": -0.1,
        }))
        .unwrap();
        assert_eq!(p.initial_price, -20.0);
        assert_eq!(p.risk_free_rate, -0.1);
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let p = SimulationParameters::from_bag(&json!({
            "current_price": "123.5",
            "time_steps": " 30 ",
            "num_simulations": "200.0",
        }))
        .unwrap();
        assert_eq!(p.initial_price, 123.5);
        assert_eq!(p.num_steps, 30);
        assert_eq!(p.num_paths, 200);
    }

    #[test]
    fn test_integral_float_accepted_for_counts() {
        let p = SimulationParameters::from_bag(&json!({ "time_steps": 252.0 })).unwrap();
        assert_eq!(p.num_steps, 252);
    }

    #[test]
    fn test_fractional_count_rejected() {
        let err = SimulationParameters::from_bag(&json!({ "time_steps": 2.5 })).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "time_steps", .. }));
    }

    #[test]
    fn test_wrong_types_rejected() {
        let cases = [
            json!({ "current_price": "abc" }),
            json!({ "volatility": true }),
            json!({ "risk_free_rate": [0.05] }),
            json!({ "num_simulations": { "n": 3 } }),
            json!({ "time_steps": null }),
            json!({ "current_price": "NaN" }),
        ];
        for bag in cases {
            let res = SimulationParameters::from_bag(&bag);
            assert!(
                matches!(res, Err(EngineError::InvalidParameter { .. })),
                "bag {bag} should be rejected, got {res:?}"
            );
        }
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = SimulationParameters::from_bag(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "body", .. }));
    }

    #[test]
    fn test_huge_count_saturates() {
        let p = SimulationParameters::from_bag(&json!({ "num_simulations": u64::MAX })).unwrap();
        assert_eq!(p.num_paths as u64, i64::MAX as u64);
    }

    #[test]
    fn test_precomputed_terms() {
        let p = SimulationParameters::sanitized(100.0, 0.2, 4, 1, 0.05).unwrap();
        assert_eq!(p.dt(), 0.25);
        assert!((p.drift_dt() - (0.05 - 0.02) * 0.25).abs() < 1e-15);
        assert!((p.vol_sqrt_dt() - 0.1).abs() < 1e-15);
        assert_eq!(p.num_columns(), 5);
    }
}
