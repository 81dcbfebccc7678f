use crate::engine;
use crate::errors::{EngineError, EngineResult};
use crate::models::sampler;
use crate::risk::var::ResultBundle;
use crate::state::{AppState, CancelFlag};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use std::time::Instant;

/// Every engine failure becomes a generic 500 with the message in `error`.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// POST /api/simulate -- run one Monte Carlo simulation
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ResultBundle>, EngineError> {
    let run_id = uuid::Uuid::new_v4();
    let started = Instant::now();

    match run(&state, &body, run_id).await {
        Ok(bundle) => {
            let values = bundle.paths.as_slice().len();
            state.counters.record_success(bundle.num_paths, values);
            tracing::info!(
                %run_id,
                var_95 = bundle.var_95,
                terminal_p5 = bundle.terminal_p5,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "simulation complete"
            );
            Ok(Json(bundle))
        }
        Err(e) => {
            state.counters.record_failure();
            match &e {
                EngineError::InvalidParameter { .. } | EngineError::Parse(_) => {
                    tracing::warn!(%run_id, error = %e, "rejected simulation request")
                }
                _ => tracing::error!(%run_id, error = %e, "simulation failed"),
            }
            Err(e)
        }
    }
}

async fn run(state: &AppState, body: &[u8], run_id: uuid::Uuid) -> EngineResult<ResultBundle> {
    // An empty body is an empty bag: every field takes its default.
    let bag = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)?
    };
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let seed = state.config.simulation_seed;
    let max_values = state.config.max_ensemble_values;
    let span = tracing::info_span!("simulation", %run_id);

    let task = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        let sampler = sampler::from_seed(seed);
        engine::simulate_bag(&bag, sampler.as_ref(), &worker_cancel, max_values)
    });

    let limit = state.config.simulation_timeout;
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => joined?,
        Err(_) => {
            // The detached worker stops at its next cancellation check.
            cancel.cancel();
            Err(EngineError::Cancelled(format!("exceeded {limit:?} time limit")))
        }
    }
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "simulations_run": state.counters.simulations_run.load(Relaxed),
        "simulations_failed": state.counters.simulations_failed.load(Relaxed),
        "paths_generated": state.counters.paths_generated.load(Relaxed),
        "values_generated": state.counters.values_generated.load(Relaxed),
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            simulation_seed: Some(17),
            ..AppConfig::default()
        }
    }

    async fn post_simulate(config: AppConfig, body: &str) -> (StatusCode, Value) {
        let app = build_router(AppState::new(config));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/simulate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_simulate_returns_bundle() {
        let (status, v) = post_simulate(
            test_config(),
            r#"{"current_price": 100, "volatility": 0.2, "time_steps": 12, "num_simulations": 40, "risk_free_rate": 0.05}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sims = v["simulations"].as_array().unwrap();
        assert_eq!(sims.len(), 40);
        assert_eq!(sims[0].as_array().unwrap().len(), 13);
        assert_eq!(v["average_path"].as_array().unwrap().len(), 13);
        assert_eq!(v["average_path"][0], 100.0);
        assert_eq!(v["time_steps"], 12);
        assert_eq!(v["num_simulations"], 40);
        assert_eq!(v["current_price"], 100.0);
        assert!(v["var_95"].is_f64());
    }

    #[tokio::test]
    async fn test_empty_body_uses_defaults() {
        let config = AppConfig {
            simulation_seed: Some(1),
            ..AppConfig::default()
        };
        let (status, v) = post_simulate(config, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["time_steps"], 252);
        assert_eq!(v["num_simulations"], 1000);
        assert_eq!(v["simulations"].as_array().unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn test_seeded_responses_repeat() {
        let body = r#"{"time_steps": 5, "num_simulations": 8}"#;
        let (_, a) = post_simulate(test_config(), body).await;
        let (_, b) = post_simulate(test_config(), body).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_bad_parameter_is_500_with_message() {
        let (status, v) = post_simulate(test_config(), r#"{"volatility": "abc"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(v["error"].as_str().unwrap().contains("volatility"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_500() {
        let (status, v) = post_simulate(test_config(), "{oops").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(v["error"].as_str().unwrap().starts_with("parse error"));
    }

    #[tokio::test]
    async fn test_oversized_request_is_rejected() {
        let config = AppConfig {
            max_ensemble_values: 1_000,
            ..test_config()
        };
        let (status, v) = post_simulate(config, r#"{"time_steps": 100, "num_simulations": 100}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(v["error"].as_str().unwrap().contains("resource exhausted"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout_cancels_run() {
        let config = AppConfig {
            simulation_timeout: std::time::Duration::from_millis(1),
            ..test_config()
        };
        let (status, v) = post_simulate(config, r#"{"time_steps": 1000, "num_simulations": 2000}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let msg = v["error"].as_str().unwrap();
        assert!(msg.starts_with("simulation cancelled"), "error was: {msg}");
        assert!(msg.contains("time limit"), "error was: {msg}");
    }

    #[tokio::test]
    async fn test_counters_track_runs() {
        let state = AppState::new(test_config());
        let app = build_router(state.clone());

        let ok = Request::builder()
            .method(Method::POST)
            .uri("/api/simulate")
            .body(Body::from(r#"{"time_steps": 4, "num_simulations": 3}"#))
            .unwrap();
        app.clone().oneshot(ok).await.unwrap();

        let bad = Request::builder()
            .method(Method::POST)
            .uri("/api/simulate")
            .body(Body::from("[]"))
            .unwrap();
        app.clone().oneshot(bad).await.unwrap();

        let req = Request::builder().uri("/api/counters").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["simulations_run"], 1);
        assert_eq!(v["simulations_failed"], 1);
        assert_eq!(v["paths_generated"], 3);
        assert_eq!(v["values_generated"], 15);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = build_router(AppState::new(test_config()));
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/simulate")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(AppState::new(test_config()));
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
