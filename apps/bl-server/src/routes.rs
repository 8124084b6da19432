//! HTTP routes and the simulation dispatch.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bl_app::{AppError, LabContext, LabId, LabRequest, ServiceConfig, definitions, run_lab};
use bl_results::{compute_run_id, short_id};
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, info, info_span};

use crate::reply::{error_response, not_found};

/// Headroom on top of the per-solve budget for parsing and shaping.
const TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub ctx: LabContext,
    /// Bounds simulations running on the blocking pool
    pub limiter: Arc<Semaphore>,
    pub simulation_timeout: Duration,
    pub legacy_error_status: bool,
}

impl AppState {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            ctx: LabContext::reference(config.lab_settings()),
            limiter: Arc::new(Semaphore::new(config.max_concurrent_simulations)),
            simulation_timeout: config.simulation_timeout(),
            legacy_error_status: config.legacy_error_status,
        }
    }

    fn budget(&self, request: &LabRequest) -> Duration {
        let n = u32::try_from(request.simulation_count()).unwrap_or(u32::MAX);
        self.simulation_timeout.saturating_mul(n) + TIMEOUT_SLACK
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/health", get(health));
    for def in definitions() {
        let lab = def.id;
        router = router.route(
            def.route,
            post(
                move |State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>| {
                    simulate(state, lab, body)
                },
            ),
        );
    }
    router
        .fallback(fallback)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn home() -> &'static str {
    "batterylab simulation service is up"
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn fallback() -> Response {
    not_found()
}

/// Parse, run on the blocking pool under the concurrency limit, and answer.
pub async fn simulate(
    state: AppState,
    lab: LabId,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let err = AppError::InvalidInput(rejection.body_text());
            return error_response(&err, state.legacy_error_status);
        }
    };
    let run_id = match compute_run_id(&body, state.ctx.engine.version()) {
        Ok(id) => id,
        Err(e) => {
            let err = AppError::InvalidInput(format!("cannot fingerprint request: {e}"));
            return error_response(&err, state.legacy_error_status);
        }
    };
    let span = info_span!("simulate", %lab, run = short_id(&run_id));
    async move {
        match dispatch(&state, lab, body).await {
            Ok(output) => {
                info!("answered");
                (StatusCode::OK, [("x-run-id", run_id)], Json(output)).into_response()
            }
            Err(err) => error_response(&err, state.legacy_error_status),
        }
    }
    .instrument(span)
    .await
}

async fn dispatch(state: &AppState, lab: LabId, body: Value) -> Result<Value, AppError> {
    let request = LabRequest::parse(lab, body)?;
    let budget = state.budget(&request);
    info!(simulations = request.simulation_count(), budget_s = budget.as_secs_f64(), "request");

    let permit = state
        .limiter
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| AppError::SolverFailure("simulation pool is closed".to_string()))?;
    let ctx = state.ctx.clone();
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        run_lab(&ctx, &request)
    });

    let output = match tokio::time::timeout(budget, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join)) => {
            return Err(AppError::SolverFailure(format!("simulation task failed: {join}")));
        }
        Err(_) => {
            return Err(AppError::SolverTimeout {
                elapsed_s: budget.as_secs_f64(),
            });
        }
    };
    Ok(output.to_json()?)
}
