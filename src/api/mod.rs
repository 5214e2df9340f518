use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::core::{FireError, FireReport, PortfolioConfig, run_analysis};
use crate::tickers::TickerMap;

/// Longest horizon accepted at the boundary; one balance is kept per simulated year.
pub const MAX_HORIZON_YEARS: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid parameter: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("service not ready: {0}")]
    NotReady(String),

    #[error(transparent)]
    Analysis(#[from] FireError),
}

impl ApiError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Analysis(e) if e.is_client_fault() => StatusCode::BAD_REQUEST,
            ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("analysis failed: {self}");
            "internal server error".to_string()
        } else {
            warn!("rejected request: {self}");
            self.to_string()
        };
        error_response(status, &message)
    }
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub years_to_retirement: i64,
    pub current_value: f64,
    pub monthly_retirement_goal: f64,
    pub monthly_savings: f64,
    pub allocations: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    readiness: Readiness,
}

#[derive(Debug, Serialize)]
struct Readiness {
    engine_active: bool,
    ticker_mapping: bool,
}

pub async fn run_http_server(port: u16, config: ServiceConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!("FIRE engine API listening on http://{addr}");

    axum::serve(listener, app).await
}

pub fn router(config: Arc<ServiceConfig>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .fallback(not_found_handler)
        .with_state(config)
}

async fn root_handler() -> Response {
    json_response(
        StatusCode::OK,
        MessageResponse {
            message: "FIRE Engine API is running.",
        },
    )
}

async fn health_handler(State(config): State<Arc<ServiceConfig>>) -> Response {
    let ready = config.ticker_map_loaded;
    let body = HealthResponse {
        status: if ready { "ok" } else { "degraded" },
        version: config.version,
        readiness: Readiness {
            engine_active: true,
            ticker_mapping: ready,
        },
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, body)
}

async fn analyze_handler(
    State(config): State<Arc<ServiceConfig>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return ApiError::invalid("body", rejection.body_text()).into_response();
        }
    };

    info!(
        "analyze request: {} allocations over {} years",
        request.allocations.len(),
        request.years_to_retirement
    );

    // Fitting and simulation are CPU-bound; keep them off the async workers.
    let outcome = tokio::task::spawn_blocking(move || analyze_payload(&config, request)).await;
    match outcome {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(e)) => e.into_response(),
        Err(join) => ApiError::Analysis(FireError::UnexpectedComputation(join.to_string()))
            .into_response(),
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

/// Validates `request`, resolves its tickers and runs the projection.
pub fn analyze_payload(
    config: &ServiceConfig,
    request: AnalyzeRequest,
) -> Result<FireReport, ApiError> {
    if !config.ticker_map_loaded {
        return Err(ApiError::NotReady("ticker mapping missing".to_string()));
    }
    let portfolio = portfolio_config(&config.tickers, request)?;
    Ok(run_analysis(
        &portfolio,
        config.prices.as_ref(),
        &config.history_start,
    )?)
}

fn portfolio_config(
    tickers: &TickerMap,
    request: AnalyzeRequest,
) -> Result<PortfolioConfig, ApiError> {
    let years_to_retirement = u32::try_from(request.years_to_retirement)
        .ok()
        .filter(|years| i64::from(*years) <= MAX_HORIZON_YEARS)
        .ok_or_else(|| {
            ApiError::invalid(
                "years_to_retirement",
                format!("must be between 0 and {MAX_HORIZON_YEARS}"),
            )
        })?;

    let current_value = finite("current_value", request.current_value)?;
    let monthly_savings = finite("monthly_savings", request.monthly_savings)?;
    let monthly_retirement_goal =
        finite("monthly_retirement_goal", request.monthly_retirement_goal)?;

    if let Some((ticker, _)) = request.allocations.iter().find(|(_, w)| !w.is_finite()) {
        return Err(ApiError::invalid(
            "allocations",
            format!("weight for {ticker} must be a finite number"),
        ));
    }

    Ok(PortfolioConfig {
        years_to_retirement,
        current_value,
        monthly_savings,
        monthly_retirement_goal,
        allocations: tickers.normalize_allocations(&request.allocations),
    })
}

fn finite(field: &str, value: f64) -> Result<f64, ApiError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ApiError::invalid(field, "must be a finite number"))
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_HISTORY_START;
    use crate::market::{InMemoryPriceSource, PriceHistory, PriceSource};
    use std::collections::HashMap;

    fn growing_source(days: usize, daily: f64) -> Arc<dyn PriceSource> {
        let dates = (0..days)
            .map(|d| format!("2015-{:02}-{:02}", d / 28 + 1, d % 28 + 1))
            .collect::<Vec<_>>();
        let column = (0..days)
            .map(|d| Some(100.0 * (1.0 + daily).powi(d as i32)))
            .collect();
        let history = PriceHistory::new(dates, BTreeMap::from([("SPY".to_string(), column)]))
            .expect("valid history");
        Arc::new(InMemoryPriceSource::new(history))
    }

    fn ready_config() -> ServiceConfig {
        let aliases = HashMap::from([("S&P 500".to_string(), "SPY".to_string())]);
        ServiceConfig::new(
            Some(TickerMap::new(aliases)),
            growing_source(250, 0.0003),
            DEFAULT_HISTORY_START,
        )
    }

    fn degraded_config() -> ServiceConfig {
        ServiceConfig::new(None, growing_source(250, 0.0003), DEFAULT_HISTORY_START)
    }

    fn sample_request() -> AnalyzeRequest {
        AnalyzeRequest {
            years_to_retirement: 10,
            current_value: 100_000.0,
            monthly_retirement_goal: 3_000.0,
            monthly_savings: 1_000.0,
            allocations: BTreeMap::from([("SPY".to_string(), 1.0)]),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    fn validation_field(err: ApiError) -> String {
        match err {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn request_parses_from_json() {
        let json = r#"{
          "years_to_retirement": 15,
          "current_value": 50000,
          "monthly_retirement_goal": 2500.5,
          "monthly_savings": 800,
          "allocations": { "s&p 500": 0.7, "QQQ": 0.3 }
        }"#;
        let request: AnalyzeRequest = serde_json::from_str(json).expect("json should parse");
        assert_eq!(request.years_to_retirement, 15);
        assert_eq!(request.current_value, 50_000.0);
        assert_eq!(request.monthly_retirement_goal, 2_500.5);
        assert_eq!(request.allocations.len(), 2);
    }

    #[test]
    fn negative_horizon_is_rejected() {
        let mut request = sample_request();
        request.years_to_retirement = -1;
        let err = analyze_payload(&ready_config(), request).expect_err("must reject");
        assert_eq!(validation_field(err), "years_to_retirement");
    }

    #[test]
    fn horizon_beyond_cap_is_rejected() {
        let mut request = sample_request();
        request.years_to_retirement = MAX_HORIZON_YEARS + 1;
        let err = analyze_payload(&ready_config(), request).expect_err("must reject");
        assert_eq!(validation_field(err), "years_to_retirement");
    }

    #[test]
    fn non_finite_money_and_weights_are_rejected() {
        let mut request = sample_request();
        request.monthly_savings = f64::NAN;
        let err = analyze_payload(&ready_config(), request).expect_err("must reject");
        assert_eq!(validation_field(err), "monthly_savings");

        let mut request = sample_request();
        request.allocations.insert("QQQ".to_string(), f64::INFINITY);
        let err = analyze_payload(&ready_config(), request).expect_err("must reject");
        assert_eq!(validation_field(err), "allocations");
    }

    #[test]
    fn aliases_are_resolved_and_merged_before_analysis() {
        let direct = analyze_payload(&ready_config(), sample_request()).expect("analysis");

        let mut aliased = sample_request();
        aliased.allocations =
            BTreeMap::from([(" s&p 500 ".to_string(), 0.6), ("spy".to_string(), 0.4)]);
        let report = analyze_payload(&ready_config(), aliased).expect("analysis");

        assert_eq!(report, direct);
    }

    #[test]
    fn degraded_service_refuses_analysis() {
        let err = analyze_payload(&degraded_config(), sample_request()).expect_err("not ready");
        assert!(matches!(err, ApiError::NotReady(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unknown_ticker_is_a_client_fault() {
        let mut request = sample_request();
        request.allocations = BTreeMap::from([("ZZZZ".to_string(), 1.0)]);
        let err = analyze_payload(&ready_config(), request).expect_err("no data");
        assert!(matches!(err, ApiError::Analysis(FireError::EmptyData(_))));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_kinds_map_to_status_codes() {
        assert_eq!(
            ApiError::invalid("x", "bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(FireError::Configuration("weights sum to zero".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(FireError::UnexpectedComputation("nan".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_faults_hide_details() {
        let response =
            ApiError::from(FireError::UnexpectedComputation("slope is NaN".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn root_reports_running() {
        let response = root_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "FIRE Engine API is running.");
    }

    #[tokio::test]
    async fn health_is_ok_when_ticker_map_loaded() {
        let response = health_handler(State(Arc::new(ready_config()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["readiness"]["engine_active"], true);
        assert_eq!(body["readiness"]["ticker_mapping"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_is_degraded_without_ticker_map() {
        let response = health_handler(State(Arc::new(degraded_config()))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["readiness"]["ticker_mapping"], false);
    }

    #[tokio::test]
    async fn analyze_returns_flat_report() {
        let response =
            analyze_handler(State(Arc::new(ready_config())), Ok(Json(sample_request()))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["reached"], false);
        assert_eq!(body["fire_target"], 900_000.0);
        assert_eq!(body["years_simulated"], 10);
        assert!(body["monthly_needed"].is_number());
        assert!(body["confidence_score"].is_number());
    }

    #[tokio::test]
    async fn analyze_omits_monthly_needed_once_reached() {
        let mut request = sample_request();
        request.monthly_retirement_goal = 100.0;
        let response = analyze_handler(State(Arc::new(ready_config())), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["reached"], true);
        assert!(body.get("monthly_needed").is_none());
    }

    #[tokio::test]
    async fn analyze_reports_not_ready_as_503() {
        let response =
            analyze_handler(State(Arc::new(degraded_config())), Ok(Json(sample_request()))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "service not ready: ticker mapping missing");
    }
}
