//! HTTP API for the swap router.

use axum::{
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
};
use router_core::{Router, SwapQuote, SwapRequest};
use router_types::RouterError;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

pub struct ApiServer {
	port: u16,
	name: String,
	router: Arc<Router>,
}

impl ApiServer {
	pub fn new(port: u16, name: String, router: Arc<Router>) -> Self {
		Self { port, name, router }
	}

	#[instrument(skip_all, fields(port = self.port))]
	pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let app = app(AppState {
			name: Arc::from(self.name),
			router: self.router,
		});

		let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", self.port)).await?;

		info!("API server listening on port {}", self.port);

		axum::serve(listener, app)
			.with_graceful_shutdown(shutdown)
			.await?;

		Ok(())
	}
}

#[derive(Clone)]
struct AppState {
	name: Arc<str>,
	router: Arc<Router>,
}

fn app(state: AppState) -> axum::Router {
	axum::Router::new()
		.route("/health", get(health_check))
		.route("/api/swap/quote", post(handle_quote))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
	Json(serde_json::json!({
		"status": "ok",
		"router": state.name.as_ref(),
	}))
}

async fn handle_quote(
	State(state): State<AppState>,
	Json(request): Json<SwapRequest>,
) -> Result<Json<SwapQuote>, ApiError> {
	match state.router.route(&request).await {
		Ok(quote) => Ok(Json(quote)),
		Err(e) => {
			warn!("Quote request failed: {}", e);
			Err(ApiError(e))
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
	error: &'static str,
	message: String,
}

struct ApiError(RouterError);

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, error) = match &self.0 {
			RouterError::Configuration(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			RouterError::NoOptimalPath => (StatusCode::UNPROCESSABLE_ENTITY, "NO_OPTIMAL_PATH"),
			RouterError::SourceUnavailable { .. } | RouterError::Quote(_) => {
				(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
			}
			RouterError::InvalidSample { .. } | RouterError::Materialization(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
			}
		};
		let body = ErrorResponse {
			error,
			message: self.0.to_string(),
		};
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use router_config::ConfigLoader;
	use router_core::RouterBuilder;
	use tower::ServiceExt;

	const CONFIG: &str = r#"
[router]
name = "api-test"

[routing]
num_samples = 3
sample_distribution_base = 1
bridge_slippage = 0

[sampler]
implementation = "rate_table"

[sampler.curves]
Uniswap = ["${UNISWAP_RATE}"]

[sampler.decimals]
"0x1111111111111111111111111111111111111111" = 6

[order.bridges]
Uniswap = "0x4141414141414141414141414141414141414141"
"#;

	fn state(rate: &str) -> AppState {
		let config = ConfigLoader::new()
			.load_str(&CONFIG.replace("${UNISWAP_RATE}", rate))
			.unwrap();
		let router = crate::factories::register(RouterBuilder::new(config))
			.build()
			.unwrap();
		AppState {
			name: Arc::from("api-test"),
			router: Arc::new(router),
		}
	}

	fn quote_request(body: serde_json::Value) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/api/swap/quote")
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	fn sell_body() -> serde_json::Value {
		serde_json::json!({
			"makerToken": "0x1111111111111111111111111111111111111111",
			"takerToken": "0x2222222222222222222222222222222222222222",
			"amount": "1000000000000000000",
			"side": "sell",
		})
	}

	async fn json(response: Response) -> serde_json::Value {
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_health() {
		let response = app(state("0.00000000032"))
			.oneshot(Request::get("/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(json(response).await["router"], "api-test");
	}

	#[tokio::test]
	async fn test_quote_returns_orders() {
		let response = app(state("0.00000000032"))
			.oneshot(quote_request(sell_body()))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);

		let body = json(response).await;
		assert_eq!(body["report"]["sources"], serde_json::json!(["Uniswap"]));
		assert_eq!(body["report"]["optimizerRuns"], 1);
		assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));
		assert_eq!(
			body["orders"][0]["order"]["makerAddress"],
			"0x4141414141414141414141414141414141414141"
		);
	}

	#[tokio::test]
	async fn test_unreachable_amount_is_unprocessable() {
		let response = app(state("0"))
			.oneshot(quote_request(sell_body()))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(json(response).await["error"], "NO_OPTIMAL_PATH");
	}

	#[tokio::test]
	async fn test_conflicting_filters_are_rejected() {
		let mut body = sell_body();
		body["includedSources"] = serde_json::json!(["Uniswap"]);
		body["excludedSources"] = serde_json::json!(["Kyber"]);

		let response = app(state("0.00000000032"))
			.oneshot(quote_request(body))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(json(response).await["error"], "INVALID_REQUEST");
	}
}
