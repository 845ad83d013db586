//! HTTP API over the order manager.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use bumper_config::ApiConfig;
use bumper_core::{BumperError, OrderManager, DEFAULT_LIST_LIMIT};
use bumper_types::{Address, BatchResult, OrderStatusView, OrderSummary};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

#[derive(Clone)]
struct AppState {
	manager: OrderManager,
}

pub fn router(manager: OrderManager) -> Router {
	Router::new()
		.route("/api/health", get(health_check))
		.route("/api/bump/create", post(create_order))
		.route("/api/bump/status/{id}", get(order_status))
		.route("/api/bump/process/{id}", post(process_order))
		.route("/api/bump/cancel/{id}", post(cancel_order))
		.route("/api/bump/orders", get(list_orders))
		.route("/api/bump/orders/{id}/batches", get(order_batches))
		.with_state(AppState { manager })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the API until the task is aborted or the listener fails.
#[instrument(skip_all, fields(host = %config.host, port = config.port))]
pub async fn start_http_server(config: ApiConfig, manager: OrderManager) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
	info!("API server listening on {}:{}", config.host, config.port);

	axum::serve(listener, router(manager)).await?;
	Ok(())
}

/// Error body returned by every endpoint: `{"error": "..."}`.
pub struct ApiError(BumperError);

impl From<BumperError> for ApiError {
	fn from(error: BumperError) -> Self {
		Self(error)
	}
}

impl ApiError {
	fn status(&self) -> StatusCode {
		match &self.0 {
			BumperError::InvalidInput(_)
			| BumperError::InsufficientFunds { .. }
			| BumperError::OrderNotPending(_) => StatusCode::BAD_REQUEST,
			BumperError::OrderNotFound(_) => StatusCode::NOT_FOUND,
			BumperError::OrderAlreadyRunning(_) | BumperError::OrderNotRunning(_) => {
				StatusCode::CONFLICT
			}
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			warn!(error = %self.0, "Request failed");
		}
		(status, Json(json!({ "error": self.0.to_string() }))).into_response()
	}
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health_check() -> Json<serde_json::Value> {
	Json(json!({
		"status": "ok",
		"timestamp": chrono::Utc::now().to_rfc3339(),
	}))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
	token_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResponse {
	order_id: String,
	deposit_wallet: Address,
	message: &'static str,
}

async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> ApiResult<CreateOrderResponse> {
	let token = request
		.token_address
		.ok_or_else(|| BumperError::InvalidInput("Token address is required".to_string()))?;
	let created = state.manager.create(&token).await?;
	Ok(Json(CreateOrderResponse {
		order_id: created.order_id,
		deposit_wallet: created.deposit_wallet,
		message: "Deposit ETH to this wallet to start bumping",
	}))
}

async fn order_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<OrderStatusView> {
	Ok(Json(state.manager.status(&id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessOrderResponse {
	message: &'static str,
	order_id: String,
	total_batches: u32,
	estimated_bumps: u64,
}

async fn process_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<ProcessOrderResponse> {
	let receipt = state.manager.begin(&id).await?;
	Ok(Json(ProcessOrderResponse {
		message: "Bump order processing started",
		order_id: receipt.order_id,
		total_batches: receipt.total_batches,
		estimated_bumps: receipt.estimated_bumps,
	}))
}

async fn cancel_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
	state.manager.cancel(&id).await?;
	Ok(Json(json!({
		"message": "Cancellation requested",
		"orderId": id,
	})))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
	limit: Option<usize>,
}

async fn list_orders(
	State(state): State<AppState>,
	Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OrderSummary>> {
	let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
	Ok(Json(state.manager.list(limit).await?))
}

async fn order_batches(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<Vec<BatchResult>> {
	Ok(Json(state.manager.batches(&id).await?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use bumper_config::ConfigLoader;
	use tower::ServiceExt;

	const CONFIG: &str = r#"
[fees]
treasury = "0x1111111111111111111111111111111111111111"

[batch]
bump_amount = "0.02"

[storage]
backend = "memory"

[delivery]
provider = "http"
[delivery.config]
rpc_url = "http://127.0.0.1:1"
chain_id = 31337

[exchange]
primary = "uniswap-v3"
fallback = "uniswap-v2"

[exchange.implementations.uniswap-v3]
router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[exchange.implementations.uniswap-v2]
router = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[funding]
implementation = "disperse"
[funding.config]
contract = "0xD152f549545093347A162Dce210e7293f1452150"
"#;

	fn app() -> Router {
		let config = ConfigLoader::new()
			.with_env_prefix("BUMPER_API_TEST_UNSET_")
			.load_from_str(CONFIG)
			.unwrap();
		router(crate::builder(config).build().unwrap())
	}

	async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&body).unwrap())
	}

	fn get(uri: &str) -> Request<Body> {
		Request::get(uri).body(Body::empty()).unwrap()
	}

	fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
		Request::post(uri)
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	#[tokio::test]
	async fn test_health() {
		let (status, body) = send(app(), get("/api/health")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
		assert!(body["timestamp"].is_string());
	}

	#[tokio::test]
	async fn test_unknown_order_is_not_found() {
		let (status, body) = send(app(), get("/api/bump/status/missing")).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert!(body["error"].as_str().unwrap().contains("missing"));

		let (status, _) = send(app(), post_json("/api/bump/process/missing", json!({}))).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let (status, _) = send(app(), get("/api/bump/orders/missing/batches")).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_create_rejects_malformed_address() {
		let (status, body) = send(
			app(),
			post_json("/api/bump/create", json!({ "tokenAddress": "not-an-address" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(body["error"]
			.as_str()
			.unwrap()
			.contains("Invalid token address"));
	}

	#[tokio::test]
	async fn test_create_requires_token_address() {
		let (status, body) = send(app(), post_json("/api/bump/create", json!({}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(body["error"]
			.as_str()
			.unwrap()
			.contains("Token address is required"));
	}

	#[tokio::test]
	async fn test_empty_order_list() {
		let (status, body) = send(app(), get("/api/bump/orders?limit=10")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!([]));
	}

	#[test]
	fn test_error_status_mapping() {
		let cases = [
			(BumperError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
			(
				BumperError::InsufficientFunds {
					needed: "0.01".into(),
					available: "0".into(),
				},
				StatusCode::BAD_REQUEST,
			),
			(BumperError::OrderNotFound("x".into()), StatusCode::NOT_FOUND),
			(BumperError::OrderAlreadyRunning("x".into()), StatusCode::CONFLICT),
			(BumperError::OrderNotRunning("x".into()), StatusCode::CONFLICT),
			(
				BumperError::Configuration("x".into()),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
		];
		for (error, expected) in cases {
			assert_eq!(ApiError::from(error).status(), expected);
		}
	}
}
