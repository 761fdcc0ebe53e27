use std::convert::Infallible;

use axum::{
	Json, Router,
	extract::{
		Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{
		IntoResponse, Response,
		sse::{Event, Sse},
	},
	routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scout_domain::{Principal, Turn};
use scout_service::{
	AnalyticsReport, AnalyticsRequest, DeliveryMode, Error, ReportType, SearchOutcome,
	SearchRequest,
};

use crate::state::AppState;

const DEFAULT_REPORT: &str = "overview";
const DEFAULT_WINDOW_DAYS: u32 = 7;
const REASONING_UNAVAILABLE_MESSAGE: &str =
	"The reasoning service is temporarily unavailable. Please retry.";
const PERSISTENCE_UNAVAILABLE_MESSAGE: &str = "Search storage is temporarily unavailable.";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/search/stream", post(search_stream))
		.route("/v1/analytics", get(analytics))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
	pub query: String,
	#[serde(default)]
	pub conversation_id: Option<Uuid>,
	#[serde(default)]
	pub history: Vec<Turn>,
}
impl SearchBody {
	fn into_request(self, delivery: DeliveryMode) -> SearchRequest {
		SearchRequest {
			query: self.query,
			conversation_id: self.conversation_id,
			history: self.history,
			delivery,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
	#[serde(rename = "type")]
	pub report: Option<String>,
	pub days: Option<u32>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Response, ApiError> {
	let principal = authenticate(&state, &headers)?;
	let Json(body) = payload.map_err(invalid_body)?;
	let outcome = state.service.search(&principal, body.into_request(DeliveryMode::Complete)).await?;

	Ok(respond(outcome))
}

async fn search_stream(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Response, ApiError> {
	let principal = authenticate(&state, &headers)?;
	let Json(body) = payload.map_err(invalid_body)?;
	let outcome = state.service.search(&principal, body.into_request(DeliveryMode::Stream)).await?;

	Ok(respond(outcome))
}

async fn analytics(
	State(state): State<AppState>,
	headers: HeaderMap,
	params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<AnalyticsReport>, ApiError> {
	let principal = authenticate(&state, &headers)?;
	let Query(params) = params.map_err(|_| {
		ApiError::from(Error::InvalidInput {
			message: "days must be a positive integer.".to_string(),
		})
	})?;
	let report: ReportType = params.report.as_deref().unwrap_or(DEFAULT_REPORT).parse()?;
	let req =
		AnalyticsRequest { report, window_days: params.days.unwrap_or(DEFAULT_WINDOW_DAYS) };
	let response = state.service.analytics(&principal, req).await?;

	Ok(Json(response))
}

fn respond(outcome: SearchOutcome) -> Response {
	match outcome {
		SearchOutcome::Complete(response) => Json(response).into_response(),
		SearchOutcome::Stream(frames) => {
			let events = frames.map(|frame| Ok::<_, Infallible>(Event::default().data(frame.data())));

			Sse::new(events).into_response()
		},
	}
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
	read_bearer_token(headers)
		.and_then(|token| state.principal(token))
		.cloned()
		.ok_or_else(|| ApiError::from(Error::Unauthenticated))
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
	tracing::debug!(error = %rejection, "Rejected request body.");

	ApiError::from(Error::InvalidInput {
		message: "Request body must be a JSON object with a string query.".to_string(),
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
	retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
	retryable: bool,
}
impl ApiError {
	fn new(status: StatusCode, err: &Error, message: impl Into<String>) -> Self {
		Self {
			status,
			error_code: err.code(),
			message: message.into(),
			retryable: err.is_retryable(),
		}
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match &err {
			Error::Unauthenticated =>
				Self::new(StatusCode::UNAUTHORIZED, &err, "Authentication required."),
			Error::Forbidden { message } => Self::new(StatusCode::FORBIDDEN, &err, message.clone()),
			Error::InvalidInput { message } =>
				Self::new(StatusCode::BAD_REQUEST, &err, message.clone()),
			Error::ReasoningUnavailable { .. } => {
				tracing::error!(error_code = err.code(), error = %err, "Search request failed.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, &err, REASONING_UNAVAILABLE_MESSAGE)
			},
			Error::PersistenceUnavailable { .. } => {
				tracing::error!(error_code = err.code(), error = %err, "Search request failed.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, &err, PERSISTENCE_UNAVAILABLE_MESSAGE)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			retryable: self.retryable,
		};

		(self.status, Json(body)).into_response()
	}
}
