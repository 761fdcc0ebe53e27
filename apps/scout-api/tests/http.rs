use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use scout_api::{routes, state::AppState};
use scout_domain::{CandidateRecord, prompt::PromptContext};
use scout_service::{
	BoxFuture, Collaborators, Error, FragmentSource, ReasoningAnswer, ReasoningGateway, Result,
	memory::{MemoryCacheStore, MemoryConversationStore, MemoryEventLog, MemoryResumeStore},
};

const VIEWER_ID: &str = "6f1c3b4e-3a55-4a8e-9e63-0d1f0d0b7b11";
const CONFIG: &str = r#"
[service]
http_bind = "127.0.0.1:0"
log_level = "info"

[storage.postgres]
dsn            = "postgres://localhost/scout"
pool_max_conns = 1

[providers.reasoning]
provider_id = "stub"
api_base    = "http://127.0.0.1:9"
api_key     = "test"
path        = "/v1/chat/completions"
model       = "stub"
temperature = 0.2
timeout_ms  = 1000

[cache]
backend = "memory"

[security]
bind_localhost_only = true

[[security.principals]]
token        = "viewer-token"
principal_id = "6f1c3b4e-3a55-4a8e-9e63-0d1f0d0b7b11"
role         = "viewer"

[[security.principals]]
token        = "admin-token"
principal_id = "2b7d4c1a-9b0f-4a36-8f2e-5c3a1e7d9f20"
role         = "admin"
"#;

struct Fragments(Vec<String>);
impl FragmentSource for Fragments {
	fn next_fragment(&mut self) -> BoxFuture<'_, Option<Result<String>>> {
		let next = if self.0.is_empty() { None } else { Some(Ok(self.0.remove(0))) };

		Box::pin(async move { next })
	}
}

/// Matches every candidate in scope, or fails every call.
struct StubGateway {
	fail: bool,
}
impl ReasoningGateway for StubGateway {
	fn complete<'a>(&'a self, prompt: &'a PromptContext) -> BoxFuture<'a, Result<ReasoningAnswer>> {
		let ids = prompt.candidate_ids.iter().map(Uuid::to_string).collect();
		let fail = self.fail;

		Box::pin(async move {
			if fail {
				return Err(Error::ReasoningUnavailable { message: "upstream 502 at 10.0.0.7".into() });
			}

			Ok(ReasoningAnswer { matched_ids: ids, explanation: Some("All of them.".to_string()) })
		})
	}

	fn stream<'a>(
		&'a self,
		_prompt: &'a PromptContext,
	) -> BoxFuture<'a, Result<Box<dyn FragmentSource>>> {
		let source = Fragments(vec!["Ada".to_string(), " fits.".to_string()]);

		Box::pin(async move { Ok(Box::new(source) as Box<dyn FragmentSource>) })
	}
}

fn candidate(name: &str) -> CandidateRecord {
	CandidateRecord {
		id: Uuid::new_v4(),
		name: name.to_string(),
		email: None,
		phone: None,
		location: Some("Berlin".to_string()),
		skills: vec!["Rust".to_string()],
		experience: Vec::new(),
		education: Vec::new(),
		salary_expectation: None,
		summary: None,
	}
}

fn app_with(fail: bool) -> Router {
	let config = scout_config::parse(CONFIG).expect("Test config must be valid.");
	let resumes = Arc::new(MemoryResumeStore::default());
	let viewer: Uuid = VIEWER_ID.parse().expect("Invalid viewer id.");

	resumes.grant(viewer, candidate("Ada"));

	let collaborators = Collaborators::new(
		resumes,
		Arc::new(MemoryConversationStore::default()),
		Arc::new(MemoryEventLog::default()),
		Arc::new(MemoryCacheStore::default()),
		Arc::new(StubGateway { fail }),
	);
	let state = AppState::from_parts(config, collaborators).expect("Failed to build app state.");

	routes::router(state)
}

fn app() -> Router {
	app_with(false)
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
	let mut builder =
		Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");

	if let Some(token) = token {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
	}

	builder.body(Body::from(body.to_string())).expect("Failed to build request.")
}

fn get_with(uri: &str, token: &str) -> Request<Body> {
	Request::builder()
		.uri(uri)
		.header(header::AUTHORIZATION, format!("Bearer {token}"))
		.body(Body::empty())
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

#[tokio::test]
async fn health_ok() {
	let response = app()
		.oneshot(
			Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthenticated() {
	for token in [None, Some("nobody")] {
		let response = app()
			.oneshot(post_json("/v1/search", token, r#"{"query":"rust"}"#))
			.await
			.expect("Failed to call search.");

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

		let json = json_body(response).await;

		assert_eq!(json["error_code"], "UNAUTHENTICATED");
		assert_eq!(json["retryable"], false);
	}
}

#[tokio::test]
async fn malformed_body_is_invalid_input() {
	let response = app()
		.oneshot(post_json("/v1/search", Some("viewer-token"), r#"{"query": 42"#))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await["error_code"], "INVALID_INPUT");
}

#[tokio::test]
async fn search_returns_scoped_results_then_caches() {
	let app = app();
	let first = app
		.clone()
		.oneshot(post_json("/v1/search", Some("viewer-token"), r#"{"query":"Rust in Berlin"}"#))
		.await
		.expect("Failed to call search.");

	assert_eq!(first.status(), StatusCode::OK);

	let first = json_body(first).await;

	assert_eq!(first["results"][0]["name"], "Ada");
	assert_eq!(first["explanation"], "All of them.");
	assert_eq!(first["cached"], false);
	assert!(first["conversation_id"].is_string());

	let second = app
		.oneshot(post_json("/v1/search", Some("viewer-token"), r#"{"query":" rust IN berlin "}"#))
		.await
		.expect("Failed to call search.");
	let second = json_body(second).await;

	assert_eq!(second["cached"], true);
	assert_eq!(second["results"], first["results"]);
}

#[tokio::test]
async fn empty_query_is_rejected() {
	let response = app()
		.oneshot(post_json("/v1/search", Some("viewer-token"), r#"{"query":"   "}"#))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await["message"], "query must be non-empty.");
}

#[tokio::test]
async fn stream_emits_fragments_then_done() {
	let response = app()
		.oneshot(post_json("/v1/search/stream", Some("viewer-token"), r#"{"query":"rust"}"#))
		.await
		.expect("Failed to call stream.");

	assert_eq!(response.status(), StatusCode::OK);
	assert!(
		response
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.starts_with("text/event-stream"))
	);

	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let text = String::from_utf8(body.to_vec()).expect("Stream must be UTF-8.");

	assert_eq!(
		text,
		"data: {\"content\":\"Ada\"}\n\ndata: {\"content\":\" fits.\"}\n\ndata: [DONE]\n\n"
	);
}

#[tokio::test]
async fn stream_rejects_conversation_ids() {
	let body = format!(r#"{{"query":"rust","conversation_id":"{}"}}"#, Uuid::new_v4());
	let response = app()
		.oneshot(post_json("/v1/search/stream", Some("viewer-token"), &body))
		.await
		.expect("Failed to call stream.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_conversation_is_forbidden() {
	let body = format!(r#"{{"query":"rust","conversation_id":"{}"}}"#, Uuid::new_v4());
	let response = app()
		.oneshot(post_json("/v1/search", Some("viewer-token"), &body))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(json_body(response).await["error_code"], "FORBIDDEN");
}

#[tokio::test]
async fn reasoning_failure_is_retryable_and_opaque() {
	let response = app_with(true)
		.oneshot(post_json("/v1/search", Some("viewer-token"), r#"{"query":"rust"}"#))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "REASONING_UNAVAILABLE");
	assert_eq!(json["retryable"], true);
	assert!(!json["message"].as_str().unwrap_or_default().contains("10.0.0.7"));
}

#[tokio::test]
async fn analytics_is_admin_only() {
	let response = app()
		.oneshot(get_with("/v1/analytics?type=overview&days=7", "viewer-token"))
		.await
		.expect("Failed to call analytics.");

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn analytics_overview_defaults() {
	let response = app()
		.oneshot(get_with("/v1/analytics", "admin-token"))
		.await
		.expect("Failed to call analytics.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["report"], "overview");
	assert_eq!(json["window_days"], 7);
	assert_eq!(json["cached"], false);
	assert_eq!(json["summary"]["total_searches"], 0);
}

#[tokio::test]
async fn analytics_rejects_bad_parameters() {
	for uri in [
		"/v1/analytics?type=funnel&days=7",
		"/v1/analytics?type=searches&days=0",
		"/v1/analytics?type=searches&days=lots",
	] {
		let response =
			app().oneshot(get_with(uri, "admin-token")).await.expect("Failed to call analytics.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
		assert_eq!(json_body(response).await["error_code"], "INVALID_INPUT");
	}
}
