use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Raw answer from the reasoning service. Ids are untrusted and must be reconciled against the
/// caller's scope before use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningAnswer {
	pub matched_ids: Vec<String>,
	pub explanation: Option<String>,
}

pub async fn complete(
	cfg: &scout_config::ReasoningProviderConfig,
	messages: &[Value],
) -> Result<ReasoningAnswer> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": { "type": "json_object" },
	});
	let res = client
		.post(crate::endpoint(cfg))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.map_err(|err| timeout_or(err, cfg.timeout_ms))?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_answer(&json)
}

pub(crate) fn timeout_or(err: reqwest::Error, timeout_ms: u64) -> Error {
	if err.is_timeout() { Error::Timeout { timeout_ms } } else { Error::Reqwest(err) }
}

fn parse_answer(json: &Value) -> Result<ReasoningAnswer> {
	let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	else {
		return Err(Error::InvalidResponse {
			message: "Reasoning response is missing message content.".to_string(),
		});
	};
	let parsed: Value = serde_json::from_str(strip_code_fence(content)).map_err(|_| {
		Error::InvalidResponse { message: "Reasoning content is not valid JSON.".to_string() }
	})?;

	if !parsed.is_object() {
		return Err(Error::InvalidResponse {
			message: "Reasoning content must be a JSON object.".to_string(),
		});
	}

	let matched_ids = parsed
		.get("results")
		.and_then(|v| v.as_array())
		.map(|items| items.iter().filter_map(result_id).collect())
		.unwrap_or_default();
	let explanation = parsed
		.get("explanation")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string);

	Ok(ReasoningAnswer { matched_ids, explanation })
}

// Entries are either bare ids or objects carrying an "id" field.
fn result_id(item: &Value) -> Option<String> {
	match item {
		Value::String(id) => Some(id.trim().to_string()),
		Value::Object(map) => map.get("id").and_then(|v| v.as_str()).map(|id| id.trim().to_string()),
		_ => None,
	}
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}
