//! Incremental chat-completion delivery over server-sent events.

use std::{collections::VecDeque, time::Duration};

use reqwest::{Client, Response};
use serde_json::Value;

use crate::{Error, Result};

const DONE_SENTINEL: &str = "[DONE]";

/// Pull-based source of answer fragments. Dropping it closes the upstream connection.
#[derive(Debug)]
pub struct FragmentStream {
	response: Option<Response>,
	decoder: SseDecoder,
	idle_timeout: Duration,
	timeout_ms: u64,
}
impl FragmentStream {
	/// Yields the next non-empty fragment, `None` once the upstream finished, or an error that
	/// ends the stream.
	pub async fn next_fragment(&mut self) -> Option<Result<String>> {
		loop {
			while let Some(event) = self.decoder.next_event() {
				match event {
					SseEvent::Done => {
						self.close();

						return None;
					},
					SseEvent::Data(payload) => match parse_delta(&payload) {
						Ok(Some(text)) => return Some(Ok(text)),
						Ok(None) => continue,
						Err(err) => {
							self.close();

							return Some(Err(err));
						},
					},
				}
			}

			let response = self.response.as_mut()?;

			match tokio::time::timeout(self.idle_timeout, response.chunk()).await {
				Err(_) => {
					self.close();

					return Some(Err(Error::Timeout { timeout_ms: self.timeout_ms }));
				},
				Ok(Err(err)) => {
					self.close();

					return Some(Err(err.into()));
				},
				Ok(Ok(Some(bytes))) => self.decoder.push(&bytes),
				Ok(Ok(None)) => {
					self.response = None;
					self.decoder.finish();
				},
			}
		}
	}

	fn close(&mut self) {
		self.response = None;
		self.decoder = SseDecoder::default();
	}
}

pub async fn stream(
	cfg: &scout_config::ReasoningProviderConfig,
	messages: &[Value],
) -> Result<FragmentStream> {
	let timeout = Duration::from_millis(cfg.timeout_ms);
	let client = Client::builder().connect_timeout(timeout).build()?;
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.stream_temperature,
		"messages": messages,
		"stream": true,
	});
	let request = client
		.post(crate::endpoint(cfg))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send();
	let res = tokio::time::timeout(timeout, request)
		.await
		.map_err(|_| Error::Timeout { timeout_ms: cfg.timeout_ms })?
		.map_err(|err| crate::completion::timeout_or(err, cfg.timeout_ms))?
		.error_for_status()?;

	Ok(FragmentStream {
		response: Some(res),
		decoder: SseDecoder::default(),
		idle_timeout: timeout,
		timeout_ms: cfg.timeout_ms,
	})
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
	Data(String),
	Done,
}

#[derive(Debug, Default)]
struct SseDecoder {
	buffer: Vec<u8>,
	ready: VecDeque<SseEvent>,
}
impl SseDecoder {
	fn push(&mut self, bytes: &[u8]) {
		self.buffer.extend_from_slice(bytes);

		while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
			let line: Vec<u8> = self.buffer.drain(..=pos).collect();

			self.accept_line(&line);
		}
	}

	fn finish(&mut self) {
		if !self.buffer.is_empty() {
			let line = std::mem::take(&mut self.buffer);

			self.accept_line(&line);
		}
	}

	fn next_event(&mut self) -> Option<SseEvent> {
		self.ready.pop_front()
	}

	fn accept_line(&mut self, raw: &[u8]) {
		let line = String::from_utf8_lossy(raw);
		let line = line.trim_end_matches(['\r', '\n']);
		let Some(data) = line.strip_prefix("data:") else {
			return;
		};
		let data = data.strip_prefix(' ').unwrap_or(data);

		if data == DONE_SENTINEL {
			self.ready.push_back(SseEvent::Done);
		} else if !data.is_empty() {
			self.ready.push_back(SseEvent::Data(data.to_string()));
		}
	}
}

fn parse_delta(payload: &str) -> Result<Option<String>> {
	let json: Value = serde_json::from_str(payload)?;
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|c| c.as_str())
		.filter(|text| !text.is_empty());

	Ok(content.map(str::to_string))
}
