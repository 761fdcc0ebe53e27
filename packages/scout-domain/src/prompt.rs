//! Prompt assembly for the reasoning service.
//!
//! The assembler is a pure function of the caller's visible candidates, the thread history,
//! and the new query. Every visible candidate is listed; free-text fields and history are
//! bounded by [`PromptLimits`] so the context size grows only with the number of candidates.

use std::borrow::Cow;

use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::{CandidateRecord, Turn};

pub const EMPTY_SCOPE_EXPLANATION: &str = "No resumes available for search.";

const TRUNCATION_MARK: &str = "…";
const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
	/// Ask for a JSON object with matched ids and an explanation.
	Structured,
	/// Ask for a free-form conversational answer, delivered incrementally.
	Conversational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
	pub max_history_turns: usize,
	pub max_field_chars: usize,
	pub max_turn_chars: usize,
}
impl From<&scout_config::Search> for PromptLimits {
	fn from(cfg: &scout_config::Search) -> Self {
		Self {
			max_history_turns: cfg.max_history_turns as usize,
			max_field_chars: cfg.max_field_chars as usize,
			max_turn_chars: cfg.max_turn_chars as usize,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
	pub style: PromptStyle,
	pub instruction: String,
	pub corpus: String,
	pub history: Vec<Turn>,
	pub query: String,
	/// Ids the answer is allowed to reference, in corpus order.
	pub candidate_ids: Vec<Uuid>,
}
impl PromptContext {
	/// Chat-completion messages: instruction, corpus, history, then the new query.
	pub fn messages(&self) -> Vec<Value> {
		let mut messages = Vec::with_capacity(self.history.len() + 3);

		messages.push(serde_json::json!({ "role": "system", "content": self.instruction }));
		messages.push(serde_json::json!({ "role": "system", "content": self.corpus }));

		for turn in &self.history {
			messages.push(serde_json::json!({ "role": turn.role.as_str(), "content": turn.text }));
		}

		messages.push(serde_json::json!({ "role": "user", "content": self.query }));

		messages
	}
}

/// Returns `None` when there is nothing to search; callers must not contact the reasoning
/// service in that case.
pub fn assemble(
	candidates: &[CandidateRecord],
	history: &[Turn],
	query: &str,
	style: PromptStyle,
	limits: PromptLimits,
) -> Option<PromptContext> {
	if candidates.is_empty() {
		return None;
	}

	let corpus = candidates
		.iter()
		.enumerate()
		.map(|(index, record)| describe_candidate(index, record, limits.max_field_chars))
		.collect::<Vec<_>>()
		.join("\n\n");
	let skip = history.len().saturating_sub(limits.max_history_turns);

	Some(PromptContext {
		style,
		instruction: instruction(style, candidates.len()),
		corpus: format!("Available resumes:\n{corpus}"),
		history: history[skip..]
			.iter()
			.map(|turn| Turn {
				role: turn.role,
				text: bounded(&turn.text, limits.max_turn_chars).into_owned(),
			})
			.collect(),
		query: query.to_string(),
		candidate_ids: candidates.iter().map(|record| record.id).collect(),
	})
}

fn instruction(style: PromptStyle, count: usize) -> String {
	match style {
		PromptStyle::Structured => format!(
			"You are a resume search assistant with access to {count} resumes. \
Weigh each candidate's skills, work history and career progression, education, location, \
and salary expectation against the request.\n\
Reply with a JSON object containing exactly two keys: \"results\", an array of matching \
resume IDs ordered from best to weakest match, and \"explanation\", a short summary of why \
they match. Only use IDs that appear in the resume list. Return an empty array when nothing \
matches."
		),
		PromptStyle::Conversational => format!(
			"You are a helpful resume search assistant with access to {count} resumes. \
Answer conversationally about the candidates that fit the request and refer to them by name. \
Only discuss candidates from the resume list."
		),
	}
}

fn describe_candidate(index: usize, record: &CandidateRecord, max_chars: usize) -> String {
	let optional = |value: &Option<String>| match value.as_deref() {
		Some(text) if !text.trim().is_empty() => bounded(text, max_chars).into_owned(),
		_ => NOT_SPECIFIED.to_string(),
	};
	let salary = record
		.salary_expectation
		.map(|amount| format!("${amount}"))
		.unwrap_or_else(|| NOT_SPECIFIED.to_string());
	let mut out = format!("Resume {} (ID: {}):\n", index + 1, record.id);

	out.push_str(&format!("Name: {}\n", bounded(&record.name, max_chars)));
	out.push_str(&format!("Email: {}\n", optional(&record.email)));
	out.push_str(&format!("Location: {}\n", optional(&record.location)));
	out.push_str(&format!("Skills: {}\n", bounded(&record.skills.join(", "), max_chars)));
	out.push_str(&format!("Experience: {}\n", bounded(&record.experience_summary(), max_chars)));
	out.push_str(&format!("Education: {}\n", bounded(&record.education_summary(), max_chars)));
	out.push_str(&format!("Salary Expectation: {salary}\n"));
	out.push_str(&format!("Summary: {}", optional(&record.summary)));

	out
}

/// Cuts `text` to at most `max_chars` grapheme clusters, marking the cut.
pub fn bounded(text: &str, max_chars: usize) -> Cow<'_, str> {
	let mut graphemes = text.grapheme_indices(true);

	match graphemes.nth(max_chars) {
		None => Cow::Borrowed(text),
		Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARK}", text[..cut].trim_end())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Education, Experience, TurnRole};

	fn limits() -> PromptLimits {
		PromptLimits { max_history_turns: 4, max_field_chars: 40, max_turn_chars: 60 }
	}

	fn candidate(name: &str, skills: &[&str]) -> CandidateRecord {
		CandidateRecord {
			id: Uuid::new_v4(),
			name: name.to_string(),
			email: Some(format!("{}@example.com", name.to_lowercase())),
			phone: None,
			location: None,
			skills: skills.iter().map(|s| s.to_string()).collect(),
			experience: vec![Experience {
				organization: "Acme".to_string(),
				title: "Engineer".to_string(),
				period: "2019-2023".to_string(),
				description: String::new(),
			}],
			education: vec![Education {
				institution: "State".to_string(),
				credential: "BSc".to_string(),
				field: "Computer Science".to_string(),
			}],
			salary_expectation: Some(120_000),
			summary: None,
		}
	}

	#[test]
	fn empty_scope_short_circuits() {
		assert!(assemble(&[], &[], "rust", PromptStyle::Structured, limits()).is_none());
	}

	#[test]
	fn enumerates_every_candidate_with_required_fields() {
		let records = vec![candidate("Ada", &["Rust", "Go"]), candidate("Linus", &["C"])];
		let prompt = assemble(&records, &[], "systems people", PromptStyle::Structured, limits())
			.expect("Expected a prompt.");

		assert_eq!(prompt.candidate_ids, vec![records[0].id, records[1].id]);

		for record in &records {
			assert!(prompt.corpus.contains(&format!("(ID: {})", record.id)));
			assert!(prompt.corpus.contains(&format!("Name: {}", record.name)));
		}

		assert!(prompt.corpus.contains("Skills: Rust, Go"));
		assert!(prompt.corpus.contains("Experience: Engineer at Acme"));
		assert!(prompt.corpus.contains("Education: BSc in Computer Science"));
		assert!(prompt.corpus.contains("Location: Not specified"));
		assert!(prompt.instruction.contains("\"results\""));
	}

	#[test]
	fn history_is_bounded_to_most_recent_turns() {
		let history: Vec<Turn> = (0..6).map(|i| Turn::user(format!("turn {i}"))).collect();
		let prompt = assemble(
			&[candidate("Ada", &["Rust"])],
			&history,
			"next",
			PromptStyle::Conversational,
			limits(),
		)
		.expect("Expected a prompt.");

		assert_eq!(prompt.history.len(), 4);
		assert_eq!(prompt.history[0].text, "turn 2");
	}

	#[test]
	fn history_turn_text_is_bounded() {
		let history = vec![Turn::user("x".repeat(2_000_000)), Turn::assistant("short")];
		let prompt = assemble(
			&[candidate("Ada", &["Rust"])],
			&history,
			"next",
			PromptStyle::Structured,
			limits(),
		)
		.expect("Expected a prompt.");

		assert_eq!(prompt.history[0].text.chars().count(), 61);
		assert_eq!(prompt.history[0].role, TurnRole::User);
		assert_eq!(prompt.history[1].text, "short");
	}

	#[test]
	fn long_names_are_bounded() {
		let name = "A".repeat(500);
		let prompt = assemble(
			&[candidate(&name, &["Rust"])],
			&[],
			"rust",
			PromptStyle::Structured,
			limits(),
		)
		.expect("Expected a prompt.");

		assert!(!prompt.corpus.contains(&name));
		assert!(prompt.corpus.contains(&format!("Name: {}{TRUNCATION_MARK}", "A".repeat(40))));
	}

	#[test]
	fn messages_end_with_the_new_query() {
		let history = vec![Turn::user("rust"), Turn::assistant("Ada matches.")];
		let prompt = assemble(
			&[candidate("Ada", &["Rust"])],
			&history,
			"and go?",
			PromptStyle::Structured,
			limits(),
		)
		.expect("Expected a prompt.");
		let messages = prompt.messages();

		assert_eq!(messages.len(), 5);
		assert_eq!(messages[3]["role"], TurnRole::Assistant.as_str());
		assert_eq!(messages[4]["role"], "user");
		assert_eq!(messages[4]["content"], "and go?");
	}

	#[test]
	fn long_fields_are_cut_on_grapheme_boundaries() {
		let text = "é".repeat(50);
		let cut = bounded(&text, 40);

		assert_eq!(cut.chars().count(), 41);
		assert!(cut.ends_with(TRUNCATION_MARK));
		assert_eq!(bounded("short", 40), "short");
	}
}
