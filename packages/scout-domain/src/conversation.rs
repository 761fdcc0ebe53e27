use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::CandidateRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
	User,
	Assistant,
}
impl TurnRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
	pub role: TurnRole,
	pub text: String,
}
impl Turn {
	pub fn user(text: impl Into<String>) -> Self {
		Self { role: TurnRole::User, text: text.into() }
	}

	pub fn assistant(text: impl Into<String>) -> Self {
		Self { role: TurnRole::Assistant, text: text.into() }
	}
}

/// Compact reference to a matched candidate, kept as the thread's last-result summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
	pub id: Uuid,
	pub name: String,
}
impl From<&CandidateRecord> for MatchSummary {
	fn from(record: &CandidateRecord) -> Self {
		Self { id: record.id, name: record.name.clone() }
	}
}

/// The mutable part of a thread. Stores replace it wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
	pub turns: Vec<Turn>,
	pub last_query: Option<String>,
	pub last_results: Vec<MatchSummary>,
}
impl ConversationContext {
	/// Builds the next context: `base` followed by exactly one user turn and one assistant turn.
	pub fn advance(
		base: &[Turn],
		query: &str,
		explanation: &str,
		matched: &[CandidateRecord],
	) -> Self {
		let mut turns = Vec::with_capacity(base.len() + 2);

		turns.extend_from_slice(base);
		turns.push(Turn::user(query));
		turns.push(Turn::assistant(explanation));

		Self {
			turns,
			last_query: Some(query.to_string()),
			last_results: matched.iter().map(MatchSummary::from).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationThread {
	pub id: Uuid,
	pub owner_id: Uuid,
	#[serde(flatten)]
	pub context: ConversationContext,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl ConversationThread {
	pub fn turns(&self) -> &[Turn] {
		&self.context.turns
	}

	pub fn is_owned_by(&self, principal_id: Uuid) -> bool {
		self.owner_id == principal_id
	}
}
