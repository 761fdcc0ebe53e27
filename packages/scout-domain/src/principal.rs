use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tier of an authenticated principal. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Viewer,
	Manager,
	Admin,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Viewer => "viewer",
			Self::Manager => "manager",
			Self::Admin => "admin",
		}
	}

	pub fn at_least(self, required: Role) -> bool {
		self >= required
	}
}
impl FromStr for Role {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"viewer" => Ok(Self::Viewer),
			"manager" => Ok(Self::Manager),
			"admin" => Ok(Self::Admin),
			other => Err(format!("Unknown role {other:?}.")),
		}
	}
}
impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The authenticated identity a request runs as. Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	pub id: Uuid,
	pub role: Role,
}
impl Principal {
	pub fn new(id: Uuid, role: Role) -> Self {
		Self { id, role }
	}
}
