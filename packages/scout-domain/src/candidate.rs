use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
	pub organization: String,
	pub title: String,
	#[serde(default)]
	pub period: String,
	#[serde(default)]
	pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
	pub institution: String,
	pub credential: String,
	#[serde(default)]
	pub field: String,
}

/// A résumé as the search core sees it. Owned by the résumé store and read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
	pub id: Uuid,
	pub name: String,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub location: Option<String>,
	pub skills: Vec<String>,
	pub experience: Vec<Experience>,
	pub education: Vec<Education>,
	pub salary_expectation: Option<i64>,
	pub summary: Option<String>,
}
impl CandidateRecord {
	/// "Title at Organization" entries joined in résumé order.
	pub fn experience_summary(&self) -> String {
		self.experience
			.iter()
			.map(|entry| format!("{} at {}", entry.title, entry.organization))
			.collect::<Vec<_>>()
			.join("; ")
	}

	pub fn education_summary(&self) -> String {
		self.education
			.iter()
			.map(|entry| {
				if entry.field.is_empty() {
					entry.credential.clone()
				} else {
					format!("{} in {}", entry.credential, entry.field)
				}
			})
			.collect::<Vec<_>>()
			.join("; ")
	}
}
