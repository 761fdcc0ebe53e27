use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
	Empty,
	TooLong { max_chars: u32 },
	ControlCharacters,
}
impl QueryError {
	pub fn message(self) -> String {
		match self {
			Self::Empty => "query must be non-empty.".to_string(),
			Self::TooLong { max_chars } => format!("query must be at most {max_chars} characters."),
			Self::ControlCharacters => "query must not contain control characters.".to_string(),
		}
	}
}

/// Checks a raw query and returns it with surrounding whitespace removed.
pub fn validate_query(raw: &str, max_chars: u32) -> Result<&str, QueryError> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Err(QueryError::Empty);
	}
	if trimmed.chars().count() > max_chars as usize {
		return Err(QueryError::TooLong { max_chars });
	}
	if trimmed.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
		return Err(QueryError::ControlCharacters);
	}

	Ok(trimmed)
}

/// Lowercased, trimmed form used for cache identity.
pub fn normalize_query(query: &str) -> String {
	query.trim().to_lowercase()
}

pub fn search_cache_key(principal_id: Uuid, query: &str) -> String {
	format!("search:{principal_id}:{}", normalize_query(query))
}

pub fn analytics_cache_key(report_type: &str, window_days: u32) -> String {
	format!("analytics:{report_type}:{window_days}")
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> i64 {
	text.chars().count().div_ceil(4) as i64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn case_and_surrounding_whitespace_share_a_key() {
		let principal = Uuid::new_v4();

		assert_eq!(
			search_cache_key(principal, "  Senior RUST Engineers "),
			search_cache_key(principal, "senior rust engineers")
		);
	}

	#[test]
	fn keys_are_scoped_per_principal() {
		assert_ne!(
			search_cache_key(Uuid::new_v4(), "rust"),
			search_cache_key(Uuid::new_v4(), "rust")
		);
	}

	#[test]
	fn key_formats_are_stable() {
		let principal = Uuid::nil();

		assert_eq!(
			search_cache_key(principal, "Go"),
			"search:00000000-0000-0000-0000-000000000000:go"
		);
		assert_eq!(analytics_cache_key("overview", 7), "analytics:overview:7");
	}

	#[test]
	fn validation_bounds_length_in_characters() {
		let at_limit = "é".repeat(500);
		let over_limit = "é".repeat(501);

		assert_eq!(validate_query(&at_limit, 500), Ok(at_limit.as_str()));
		assert_eq!(validate_query(&over_limit, 500), Err(QueryError::TooLong { max_chars: 500 }));
	}

	#[test]
	fn validation_rejects_blank_and_control_input() {
		assert_eq!(validate_query("   ", 500), Err(QueryError::Empty));
		assert_eq!(validate_query("rust\u{0}go", 500), Err(QueryError::ControlCharacters));
		assert_eq!(validate_query(" rust\tgo ", 500), Ok("rust\tgo"));
	}

	#[test]
	fn token_estimate_rounds_up() {
		assert_eq!(estimate_tokens(""), 0);
		assert_eq!(estimate_tokens("abcd"), 1);
		assert_eq!(estimate_tokens("abcde"), 2);
	}
}
