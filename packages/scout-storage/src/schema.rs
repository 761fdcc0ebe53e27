pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_candidates.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_candidates.sql")),
				"tables/002_candidate_grants.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_candidate_grants.sql")),
				"tables/003_conversations.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_conversations.sql")),
				"tables/004_search_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_search_events.sql")),
				"tables/005_kv_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_kv_cache.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in ["candidates", "candidate_grants", "conversations", "search_events", "kv_cache"]
		{
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")), "{table}");
		}
	}
}
