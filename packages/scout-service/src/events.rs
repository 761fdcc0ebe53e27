use std::collections::{HashMap, HashSet};

use time::OffsetDateTime;
use uuid::Uuid;

/// One completed blocking search, whichever path served it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEvent {
	pub principal_id: Uuid,
	pub query: String,
	pub normalized_query: String,
	pub conversation_id: Option<Uuid>,
	pub result_count: u32,
	pub tokens_used: i64,
	pub latency_ms: i64,
	pub cache_hit: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
	/// Lower bound for the daily series and totals.
	pub daily_since: OffsetDateTime,
	/// Lower bound for popular queries.
	pub popular_since: OffsetDateTime,
	pub popular_limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyStat {
	/// UTC day, `YYYY-MM-DD`.
	pub day: String,
	pub searches: u64,
	pub unique_principals: u64,
	pub avg_results: f64,
	pub avg_latency_ms: f64,
	pub cache_hits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PopularQuery {
	pub query: String,
	pub searches: u64,
	pub avg_results: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTotals {
	pub searches: u64,
	pub unique_principals: u64,
	pub avg_results: f64,
	pub cache_hits: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSummary {
	pub daily: Vec<DailyStat>,
	pub popular: Vec<PopularQuery>,
	pub totals: EventTotals,
}

/// Aggregates events in memory. Mirrors the grouping and ordering of the SQL reports: days
/// ascending, popular queries by count descending then query text.
pub fn summarize_events(events: &[SearchEvent], window: EventWindow) -> EventSummary {
	let recent: Vec<&SearchEvent> =
		events.iter().filter(|event| event.created_at >= window.daily_since).collect();
	let mut by_day: HashMap<String, Vec<&SearchEvent>> = HashMap::new();

	for event in &recent {
		by_day.entry(utc_day(event.created_at)).or_default().push(event);
	}

	let mut daily: Vec<DailyStat> = by_day
		.into_iter()
		.map(|(day, group)| DailyStat {
			day,
			searches: group.len() as u64,
			unique_principals: unique_principals(&group),
			avg_results: mean(group.iter().map(|event| f64::from(event.result_count))),
			avg_latency_ms: mean(group.iter().map(|event| event.latency_ms as f64)),
			cache_hits: group.iter().filter(|event| event.cache_hit).count() as u64,
		})
		.collect();

	daily.sort_by(|a, b| a.day.cmp(&b.day));

	let mut by_query: HashMap<&str, Vec<u32>> = HashMap::new();

	for event in events.iter().filter(|event| event.created_at >= window.popular_since) {
		by_query.entry(event.normalized_query.as_str()).or_default().push(event.result_count);
	}

	let mut popular: Vec<PopularQuery> = by_query
		.into_iter()
		.map(|(query, counts)| PopularQuery {
			query: query.to_string(),
			searches: counts.len() as u64,
			avg_results: mean(counts.iter().map(|count| f64::from(*count))),
		})
		.collect();

	popular.sort_by(|a, b| b.searches.cmp(&a.searches).then_with(|| a.query.cmp(&b.query)));
	popular.truncate(window.popular_limit as usize);

	let totals = EventTotals {
		searches: recent.len() as u64,
		unique_principals: unique_principals(&recent),
		avg_results: mean(recent.iter().map(|event| f64::from(event.result_count))),
		cache_hits: recent.iter().filter(|event| event.cache_hit).count() as u64,
	};

	EventSummary { daily, popular, totals }
}

pub(crate) fn utc_day(at: OffsetDateTime) -> String {
	let date = at.to_offset(time::UtcOffset::UTC).date();

	format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

fn unique_principals(events: &[&SearchEvent]) -> u64 {
	events.iter().map(|event| event.principal_id).collect::<HashSet<_>>().len() as u64
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
	let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), value| (sum + value, count + 1));

	if count == 0 { 0.0 } else { sum / f64::from(count) }
}
