use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use scout_domain::{Principal, Role, query};

use crate::{
	Error, Result, ScoutService,
	cache::CacheKind,
	events::{DailyStat, EventSummary, EventWindow, PopularQuery},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
	Overview,
	Searches,
}
impl ReportType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Overview => "overview",
			Self::Searches => "searches",
		}
	}
}
impl FromStr for ReportType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"overview" => Ok(Self::Overview),
			"searches" => Ok(Self::Searches),
			_ => Err(Error::InvalidInput {
				message: "type must be one of overview or searches.".to_string(),
			}),
		}
	}
}
impl fmt::Display for ReportType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsRequest {
	pub report: ReportType,
	pub window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
	pub total_searches: u64,
	pub unique_principals: u64,
	pub avg_results: f64,
	pub cache_hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
	pub report: ReportType,
	pub window_days: u32,
	pub daily: Vec<DailyStat>,
	pub popular_queries: Vec<PopularQuery>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<ReportSummary>,
	#[serde(default)]
	pub cached: bool,
}
impl AnalyticsReport {
	fn build(req: AnalyticsRequest, summary: EventSummary) -> Self {
		let report_summary = match req.report {
			ReportType::Overview => {
				let totals = &summary.totals;
				let cache_hit_rate = if totals.searches == 0 {
					0.0
				} else {
					totals.cache_hits as f64 / totals.searches as f64
				};

				Some(ReportSummary {
					total_searches: totals.searches,
					unique_principals: totals.unique_principals,
					avg_results: totals.avg_results,
					cache_hit_rate,
				})
			},
			ReportType::Searches => None,
		};

		Self {
			report: req.report,
			window_days: req.window_days,
			daily: summary.daily,
			popular_queries: summary.popular,
			summary: report_summary,
			cached: false,
		}
	}
}

impl ScoutService {
	/// Admin-only usage report over the event log, cached for `cache.analytics_ttl_secs`.
	pub async fn analytics(
		&self,
		principal: &Principal,
		req: AnalyticsRequest,
	) -> Result<AnalyticsReport> {
		if !principal.role.at_least(Role::Admin) {
			return Err(Error::Forbidden {
				message: "Analytics requires the admin role.".to_string(),
			});
		}

		let cfg = &self.cfg.analytics;

		if !(1..=cfg.max_window_days).contains(&req.window_days) {
			return Err(Error::InvalidInput {
				message: format!("days must be in the range 1-{}.", cfg.max_window_days),
			});
		}

		let key = query::analytics_cache_key(req.report.as_str(), req.window_days);
		let now = OffsetDateTime::now_utc();

		if let Some(mut report) =
			self.cache().get_json::<AnalyticsReport>(CacheKind::Analytics, &key, now).await
		{
			report.cached = true;

			return Ok(report);
		}

		let popular_limit = match req.report {
			ReportType::Overview => cfg.overview_popular_limit,
			ReportType::Searches => cfg.searches_popular_limit,
		};
		let window = EventWindow {
			daily_since: now - Duration::days(i64::from(req.window_days)),
			popular_since: now - Duration::days(i64::from(cfg.popular_window_days)),
			popular_limit,
		};
		let summary = self.collaborators.events.summarize(window).await.map_err(|err| match err {
			Error::PersistenceUnavailable { .. } => err,
			other => Error::PersistenceUnavailable { message: other.to_string() },
		})?;
		let report = AnalyticsReport::build(req, summary);

		self.cache()
			.put_json(CacheKind::Analytics, &key, &report, self.cfg.cache.analytics_ttl_secs, now)
			.await;

		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::events::EventTotals;

	#[test]
	fn overview_carries_summary_and_hit_rate() {
		let summary = EventSummary {
			daily: Vec::new(),
			popular: Vec::new(),
			totals: EventTotals {
				searches: 4,
				unique_principals: 2,
				avg_results: 1.5,
				cache_hits: 1,
			},
		};
		let req = AnalyticsRequest { report: ReportType::Overview, window_days: 7 };
		let report = AnalyticsReport::build(req, summary);
		let summary = report.summary.expect("Overview must carry a summary.");

		assert!((summary.cache_hit_rate - 0.25).abs() < f64::EPSILON);
		assert_eq!(summary.total_searches, 4);
	}

	#[test]
	fn searches_report_has_no_summary() {
		let req = AnalyticsRequest { report: ReportType::Searches, window_days: 7 };

		assert!(AnalyticsReport::build(req, EventSummary::default()).summary.is_none());
		assert!("weekly".parse::<ReportType>().is_err());
		assert_eq!("searches".parse::<ReportType>().ok(), Some(ReportType::Searches));
	}
}
