mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Analytics, Cache, Config, Postgres, PrincipalToken, Providers, ReasoningProviderConfig,
	Search, Security, Service, Storage,
};

use std::{collections::HashSet, fs, path::Path};

pub const CACHE_BACKENDS: [&str; 2] = ["postgres", "memory"];
pub const ROLES: [&str; 3] = ["viewer", "manager", "admin"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseText { source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let reasoning = &cfg.providers.reasoning;

	if reasoning.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.reasoning.api_key must be non-empty.".to_string(),
		});
	}
	if reasoning.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.reasoning.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("providers.reasoning.temperature", reasoning.temperature),
		("providers.reasoning.stream_temperature", reasoning.stream_temperature),
	] {
		if !value.is_finite() || !(0.0..=2.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number in the range 0.0-2.0."),
			});
		}
	}

	if reasoning.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.reasoning.default_headers values must be strings.".to_string(),
		});
	}
	if !(1..=10_000).contains(&cfg.search.max_query_chars) {
		return Err(Error::Validation {
			message: "search.max_query_chars must be in the range 1-10000.".to_string(),
		});
	}
	if cfg.search.max_field_chars == 0 {
		return Err(Error::Validation {
			message: "search.max_field_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_turn_chars == 0 {
		return Err(Error::Validation {
			message: "search.max_turn_chars must be greater than zero.".to_string(),
		});
	}
	if !CACHE_BACKENDS.contains(&cfg.cache.backend.as_str()) {
		return Err(Error::Validation {
			message: "cache.backend must be one of postgres or memory.".to_string(),
		});
	}
	if cfg.cache.search_ttl_secs <= 0 {
		return Err(Error::Validation {
			message: "cache.search_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.analytics_ttl_secs <= 0 {
		return Err(Error::Validation {
			message: "cache.analytics_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.purge_interval_secs == 0 {
		return Err(Error::Validation {
			message: "cache.purge_interval_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.analytics.max_window_days == 0 {
		return Err(Error::Validation {
			message: "analytics.max_window_days must be greater than zero.".to_string(),
		});
	}
	if cfg.analytics.popular_window_days == 0 {
		return Err(Error::Validation {
			message: "analytics.popular_window_days must be greater than zero.".to_string(),
		});
	}

	let mut tokens = HashSet::with_capacity(cfg.security.principals.len());

	for (index, principal) in cfg.security.principals.iter().enumerate() {
		if principal.token.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("security.principals[{index}].token must be non-empty."),
			});
		}
		if !ROLES.contains(&principal.role.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"security.principals[{index}].role must be one of viewer, manager, or admin."
				),
			});
		}
		if !tokens.insert(principal.token.as_str()) {
			return Err(Error::Validation {
				message: format!("security.principals[{index}].token is not unique."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.cache.backend = cfg.cache.backend.trim().to_ascii_lowercase();

	for principal in &mut cfg.security.principals {
		principal.token = principal.token.trim().to_string();
		principal.role = principal.role.trim().to_ascii_lowercase();
	}
}
