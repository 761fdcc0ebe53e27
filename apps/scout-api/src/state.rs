use std::{collections::HashMap, sync::Arc, time::Duration};

use color_eyre::eyre;

use scout_config::{Config, PrincipalToken};
use scout_domain::{Principal, Role};
use scout_service::{Collaborators, ScoutService, pg};
use scout_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ScoutService>,
	principals: Arc<HashMap<String, Principal>>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		if config.cache.backend == "postgres" {
			let every = Duration::from_secs(config.cache.purge_interval_secs);

			tokio::spawn(pg::run_cache_purge(db.clone(), every));
		}

		let collaborators = Collaborators::from_config(&config, db);

		Self::from_parts(config, collaborators)
	}

	/// Builds the state around already-constructed collaborators.
	pub fn from_parts(config: Config, collaborators: Collaborators) -> color_eyre::Result<Self> {
		let principals = principal_table(&config.security.principals)?;
		let service = ScoutService::new(config, collaborators);

		Ok(Self { service: Arc::new(service), principals: Arc::new(principals) })
	}

	pub fn principal(&self, token: &str) -> Option<&Principal> {
		self.principals.get(token)
	}
}

fn principal_table(entries: &[PrincipalToken]) -> color_eyre::Result<HashMap<String, Principal>> {
	entries
		.iter()
		.map(|entry| {
			let role: Role = entry.role.parse().map_err(|err: String| eyre::eyre!(err))?;

			Ok((entry.token.clone(), Principal::new(entry.principal_id, role)))
		})
		.collect()
}
