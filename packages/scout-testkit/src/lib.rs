//! Disposable Postgres databases for storage integration tests.
//!
//! Each [`TestDatabase`] is a fresh database created next to the one named by `SCOUT_PG_DSN`, so
//! tests can bootstrap the schema and write rows without seeing each other's data.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

pub const DSN_ENV: &str = "SCOUT_PG_DSN";

const MAINTENANCE_DATABASE: &str = "postgres";

pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// `Ok(None)` when `SCOUT_PG_DSN` is unset or blank.
	pub async fn from_env() -> Result<Option<Self>> {
		match env_dsn() {
			Some(base_dsn) => Self::create(&base_dsn).await.map(Some),
			None => Ok(None),
		}
	}

	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("{DSN_ENV} is not a valid Postgres DSN: {err}.")))?;
		let maintenance = base.clone().database(MAINTENANCE_DATABASE);
		let name = format!("scout_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&maintenance).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Storage settings pointing at this database.
	pub fn postgres(&self, pool_max_conns: u32) -> scout_config::Postgres {
		scout_config::Postgres { dsn: self.dsn.clone(), pool_max_conns }
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.maintenance).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let maintenance = self.maintenance.clone();
		// A separate thread with its own runtime, since the test runtime may still be driving us.
		let handle = thread::spawn(move || {
			let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
				eprintln!("Could not start a runtime to drop {name}.");

				return;
			};

			if let Err(err) = runtime.block_on(drop_database(&name, &maintenance)) {
				eprintln!("Failed to drop {name}: {err}.");
			}
		});

		let _ = handle.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance).await?;

	sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await?;
	sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{name}""#)).execute(&mut conn).await?;

	Ok(())
}
