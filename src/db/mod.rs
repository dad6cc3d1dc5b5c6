// Modules
pub mod models;
pub mod schema;
mod store;

// Uses
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use diesel::{
	connection::SimpleConnection,
	r2d2::{ConnectionManager, CustomizeConnection, Pool},
	SqliteConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{error, info, warn};

pub use self::store::{DbStore, RollStore, StoreError};

// Embed database migrations
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// Constants
const POOL_SIZE: u32 = 16;
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_INITIAL_DELAY: Duration = Duration::from_secs(5);
const CONNECT_BACKOFF_FACTOR: f32 = 1.5;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas, applied whenever the pool opens a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
	busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
	fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
		conn.batch_execute(&format!(
			"PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
			self.busy_timeout.as_millis()
		))
		.map_err(diesel::r2d2::Error::QueryError)
	}
}

/// Establish a connection to the database.
pub fn init(database_url: &str, max_size: u32) -> Result<DbPool> {
	// Initialize the connection pool
	let pool = Pool::builder()
		.max_size(max_size)
		.connection_timeout(POOL_CONNECTION_TIMEOUT)
		.connection_customizer(Box::new(ConnectionOptions {
			busy_timeout: POOL_CONNECTION_TIMEOUT,
		}))
		.build(ConnectionManager::new(database_url))
		.with_context(|| "failed to initialize the connection pool")?;

	// Run embedded migrations to set up the database if necessary
	{
		let mut conn = pool
			.get()
			.with_context(|| "failed to get a connection for migrations")?;
		conn.run_pending_migrations(MIGRATIONS)
			.map_err(|e| anyhow!("failed to run embedded migrations: {}", e))?;
	}

	// Return the initialized connection pool
	Ok(pool)
}

/// Establish a connection to the database, retrying with exponential backoff.
///
/// Startup cannot continue without the store, so running out of attempts is
/// fatal to the caller.
pub async fn init_with_retry(database_url: &str) -> Result<DbPool> {
	let mut delay = CONNECT_INITIAL_DELAY;
	let mut attempt = 1;
	loop {
		match init(database_url, POOL_SIZE) {
			Ok(pool) => {
				info!("Successfully connected to the database");
				return Ok(pool);
			}
			Err(e) if attempt < CONNECT_ATTEMPTS => {
				warn!(
					"Database connection attempt {} failed: {:#}. Retrying in {:.1} seconds...",
					attempt,
					e,
					delay.as_secs_f32()
				);
				tokio::time::sleep(delay).await;
				delay = delay.mul_f32(CONNECT_BACKOFF_FACTOR);
				attempt += 1;
			}
			Err(e) => {
				error!("All database connection attempts failed: {:#}", e);
				return Err(e);
			}
		}
	}
}

/// An in-memory database with migrations applied, for tests.
#[cfg(test)]
pub fn test_pool() -> DbPool {
	// Every connection to `:memory:` is its own database, so keep exactly one
	init(":memory:", 1).expect("in-memory database should initialize")
}
