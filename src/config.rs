// Uses
use std::{collections::HashSet, env, time::Duration};

use anyhow::{anyhow, Context, Result};
use serenity::all::UserId;

use crate::constants::{
	ADMIN_ID_KEYS,
	ADMIN_PANEL_TIMEOUT_KEY,
	DATABASE_URL_KEY,
	DEFAULT_ADMIN_PANEL_TIMEOUT_SECS,
	DEFAULT_MAX_OPERATIONS,
	DEFAULT_RATE_LIMIT_PERIOD_MILLIS,
	RATE_LIMIT_MAX_OPERATIONS_KEY,
	RATE_LIMIT_PERIOD_KEY,
	TOKEN_KEY,
};

/// The members allowed to manage rolls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operators(HashSet<UserId>);

impl Operators {
	pub fn new<I: IntoIterator<Item = UserId>>(ids: I) -> Self {
		Self(ids.into_iter().collect())
	}

	pub fn contains(&self, user_id: UserId) -> bool {
		self.0.contains(&user_id)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Everything the bot reads from its environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
	pub token: String,
	pub database_url: String,
	pub operators: Operators,
	pub max_operations: u32,
	pub rate_limit_period: Duration,
	pub admin_panel_timeout: Duration,
}

impl Config {
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Build the config from an arbitrary key lookup. Blank values count as
	/// unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| {
			lookup(key)
				.map(|value| value.trim().to_owned())
				.filter(|value| !value.is_empty())
		};
		let require =
			|key: &str| get(key).ok_or_else(|| anyhow!("expected the environment variable {}", key));

		let mut operators = Vec::new();
		for key in ADMIN_ID_KEYS {
			if let Some(value) = get(key) {
				let id = value
					.parse::<u64>()
					.ok()
					.filter(|id| *id != 0)
					.ok_or_else(|| anyhow!("{} must be a Discord user ID, got `{}`", key, value))?;
				operators.push(UserId::new(id));
			}
		}

		let max_operations = match get(RATE_LIMIT_MAX_OPERATIONS_KEY) {
			Some(value) => value
				.parse::<u32>()
				.with_context(|| format!("{} must be a whole number", RATE_LIMIT_MAX_OPERATIONS_KEY))?,
			None => DEFAULT_MAX_OPERATIONS,
		};
		if max_operations == 0 {
			return Err(anyhow!("{} must be at least 1", RATE_LIMIT_MAX_OPERATIONS_KEY));
		}
		let period_millis = match get(RATE_LIMIT_PERIOD_KEY) {
			Some(value) => value
				.parse::<u64>()
				.with_context(|| format!("{} must be a whole number", RATE_LIMIT_PERIOD_KEY))?,
			None => DEFAULT_RATE_LIMIT_PERIOD_MILLIS,
		};
		// A zero-length window resets on every call and never throttles
		if period_millis == 0 {
			return Err(anyhow!("{} must be at least 1", RATE_LIMIT_PERIOD_KEY));
		}
		let timeout_secs = match get(ADMIN_PANEL_TIMEOUT_KEY) {
			Some(value) => value
				.parse::<u64>()
				.with_context(|| format!("{} must be a whole number", ADMIN_PANEL_TIMEOUT_KEY))?,
			None => DEFAULT_ADMIN_PANEL_TIMEOUT_SECS,
		};

		Ok(Self {
			token: require(TOKEN_KEY)?,
			database_url: require(DATABASE_URL_KEY)?,
			operators: Operators::new(operators),
			max_operations,
			rate_limit_period: Duration::from_millis(period_millis),
			admin_panel_timeout: Duration::from_secs(timeout_secs),
		})
	}
}
