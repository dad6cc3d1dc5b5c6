// Uses
use std::{borrow::Cow, cmp::Ordering};

use chrono::{NaiveDateTime, Utc};
use diesel::{
	dsl::{count_star, exists, max, sum},
	insert_into,
	prelude::*,
	r2d2::PoolError,
	result::{DatabaseErrorKind, Error as DieselError},
	sql_query,
};
use thiserror::Error;

use super::{
	models::{ButtonMessage, NewRoll, RollEntry, RollStats},
	schema::{button_messages, rolls},
	DbPool,
};
use crate::{constants::NO_ROLLS_YET, util::display_time};

#[derive(Debug, Error)]
pub enum StoreError {
	/// A uniqueness constraint rejected the write.
	#[error("the record already exists")]
	Duplicate,
	/// The roll names a button that hasn't been saved.
	#[error("the button does not exist")]
	UnknownButton,
	#[error("failed to get a database connection")]
	Pool(#[from] PoolError),
	#[error("database query failed")]
	Query(#[source] DieselError),
}

impl From<DieselError> for StoreError {
	fn from(e: DieselError) -> Self {
		match e {
			DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Self::Duplicate,
			DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
				Self::UnknownButton
			}
			e => Self::Query(e),
		}
	}
}

/// Durable storage for button locations and the rolls made against them.
///
/// The database constraints are authoritative: a duplicate button or a second
/// roll by the same user on the same button fails with
/// [`StoreError::Duplicate`], whatever any earlier existence check said. A roll
/// on a button that was never saved fails with [`StoreError::UnknownButton`].
pub trait RollStore: Send + Sync {
	fn save_button(&self, button_id: &str, channel_id: i64, message_id: i64)
		-> Result<(), StoreError>;

	fn get_button_messages(&self) -> Result<Vec<ButtonMessage>, StoreError>;

	fn get_message_info(&self, button_id: &str) -> Result<Option<ButtonMessage>, StoreError>;

	fn save_roll(
		&self,
		button_id: &str,
		user_id: i64,
		display_name: &str,
		value: i32,
	) -> Result<(), StoreError>;

	fn has_rolled(&self, button_id: &str, user_id: i64) -> Result<bool, StoreError>;

	/// All rolls for a button, in the order they arrived.
	fn get_rolls(&self, button_id: &str) -> Result<Vec<RollEntry>, StoreError>;

	fn get_roll_stats(&self, button_id: &str) -> Result<RollStats, StoreError>;

	/// Removing a roll that doesn't exist is not an error.
	fn delete_roll(&self, button_id: &str, user_id: i64) -> Result<(), StoreError>;

	fn check_connection(&self) -> Result<(), StoreError>;
}

/// [`RollStore`] over the SQLite connection pool.
#[derive(Clone)]
pub struct DbStore {
	pool: DbPool,
}

impl DbStore {
	pub fn new(pool: DbPool) -> Self {
		Self { pool }
	}

	fn insert_roll(&self, roll: &NewRoll<'_>) -> Result<(), StoreError> {
		let mut conn = self.pool.get()?;
		insert_into(rolls::table).values(roll).execute(&mut conn)?;
		Ok(())
	}
}

impl RollStore for DbStore {
	fn save_button(
		&self,
		button_id: &str,
		channel_id: i64,
		message_id: i64,
	) -> Result<(), StoreError> {
		let mut conn = self.pool.get()?;
		insert_into(button_messages::table)
			.values(&ButtonMessage {
				button_id: button_id.to_owned(),
				channel_id,
				message_id,
			})
			.execute(&mut conn)?;
		Ok(())
	}

	fn get_button_messages(&self) -> Result<Vec<ButtonMessage>, StoreError> {
		let mut conn = self.pool.get()?;
		Ok(button_messages::table
			.select(ButtonMessage::as_select())
			.load(&mut conn)?)
	}

	fn get_message_info(&self, button_id: &str) -> Result<Option<ButtonMessage>, StoreError> {
		let mut conn = self.pool.get()?;
		Ok(button_messages::table
			.find(button_id)
			.select(ButtonMessage::as_select())
			.first(&mut conn)
			.optional()?)
	}

	fn save_roll(
		&self,
		button_id: &str,
		user_id: i64,
		display_name: &str,
		value: i32,
	) -> Result<(), StoreError> {
		self.insert_roll(&NewRoll {
			button_id: Cow::Borrowed(button_id),
			user_id,
			user_display_name: Cow::Borrowed(display_name),
			roll: value,
			timestamp: Utc::now().naive_utc(),
		})
	}

	fn has_rolled(&self, button_id: &str, user_id: i64) -> Result<bool, StoreError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::select(exists(
			rolls::table
				.filter(rolls::button_id.eq(button_id))
				.filter(rolls::user_id.eq(user_id)),
		))
		.get_result(&mut conn)?)
	}

	fn get_rolls(&self, button_id: &str) -> Result<Vec<RollEntry>, StoreError> {
		let mut conn = self.pool.get()?;
		Ok(rolls::table
			.filter(rolls::button_id.eq(button_id))
			.order(rolls::id.asc())
			.select(RollEntry::as_select())
			.load(&mut conn)?)
	}

	fn get_roll_stats(&self, button_id: &str) -> Result<RollStats, StoreError> {
		let (total_rolls, roll_sum, latest) = {
			let mut conn = self.pool.get()?;
			rolls::table
				.filter(rolls::button_id.eq(button_id))
				.select((count_star(), sum(rolls::roll), max(rolls::timestamp)))
				.get_result::<(i64, Option<i64>, Option<NaiveDateTime>)>(&mut conn)?
		};

		Ok(RollStats {
			total_rolls,
			average_roll: rounded_mean(roll_sum.unwrap_or(0), total_rolls),
			latest_roll_time: latest.map_or_else(|| NO_ROLLS_YET.to_owned(), display_time),
		})
	}

	fn delete_roll(&self, button_id: &str, user_id: i64) -> Result<(), StoreError> {
		let mut conn = self.pool.get()?;
		diesel::delete(
			rolls::table
				.filter(rolls::button_id.eq(button_id))
				.filter(rolls::user_id.eq(user_id)),
		)
		.execute(&mut conn)?;
		Ok(())
	}

	fn check_connection(&self) -> Result<(), StoreError> {
		let mut conn = self.pool.get()?;
		sql_query("SELECT 1").execute(&mut conn)?;
		Ok(())
	}
}

/// The mean of `count` values summing to `sum`, rounded half-to-even.
/// Zero when there are no values.
fn rounded_mean(sum: i64, count: i64) -> i64 {
	if count <= 0 {
		return 0;
	}
	let quotient = sum.div_euclid(count);
	let remainder = sum.rem_euclid(count);
	match (remainder * 2).cmp(&count) {
		Ordering::Less => quotient,
		Ordering::Greater => quotient + 1,
		Ordering::Equal => quotient + quotient.rem_euclid(2),
	}
}
