// Uses
use std::borrow::Cow;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::*;

// Models
/// Where a posted roll prompt lives.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Insertable)]
#[diesel(table_name = button_messages)]
#[diesel(primary_key(button_id))]
pub struct ButtonMessage {
	pub button_id: String,
	pub channel_id: i64,
	pub message_id: i64,
}

/// One member's roll against one button.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = rolls)]
pub struct RollEntry {
	pub user_id: i64,
	#[diesel(column_name = user_display_name)]
	pub display_name: String,
	#[diesel(column_name = roll)]
	pub value: i32,
	pub timestamp: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = rolls)]
pub struct NewRoll<'a> {
	pub button_id: Cow<'a, str>,
	pub user_id: i64,
	pub user_display_name: Cow<'a, str>,
	pub roll: i32,
	pub timestamp: NaiveDateTime,
}

/// Aggregate figures for one button, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollStats {
	pub total_rolls: i64,
	pub average_roll: i64,
	pub latest_roll_time: String,
}
