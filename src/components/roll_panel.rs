// Uses
use std::fmt::Write;

use rand::{distributions::Uniform, Rng};
use serenity::all::{ButtonStyle, CreateActionRow, CreateButton};
use uuid::Uuid;

use super::{render::render_results, ROLL_PREFIX, STATS_PREFIX};
use crate::{
	constants::{RECENT_ROLLS_SHOWN, ROLL_BUTTON_LABEL, ROLL_MAX, ROLL_MIN, STATS_BUTTON_LABEL},
	db::{models::RollEntry, RollStore, StoreError},
	util::display_time,
};

/// The interactive part of a roll prompt: a roll button and a stats button,
/// both bound to one button instance.
///
/// The panel holds nothing but the button ID. Every render reads the rolls
/// back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollPanel {
	button_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
	AlreadyRolled,
	/// The prompt was clicked before its button was saved.
	NotReady,
	Rolled { value: i32, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
	pub content: String,
	/// Present only for operators: the rolls the admin panel should offer.
	pub admin_entries: Option<Vec<RollEntry>>,
}

impl RollPanel {
	/// A panel for a brand new prompt.
	pub fn new() -> Self {
		Self {
			button_id: Uuid::new_v4().to_string(),
		}
	}

	/// A panel for a prompt that was posted earlier.
	pub fn restore<S: Into<String>>(button_id: S) -> Self {
		Self {
			button_id: button_id.into(),
		}
	}

	pub fn button_id(&self) -> &str {
		&self.button_id
	}

	pub fn roll_custom_id(&self) -> String {
		format!("{}{}", ROLL_PREFIX, self.button_id)
	}

	pub fn stats_custom_id(&self) -> String {
		format!("{}{}", STATS_PREFIX, self.button_id)
	}

	pub fn components(&self) -> Vec<CreateActionRow> {
		vec![CreateActionRow::Buttons(vec![
			CreateButton::new(self.roll_custom_id())
				.label(ROLL_BUTTON_LABEL)
				.style(ButtonStyle::Primary),
			CreateButton::new(self.stats_custom_id())
				.label(STATS_BUTTON_LABEL)
				.style(ButtonStyle::Secondary),
		])]
	}

	/// Roll for a member and render the updated results.
	///
	/// A member who already rolled gets [`RollOutcome::AlreadyRolled`], whether
	/// that's caught by the lookup up front or by the store rejecting a racing
	/// second insert. A click that beats `/rollbutton` saving the button gets
	/// [`RollOutcome::NotReady`] and records nothing.
	pub fn roll<R: Rng>(
		&self,
		store: &dyn RollStore,
		user_id: i64,
		display_name: &str,
		rng: &mut R,
	) -> Result<RollOutcome, StoreError> {
		if store.has_rolled(&self.button_id, user_id)? {
			return Ok(RollOutcome::AlreadyRolled);
		}

		let value = rng.sample(Uniform::new_inclusive(ROLL_MIN, ROLL_MAX));
		match store.save_roll(&self.button_id, user_id, display_name, value) {
			Ok(()) => (),
			Err(StoreError::Duplicate) => return Ok(RollOutcome::AlreadyRolled),
			Err(StoreError::UnknownButton) => return Ok(RollOutcome::NotReady),
			Err(e) => return Err(e),
		}

		let entries = store.get_rolls(&self.button_id)?;
		Ok(RollOutcome::Rolled {
			value,
			content: render_results(&entries),
		})
	}

	/// The private stats shown by the stats button. Operators also get the
	/// admin details and the entries to manage.
	pub fn stats(&self, store: &dyn RollStore, is_operator: bool) -> Result<StatsReport, StoreError> {
		let stats = store.get_roll_stats(&self.button_id)?;

		let mut content = String::new();
		content.push_str("\u{1f4ca} **Roll Stats**\n");
		let _ = writeln!(content, "- Total rolls: `{}`", stats.total_rolls);
		let _ = writeln!(content, "- Average roll: `{}`", stats.average_roll);
		let _ = writeln!(content, "- Latest roll: `{}`", stats.latest_roll_time);

		if !is_operator {
			return Ok(StatsReport {
				content,
				admin_entries: None,
			});
		}

		let entries = store.get_rolls(&self.button_id)?;
		let location = store.get_message_info(&self.button_id)?;

		content.push_str("\n\u{1f510} **Admin Info**\n");
		let _ = writeln!(content, "- Button ID: `{}`", self.button_id);
		if let Some(location) = location {
			let _ = writeln!(content, "- Channel ID: `{}`", location.channel_id);
			let _ = writeln!(content, "- Message ID: `{}`", location.message_id);
		}
		if !entries.is_empty() {
			content.push_str("- Recent Rolls:\n");
			let skip = entries.len().saturating_sub(RECENT_ROLLS_SHOWN);
			for entry in &entries[skip..] {
				let _ = writeln!(
					content,
					"  \u{2022} {} rolled {} - `{}`",
					entry.display_name,
					entry.value,
					display_time(entry.timestamp)
				);
			}
		}

		Ok(StatsReport {
			content,
			admin_entries: Some(entries),
		})
	}
}

impl Default for RollPanel {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;
	use crate::db::{
		models::{ButtonMessage, RollStats},
		test_pool,
		DbStore,
	};

	/// A store whose existence check always misses, as if two clicks from the
	/// same member raced past it.
	struct RacingStore(DbStore);

	impl RollStore for RacingStore {
		fn save_button(
			&self,
			button_id: &str,
			channel_id: i64,
			message_id: i64,
		) -> Result<(), StoreError> {
			self.0.save_button(button_id, channel_id, message_id)
		}

		fn get_button_messages(&self) -> Result<Vec<ButtonMessage>, StoreError> {
			self.0.get_button_messages()
		}

		fn get_message_info(&self, button_id: &str) -> Result<Option<ButtonMessage>, StoreError> {
			self.0.get_message_info(button_id)
		}

		fn save_roll(
			&self,
			button_id: &str,
			user_id: i64,
			display_name: &str,
			value: i32,
		) -> Result<(), StoreError> {
			self.0.save_roll(button_id, user_id, display_name, value)
		}

		fn has_rolled(&self, _button_id: &str, _user_id: i64) -> Result<bool, StoreError> {
			Ok(false)
		}

		fn get_rolls(&self, button_id: &str) -> Result<Vec<RollEntry>, StoreError> {
			self.0.get_rolls(button_id)
		}

		fn get_roll_stats(&self, button_id: &str) -> Result<RollStats, StoreError> {
			self.0.get_roll_stats(button_id)
		}

		fn delete_roll(&self, button_id: &str, user_id: i64) -> Result<(), StoreError> {
			self.0.delete_roll(button_id, user_id)
		}

		fn check_connection(&self) -> Result<(), StoreError> {
			self.0.check_connection()
		}
	}

	fn store_for(panel: &RollPanel) -> DbStore {
		let store = DbStore::new(test_pool());
		store.save_button(panel.button_id(), 111, 222).unwrap();
		store
	}

	#[test]
	fn new_panels_get_distinct_ids() {
		assert_ne!(RollPanel::new(), RollPanel::new());
		let panel = RollPanel::restore("abc");
		assert_eq!(panel.roll_custom_id(), "roll:abc");
		assert_eq!(panel.stats_custom_id(), "stats:abc");
	}

	#[test]
	fn first_roll_renders_a_crown() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		let mut rng = StdRng::seed_from_u64(7);

		let RollOutcome::Rolled { value, content } =
			panel.roll(&store, 1, "Ada", &mut rng).unwrap()
		else {
			panic!("expected a roll");
		};
		assert!((ROLL_MIN..=ROLL_MAX).contains(&value));
		assert_eq!(content, format!("\u{1f451} **Ada** rolled **{}**", value));
	}

	#[test]
	fn second_roll_by_the_same_member_is_refused() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		let mut rng = StdRng::seed_from_u64(7);

		panel.roll(&store, 1, "Ada", &mut rng).unwrap();
		assert_eq!(
			panel.roll(&store, 1, "Ada", &mut rng).unwrap(),
			RollOutcome::AlreadyRolled
		);
		assert_eq!(store.get_rolls(panel.button_id()).unwrap().len(), 1);
	}

	#[test]
	fn racing_second_roll_is_caught_by_the_store() {
		let panel = RollPanel::new();
		let store = RacingStore(store_for(&panel));
		let mut rng = StdRng::seed_from_u64(7);

		let RollOutcome::Rolled { value: first, .. } =
			panel.roll(&store, 1, "Ada", &mut rng).unwrap()
		else {
			panic!("expected a roll");
		};
		assert_eq!(
			panel.roll(&store, 1, "Ada", &mut rng).unwrap(),
			RollOutcome::AlreadyRolled
		);

		let rolls = store.get_rolls(panel.button_id()).unwrap();
		assert_eq!(rolls.len(), 1);
		assert_eq!(rolls[0].value, first);
	}

	#[test]
	fn click_before_the_button_is_saved_is_not_an_error() {
		let panel = RollPanel::new();
		let store = DbStore::new(test_pool());
		let mut rng = StdRng::seed_from_u64(7);

		assert_eq!(
			panel.roll(&store, 5, "Ada", &mut rng).unwrap(),
			RollOutcome::NotReady
		);
		assert!(store.get_rolls(panel.button_id()).unwrap().is_empty());

		// Once saved, the same member can roll normally
		store.save_button(panel.button_id(), 111, 222).unwrap();
		assert!(matches!(
			panel.roll(&store, 5, "Ada", &mut rng).unwrap(),
			RollOutcome::Rolled { .. }
		));
	}

	#[test]
	fn values_stay_in_range() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		let mut rng = StdRng::seed_from_u64(99);

		for user in 1..=200 {
			panel.roll(&store, user, "member", &mut rng).unwrap();
		}
		let rolls = store.get_rolls(panel.button_id()).unwrap();
		assert_eq!(rolls.len(), 200);
		assert!(rolls
			.iter()
			.all(|r| (ROLL_MIN..=ROLL_MAX).contains(&r.value)));
	}

	#[test]
	fn members_only_see_the_summary() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		store.save_roll(panel.button_id(), 1, "Ada", 10).unwrap();
		store.save_roll(panel.button_id(), 2, "Bo", 20).unwrap();
		store.save_roll(panel.button_id(), 3, "Cy", 30).unwrap();

		let report = panel.stats(&store, false).unwrap();
		assert!(report.content.contains("- Total rolls: `3`"));
		assert!(report.content.contains("- Average roll: `20`"));
		assert!(!report.content.contains("Admin Info"));
		assert_eq!(report.admin_entries, None);
	}

	#[test]
	fn operators_see_admin_details_and_recent_rolls() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		for user in 1..=7 {
			store
				.save_roll(panel.button_id(), user, &format!("member{}", user), user as i32)
				.unwrap();
		}

		let report = panel.stats(&store, true).unwrap();
		assert!(report.content.contains("Admin Info"));
		assert!(report.content.contains(&format!("- Button ID: `{}`", panel.button_id())));
		assert!(report.content.contains("- Channel ID: `111`"));
		assert!(report.content.contains("- Message ID: `222`"));
		// Only the five most recent
		assert!(!report.content.contains("member2 rolled"));
		assert!(report.content.contains("member3 rolled 3"));
		assert!(report.content.contains("member7 rolled 7"));
		assert_eq!(report.admin_entries.unwrap().len(), 7);
	}

	#[test]
	fn stats_without_rolls_show_the_placeholder() {
		let panel = RollPanel::new();
		let store = store_for(&panel);
		let report = panel.stats(&store, true).unwrap();
		assert!(report.content.contains("- Latest roll: `No rolls yet`"));
		assert!(!report.content.contains("Recent Rolls"));
		assert_eq!(report.admin_entries, Some(Vec::new()));
	}
}
