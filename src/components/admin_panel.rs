// Uses
use std::{collections::HashSet, pin::pin, time::Duration};

use anyhow::Context as _;
use serenity::{
	all::{
		ButtonStyle,
		ComponentInteraction,
		ComponentInteractionCollector,
		Context as SerenityContext,
		CreateActionRow,
		CreateButton,
		CreateInteractionResponse,
		CreateInteractionResponseMessage,
		EditInteractionResponse,
	},
	futures::{Stream, StreamExt},
};
use thiserror::Error;
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, error, info, warn};

use super::{render::render_results, RollPanel, ADMIN_PREFIX};
use crate::{
	db::{models::RollEntry, RollStore, StoreError},
	platform::{reattach, MessageGateway, MessageUpdate, PlatformError, SerenityGateway},
	rate_limiter::RateLimiter,
	DataArc,
};

// Constants
const CONTROLS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;
const DELETE_ACTION: &str = "delete";
const CONFIRM_ACTION: &str = "confirm";
const CANCEL_ACTION: &str = "cancel";
const NOT_AUTHORIZED: &str = "\u{26d4} You're not authorized to delete rolls.";
const DELETING: &str = "Deleting...";
const DELETE_FAILED: &str = "\u{26a0}\u{fe0f} Failed to delete the roll.";
const CANCELLED: &str = "Operation cancelled.";

/// One deletable roll, as offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEntry {
	pub user_id: i64,
	pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminState {
	/// One delete control per roll.
	Listing,
	/// Waiting on Confirm or Cancel for this roll.
	ConfirmPending(AdminEntry),
	/// Finished, no controls left.
	Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
	Delete(i64),
	Confirm,
	Cancel,
}

/// The ephemeral roll management view shown to operators.
#[derive(Debug, Clone)]
pub struct AdminPanel {
	session: String,
	button_id: String,
	entries: Vec<AdminEntry>,
	state: AdminState,
}

impl AdminPanel {
	/// `session` must be unique among live panels; the interaction ID that
	/// opened the panel works well.
	pub fn new<S: Into<String>>(session: S, button_id: &str, rolls: &[RollEntry]) -> Self {
		let capacity = CONTROLS_PER_ROW * MAX_ROWS;
		if rolls.len() > capacity {
			warn!(
				"Button {} has {} rolls, only the first {} can be managed from one panel",
				button_id,
				rolls.len(),
				capacity
			);
		}

		Self {
			session: session.into(),
			button_id: button_id.to_owned(),
			entries: rolls
				.iter()
				.take(capacity)
				.map(|roll| AdminEntry {
					user_id: roll.user_id,
					display_name: roll.display_name.clone(),
				})
				.collect(),
			state: AdminState::Listing,
		}
	}

	pub fn session(&self) -> &str {
		&self.session
	}

	pub fn button_id(&self) -> &str {
		&self.button_id
	}

	pub fn is_done(&self) -> bool {
		self.state == AdminState::Done
	}

	/// The prefix shared by every control on this panel.
	pub fn custom_id_prefix(&self) -> String {
		format!("{}{}:", ADMIN_PREFIX, self.session)
	}

	fn custom_id(&self, action: &str) -> String {
		format!("{}{}", self.custom_id_prefix(), action)
	}

	pub fn parse_action(&self, custom_id: &str) -> Option<AdminAction> {
		let action = custom_id.strip_prefix(self.custom_id_prefix().as_str())?;
		match action {
			CONFIRM_ACTION => Some(AdminAction::Confirm),
			CANCEL_ACTION => Some(AdminAction::Cancel),
			_ => action
				.strip_prefix(DELETE_ACTION)?
				.strip_prefix(':')?
				.parse()
				.ok()
				.map(AdminAction::Delete),
		}
	}

	/// The delete controls, grouped into rows.
	pub fn rows(&self) -> Vec<&[AdminEntry]> {
		self.entries.chunks(CONTROLS_PER_ROW).collect()
	}

	pub fn components(&self) -> Vec<CreateActionRow> {
		match &self.state {
			AdminState::Listing => self
				.rows()
				.into_iter()
				.map(|row| {
					CreateActionRow::Buttons(
						row.iter()
							.map(|entry| {
								CreateButton::new(
									self.custom_id(&format!("{}:{}", DELETE_ACTION, entry.user_id)),
								)
								.label(format!("\u{1f5d1}\u{fe0f} {}", entry.display_name))
								.style(ButtonStyle::Danger)
							})
							.collect(),
					)
				})
				.collect(),
			AdminState::ConfirmPending(_) => vec![CreateActionRow::Buttons(vec![
				CreateButton::new(self.custom_id(CONFIRM_ACTION))
					.label("Confirm Delete")
					.style(ButtonStyle::Danger),
				CreateButton::new(self.custom_id(CANCEL_ACTION))
					.label("Cancel")
					.style(ButtonStyle::Secondary),
			])],
			AdminState::Done => Vec::new(),
		}
	}

	/// Start deleting a roll. Only valid while listing.
	pub fn select(&mut self, user_id: i64) -> Option<&AdminEntry> {
		if self.state != AdminState::Listing {
			return None;
		}
		let entry = self.entries.iter().find(|e| e.user_id == user_id)?.clone();
		self.state = AdminState::ConfirmPending(entry);
		match &self.state {
			AdminState::ConfirmPending(entry) => Some(entry),
			_ => None,
		}
	}

	/// Confirm the pending deletion, returning the roll to delete.
	pub fn confirm(&mut self) -> Option<AdminEntry> {
		match std::mem::replace(&mut self.state, AdminState::Done) {
			AdminState::ConfirmPending(entry) => Some(entry),
			previous => {
				self.state = previous;
				None
			}
		}
	}

	pub fn cancel(&mut self) -> bool {
		if self.is_done() {
			return false;
		}
		self.state = AdminState::Done;
		true
	}
}

/// The admin panels that currently have a collector listening for presses.
#[derive(Debug, Default)]
pub struct AdminSessions {
	live: Mutex<HashSet<String>>,
}

impl AdminSessions {
	pub async fn open(&self, session: &str) {
		self.live.lock().await.insert(session.to_owned());
	}

	pub async fn close(&self, session: &str) {
		self.live.lock().await.remove(session);
	}

	/// Whether a press with this custom ID belongs to a live panel.
	pub async fn claims(&self, custom_id: &str) -> bool {
		let Some(session) = custom_id
			.strip_prefix(ADMIN_PREFIX)
			.and_then(|rest| rest.split(':').next())
		else {
			return false;
		};
		self.live.lock().await.contains(session)
	}
}

#[derive(Debug, Error)]
pub enum DeleteError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("no message is stored for button {0}")]
	MissingLocation(String),
	#[error(transparent)]
	Platform(#[from] PlatformError),
}

/// Delete one roll and regenerate the public prompt to match.
///
/// Deleting a roll that's already gone still regenerates the prompt.
pub async fn delete_entry(
	store: &dyn RollStore,
	gateway: &dyn MessageGateway,
	limiter: &RateLimiter,
	button_id: &str,
	user_id: i64,
) -> Result<(), DeleteError> {
	store.delete_roll(button_id, user_id)?;

	let location = store
		.get_message_info(button_id)?
		.ok_or_else(|| DeleteError::MissingLocation(button_id.to_owned()))?;

	let content = render_results(&store.get_rolls(button_id)?);

	reattach(
		gateway,
		limiter,
		&location,
		MessageUpdate {
			content: Some(content),
			panel: RollPanel::restore(button_id),
		},
	)
	.await?;

	Ok(())
}

/// The next press, or `None` once the panel has sat idle for `idle` or the
/// presses have stopped coming.
async fn next_press<S>(presses: &mut S, idle: Duration) -> Option<S::Item>
where
	S: Stream + Unpin,
{
	timeout(idle, presses.next()).await.ok().flatten()
}

/// Handle presses on an admin panel until it finishes or sits idle for the
/// configured timeout. After that the controls are inert.
///
/// The panel's session must already be open in [`AdminSessions`]; it's closed
/// on the way out.
pub async fn run(ctx: SerenityContext, data: DataArc, mut panel: AdminPanel) {
	// One collector for the panel's whole life, so presses that land while an
	// earlier one is being handled queue up instead of going unanswered
	let prefix = panel.custom_id_prefix();
	let mut presses = pin!(ComponentInteractionCollector::new(&ctx)
		.filter(move |press| press.data.custom_id.starts_with(prefix.as_str()))
		.stream());

	while !panel.is_done() {
		let Some(press) = next_press(&mut presses, data.admin_panel_timeout).await else {
			debug!("Admin panel for button {} timed out", panel.button_id());
			break;
		};

		if let Err(e) = handle_press(&ctx, &data, &mut panel, &press).await {
			error!("Admin panel error for button {}: {:#}", panel.button_id(), e);
		}
	}
	data.admin_sessions.close(panel.session()).await;
}

async fn handle_press(
	ctx: &SerenityContext,
	data: &DataArc,
	panel: &mut AdminPanel,
	press: &ComponentInteraction,
) -> Result<(), anyhow::Error> {
	let action = panel.parse_action(&press.data.custom_id);

	// Re-checked on every press, the panel outlives the click that opened it
	if matches!(action, Some(AdminAction::Delete(_))) && !data.operators.contains(press.user.id) {
		data.rate_limiter.acquire().await;
		press
			.create_response(
				&ctx.http,
				CreateInteractionResponse::Message(
					CreateInteractionResponseMessage::new()
						.content(NOT_AUTHORIZED)
						.ephemeral(true),
				),
			)
			.await
			.with_context(|| "Failed to refuse an unauthorized delete")?;
		return Ok(());
	}

	let response = match action {
		Some(AdminAction::Delete(user_id)) => panel.select(user_id).map(|entry| {
			format!(
				"\u{26a0}\u{fe0f} Are you sure you want to delete the roll for **{}**?",
				entry.display_name
			)
		}),
		Some(AdminAction::Cancel) => panel.cancel().then(|| CANCELLED.to_owned()),
		Some(AdminAction::Confirm) => {
			let Some(entry) = panel.confirm() else {
				return acknowledge(ctx, data, press).await;
			};
			return confirm_delete(ctx, data, panel, press, entry).await;
		}
		None => None,
	};

	let Some(content) = response else {
		// A stale press, such as a double click
		return acknowledge(ctx, data, press).await;
	};
	data.rate_limiter.acquire().await;
	press
		.create_response(
			&ctx.http,
			CreateInteractionResponse::UpdateMessage(
				CreateInteractionResponseMessage::new()
					.content(content)
					.components(panel.components()),
			),
		)
		.await
		.with_context(|| "Failed to update the admin panel")?;

	Ok(())
}

async fn confirm_delete(
	ctx: &SerenityContext,
	data: &DataArc,
	panel: &AdminPanel,
	press: &ComponentInteraction,
	entry: AdminEntry,
) -> Result<(), anyhow::Error> {
	data.rate_limiter.acquire().await;
	press
		.create_response(
			&ctx.http,
			CreateInteractionResponse::UpdateMessage(
				CreateInteractionResponseMessage::new()
					.content(DELETING)
					.components(Vec::new()),
			),
		)
		.await
		.with_context(|| "Failed to acknowledge the delete")?;

	let gateway = SerenityGateway::new(ctx.http.clone());
	let outcome = delete_entry(
		data.store.as_ref(),
		&gateway,
		&data.rate_limiter,
		panel.button_id(),
		entry.user_id,
	)
	.await;
	let content = match outcome {
		Ok(()) => {
			info!(
				"{} deleted the roll for user {} on button {}",
				press.user.id,
				entry.user_id,
				panel.button_id()
			);
			format!("\u{2705} Deleted roll for **{}**", entry.display_name)
		}
		Err(e) => {
			error!("Delete operation failed: {}", e);
			DELETE_FAILED.to_owned()
		}
	};

	data.rate_limiter.acquire().await;
	press
		.edit_response(&ctx.http, EditInteractionResponse::new().content(content))
		.await
		.with_context(|| "Failed to report the delete result")?;

	Ok(())
}

async fn acknowledge(
	ctx: &SerenityContext,
	data: &DataArc,
	press: &ComponentInteraction,
) -> Result<(), anyhow::Error> {
	data.rate_limiter.acquire().await;
	press
		.create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
		.await
		.with_context(|| "Failed to acknowledge a press")?;
	Ok(())
}
