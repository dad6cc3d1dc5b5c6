// Modules
mod admin_panel;
mod render;
mod roll_panel;

// Uses
use anyhow::Context as _;
use rand::thread_rng;
use serenity::all::{
	ComponentInteraction,
	Context as SerenityContext,
	CreateInteractionResponse,
	CreateInteractionResponseMessage,
};
use tracing::{debug, error};

pub use self::{
	admin_panel::{AdminPanel, AdminSessions},
	roll_panel::{RollOutcome, RollPanel},
};
use crate::{
	constants::{ALREADY_ROLLED, GENERIC_FAILURE, PROMPT_NOT_READY},
	util::user_id_to_db,
	DataArc,
};

// Constants
pub const ROLL_PREFIX: &str = "roll:";
pub const STATS_PREFIX: &str = "stats:";
pub const ADMIN_PREFIX: &str = "admin:";
const PANEL_EXPIRED: &str = "This admin panel has expired.";

/// What a component press is asking for, decoded from its custom ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentAction<'a> {
	Roll(&'a str),
	Stats(&'a str),
	Admin,
}

impl<'a> ComponentAction<'a> {
	fn parse(custom_id: &'a str) -> Option<Self> {
		let non_empty = |id: &'a str| Some(id).filter(|id| !id.is_empty());
		if let Some(button_id) = custom_id.strip_prefix(ROLL_PREFIX) {
			non_empty(button_id).map(Self::Roll)
		} else if let Some(button_id) = custom_id.strip_prefix(STATS_PREFIX) {
			non_empty(button_id).map(Self::Stats)
		} else if custom_id.starts_with(ADMIN_PREFIX) {
			Some(Self::Admin)
		} else {
			None
		}
	}
}

/// Entry point for every component press. Failures are logged and reported
/// to the member, never passed back up.
pub async fn handle_interaction(
	ctx: &SerenityContext,
	data: &DataArc,
	interaction: &ComponentInteraction,
) {
	let custom_id = interaction.data.custom_id.as_str();
	let result = match ComponentAction::parse(custom_id) {
		Some(ComponentAction::Roll(button_id)) => {
			on_roll(ctx, data, interaction, RollPanel::restore(button_id)).await
		}
		Some(ComponentAction::Stats(button_id)) => {
			on_stats(ctx, data, interaction, RollPanel::restore(button_id)).await
		}
		Some(ComponentAction::Admin) => {
			if data.admin_sessions.claims(custom_id).await {
				// The panel's own collector answers this one
				return;
			}
			respond_privately(ctx, data, interaction, PANEL_EXPIRED).await
		}
		None => {
			debug!("Ignoring a press on unknown component `{}`", custom_id);
			return;
		}
	};

	if let Err(e) = result {
		error!(
			"Component `{}` failed for user {}: {:#}",
			custom_id, interaction.user.id, e
		);
		// The interaction may already have been answered, so this is best-effort
		if let Err(e) = respond_privately(ctx, data, interaction, GENERIC_FAILURE).await {
			debug!("Couldn't report the failure: {:#}", e);
		}
	}
}

async fn on_roll(
	ctx: &SerenityContext,
	data: &DataArc,
	interaction: &ComponentInteraction,
	panel: RollPanel,
) -> Result<(), anyhow::Error> {
	let display_name = interaction
		.member
		.as_ref()
		.map_or_else(|| interaction.user.display_name(), |member| member.display_name())
		.to_owned();

	let outcome = panel
		.roll(
			data.store.as_ref(),
			user_id_to_db(interaction.user.id),
			&display_name,
			&mut thread_rng(),
		)
		.with_context(|| format!("Failed to record a roll on button {}", panel.button_id()))?;

	let response = match outcome {
		RollOutcome::AlreadyRolled => CreateInteractionResponse::Message(
			CreateInteractionResponseMessage::new()
				.content(ALREADY_ROLLED)
				.ephemeral(true),
		),
		RollOutcome::NotReady => CreateInteractionResponse::Message(
			CreateInteractionResponseMessage::new()
				.content(PROMPT_NOT_READY)
				.ephemeral(true),
		),
		RollOutcome::Rolled { value, content } => {
			debug!(
				"{} rolled {} on button {}",
				interaction.user.id,
				value,
				panel.button_id()
			);
			CreateInteractionResponse::UpdateMessage(
				CreateInteractionResponseMessage::new()
					.content(content)
					.components(panel.components()),
			)
		}
	};

	data.rate_limiter.acquire().await;
	interaction
		.create_response(&ctx.http, response)
		.await
		.with_context(|| "Failed to update the roll prompt")?;

	Ok(())
}

async fn on_stats(
	ctx: &SerenityContext,
	data: &DataArc,
	interaction: &ComponentInteraction,
	panel: RollPanel,
) -> Result<(), anyhow::Error> {
	let is_operator = data.operators.contains(interaction.user.id);
	let report = panel
		.stats(data.store.as_ref(), is_operator)
		.with_context(|| format!("Failed to gather stats for button {}", panel.button_id()))?;

	let Some(entries) = report.admin_entries else {
		return respond_privately(ctx, data, interaction, report.content).await;
	};

	let admin = AdminPanel::new(interaction.id.to_string(), panel.button_id(), &entries);
	data.admin_sessions.open(admin.session()).await;

	data.rate_limiter.acquire().await;
	let sent = interaction
		.create_response(
			&ctx.http,
			CreateInteractionResponse::Message(
				CreateInteractionResponseMessage::new()
					.content(report.content)
					.components(admin.components())
					.ephemeral(true),
			),
		)
		.await;
	if let Err(e) = sent {
		data.admin_sessions.close(admin.session()).await;
		return Err(e).with_context(|| "Failed to show the admin panel");
	}

	tokio::spawn(admin_panel::run(ctx.clone(), data.clone(), admin));

	Ok(())
}

async fn respond_privately<S: Into<String>>(
	ctx: &SerenityContext,
	data: &DataArc,
	interaction: &ComponentInteraction,
	content: S,
) -> Result<(), anyhow::Error> {
	data.rate_limiter.acquire().await;
	interaction
		.create_response(
			&ctx.http,
			CreateInteractionResponse::Message(
				CreateInteractionResponseMessage::new()
					.content(content)
					.ephemeral(true),
			),
		)
		.await
		.with_context(|| "Failed to send a private response")?;
	Ok(())
}
