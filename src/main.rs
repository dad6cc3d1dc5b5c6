// Modules
mod commands;
mod components;
mod config;
mod constants;
mod db;
mod event_handlers;
mod platform;
mod rate_limiter;
mod restore;
mod tasks;
mod util;

// Uses
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use dotenv::dotenv;
use serenity::all::{Client, GatewayIntents};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
	commands::commands,
	components::AdminSessions,
	config::{Config, Operators},
	constants::PROGRAM_VERSION,
	db::{DbStore, RollStore},
	event_handlers::{event_handler, on_error},
	platform::SerenityGateway,
	rate_limiter::RateLimiter,
	restore::restore_panels,
	tasks::spawn_health_loops,
};

// Types
pub type Error = anyhow::Error;
pub type PoiseContext<'a> = poise::Context<'a, DataArc, Error>;
pub type DataArc = Arc<Data>;

/// State shared by every command, component handler, and background task.
pub struct Data {
	pub store: Arc<dyn RollStore>,
	pub rate_limiter: Arc<RateLimiter>,
	pub operators: Operators,
	pub admin_panel_timeout: Duration,
	pub admin_sessions: AdminSessions,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
	// Missing .env files are fine, the variables may come from elsewhere
	dotenv().ok();
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	info!("Starting rollcall v{}", PROGRAM_VERSION);

	let config = Config::from_env().with_context(|| "Invalid configuration")?;
	if config.operators.is_empty() {
		warn!("No operators are configured, so nobody can manage rolls");
	} else {
		info!("{} operators configured", config.operators.len());
	}

	let pool = db::init_with_retry(&config.database_url)
		.await
		.with_context(|| "Unable to connect to the database")?;

	let data = Arc::new(Data {
		store: Arc::new(DbStore::new(pool)),
		rate_limiter: Arc::new(RateLimiter::new(
			config.max_operations,
			config.rate_limit_period,
		)),
		operators: config.operators,
		admin_panel_timeout: config.admin_panel_timeout,
		admin_sessions: AdminSessions::default(),
	});

	let framework = poise::Framework::builder()
		.options(poise::FrameworkOptions {
			commands: commands(),
			event_handler: |ctx, event, framework, data| {
				Box::pin(event_handler(ctx, event, framework, data))
			},
			on_error: |error| Box::pin(on_error(error)),
			..Default::default()
		})
		.setup(move |ctx, _ready, framework| {
			Box::pin(async move {
				data.rate_limiter.acquire().await;
				match poise::builtins::register_globally(ctx, &framework.options().commands).await {
					Ok(()) => info!("Synced {} commands", framework.options().commands.len()),
					Err(e) => error!("Failed to sync commands: {}", e),
				}

				let gateway = SerenityGateway::new(ctx.http.clone());
				if let Err(e) =
					restore_panels(data.store.as_ref(), &gateway, &data.rate_limiter).await
				{
					error!("Failed to restore roll prompts: {}", e);
				}

				spawn_health_loops(data.rate_limiter.clone(), data.store.clone());

				Ok(data)
			})
		})
		.build();

	let mut client = Client::builder(&config.token, GatewayIntents::non_privileged())
		.framework(framework)
		.await
		.with_context(|| "Error creating the client")?;

	client
		.start()
		.await
		.with_context(|| "Client error")?;

	Ok(())
}
