// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_server::{create_app_state, create_router};
use warden_server_auth::User;
use warden_server_config::{LogFormat, LoggingConfig, ServerConfig};
use warden_server_db::UserRepository;

/// Warden server - external identity linking over OAuth.
#[derive(Parser, Debug)]
#[command(name = "warden-server", about = "Warden external identity server", version)]
struct Args {
	/// Config file to use instead of /etc/warden/server.toml
	#[arg(long, global = true, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Show version information
	Version,
	/// Create a pending user and print its invite token
	Invite {
		#[arg(long)]
		email: String,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("warden-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => warden_server_config::load_config_with_file(path),
		None => warden_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);

	match args.command {
		Some(Command::Invite { email }) => invite(&config, &email).await,
		_ => serve(config).await,
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting warden-server"
	);

	let pool = warden_server_db::create_pool(&config.database.url).await?;
	warden_server_db::run_migrations(&pool).await?;

	let state = create_app_state(pool, &config).await?;
	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "failed to listen for shutdown signal");
			}
			tracing::info!("Received shutdown signal");
		})
		.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn invite(config: &ServerConfig, email: &str) -> anyhow::Result<()> {
	let email = email.trim();
	if !email.contains('@') {
		anyhow::bail!("'{email}' is not an email address");
	}

	let pool = warden_server_db::create_pool(&config.database.url).await?;
	warden_server_db::run_migrations(&pool).await?;
	let users = UserRepository::new(pool);

	let user = User::invited(email);
	users
		.create_user(&user)
		.await
		.with_context(|| format!("failed to invite {email}"))?;

	let token = user
		.invite_token
		.as_deref()
		.context("invited user has no token")?;
	tracing::info!(user_id = %user.id, "invite created");
	println!("{token}");
	Ok(())
}
