// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use warden_server_auth::StateCodec;
use warden_server_config::ServerConfig;
use warden_server_db::UserRepository;
use warden_server_linking::{LinkPolicy, LinkingService, ProviderRegistry};

use crate::error::ServerError;
use crate::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub users: UserRepository,
	pub linking: LinkingService,
}

/// Build the application state from resolved configuration.
///
/// # Errors
/// Fails if a configured provider rejects its settings or the state
/// secret is empty.
#[tracing::instrument(skip_all)]
pub async fn create_app_state(
	pool: SqlitePool,
	config: &ServerConfig,
) -> Result<AppState, ServerError> {
	let timeout = Duration::from_secs(config.auth.external_timeout_secs);
	let registry = ProviderRegistry::from_config(&config.oauth, timeout)?;
	if registry.is_empty() {
		tracing::warn!("no external providers configured; /authorize will reject every request");
	}

	let codec = StateCodec::new(&config.auth.jwt_secret, config.auth.state_ttl_secs)?;
	let users = UserRepository::new(pool.clone());
	let linking = LinkingService::new(
		Arc::new(users.clone()),
		Arc::new(registry),
		codec,
		LinkPolicy::from(&config.auth),
	);

	Ok(AppState {
		pool,
		users,
		linking,
	})
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/authorize", get(routes::auth::authorize))
		.route("/callback", get(routes::auth::callback))
		.route("/health", get(routes::health::health_check))
		.with_state(state)
}
