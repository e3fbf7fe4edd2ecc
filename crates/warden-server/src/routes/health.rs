// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

/// Health status for components and overall system.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthStatus,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub version: &'static str,
	pub database: DatabaseHealth,
	pub providers: Vec<&'static str>,
}

/// GET /health - Database reachability and the configured providers.
///
/// With no provider configured the server is up but cannot log anyone in,
/// which is reported as degraded.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let start = Instant::now();
	let database = match warden_server_db::ping(&state.pool).await {
		Ok(()) => DatabaseHealth {
			status: HealthStatus::Healthy,
			latency_ms: start.elapsed().as_millis() as u64,
			error: None,
		},
		Err(e) => {
			tracing::warn!(error = %e, "database health check failed");
			DatabaseHealth {
				status: HealthStatus::Unhealthy,
				latency_ms: start.elapsed().as_millis() as u64,
				error: Some(e.to_string()),
			}
		}
	};
	let providers = state.linking.registry().names();

	let status = if database.status == HealthStatus::Unhealthy {
		HealthStatus::Unhealthy
	} else if providers.is_empty() {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	};
	let code = match status {
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
		_ => StatusCode::OK,
	};

	(
		code,
		Json(HealthResponse {
			status,
			version: env!("CARGO_PKG_VERSION"),
			database,
			providers,
		}),
	)
}
