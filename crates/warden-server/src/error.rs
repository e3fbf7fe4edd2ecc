// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use warden_server_auth::{ProviderError, StateError};
use warden_server_db::DbError;

/// Errors raised while assembling or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	/// A configured provider could not be constructed.
	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),

	#[error("State codec error: {0}")]
	State(#[from] StateError),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		tracing::error!(error = %self, "server error");
		let body = match &self {
			ServerError::Db(_) => ErrorResponse::new("database_error", "A database error occurred"),
			_ => ErrorResponse::new("internal_error", "An internal error occurred"),
		};
		(StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
	}
}
