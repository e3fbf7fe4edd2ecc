// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External OAuth login endpoints.
//!
//! Policy failures are sent back to the referrer as `error` and
//! `error_description` query parameters. Protocol failures are answered
//! directly with a JSON [`ErrorResponse`].

use axum::{
	extract::{Query, State},
	http::{header, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use serde::Deserialize;
use warden_server_linking::{
	redirect_with_error, AuthorizeRequest, CallbackRequest, ErrorDisposition, LinkError,
};

use crate::api::AppState;
use crate::error::ErrorResponse;

/// Query of `GET /authorize`.
#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
	pub provider: Option<String>,
	pub redirect_to: Option<String>,
	pub invite_token: Option<String>,
}

/// Query of `GET /callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
	pub code: Option<String>,
	pub state: Option<String>,
	pub error: Option<String>,
	pub error_description: Option<String>,
}

/// GET /authorize - Redirect the browser to the external provider.
///
/// # Errors
/// - 400 Bad Request: missing or unsupported provider
/// - 404 Not Found: unknown invite token
#[tracing::instrument(skip(state, query), fields(provider = ?query.provider))]
pub async fn authorize(
	State(state): State<AppState>,
	Query(query): Query<AuthorizeQuery>,
) -> Response {
	let request = AuthorizeRequest {
		provider: query.provider,
		redirect_to: query.redirect_to,
		invite_token: query.invite_token,
	};

	match state.linking.authorize(request).await {
		Ok(url) => found(&url),
		Err(e) => {
			let site_url = &state.linking.policy().site_url;
			link_error_response(&e, site_url)
		}
	}
}

/// GET /callback - Complete the provider round trip.
///
/// Success and policy failures redirect (302); protocol failures answer
/// with 400, 404 or 500.
#[tracing::instrument(skip(state, query))]
pub async fn callback(
	State(state): State<AppState>,
	Query(query): Query<CallbackQuery>,
) -> Response {
	let request = CallbackRequest {
		code: query.code,
		state: query.state,
		error: query.error,
		error_description: query.error_description,
	};

	match state.linking.callback(request).await {
		Ok(success) => found(&success.redirect_url),
		Err(failure) => link_error_response(&failure.error, &failure.referrer),
	}
}

fn link_error_response(error: &LinkError, referrer: &str) -> Response {
	match error.disposition() {
		ErrorDisposition::Redirect { code, description } => {
			found(&redirect_with_error(referrer, &code, &description))
		}
		ErrorDisposition::Status {
			status,
			code,
			message,
		} => {
			let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
			(status, Json(ErrorResponse::new(code, message))).into_response()
		}
	}
}

/// A plain `302 Found`.
fn found(location: &str) -> Response {
	(StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
