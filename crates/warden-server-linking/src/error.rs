// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Failure taxonomy for the linking flow and how each kind reaches the
//! browser.
//!
//! Policy failures go back to the referrer as OAuth-style `error` /
//! `error_description` query parameters. Protocol failures (bad state,
//! unknown provider, unknown invite, database trouble) are answered
//! directly with an HTTP status.

use url::Url;
use warden_server_auth::{ProviderError, StateError};
use warden_server_db::DbError;

/// Errors that can occur while authorizing or linking an external identity.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
	#[error("invalid OAuth state: {0}")]
	InvalidState(#[source] StateError),

	#[error("provider parameter is required")]
	MissingProvider,

	#[error("authorization code missing from callback")]
	MissingCode,

	#[error("unsupported provider: {0}")]
	UnknownProvider(String),

	/// The provider redirected back with its own `error`.
	#[error("provider denied authorization: {code}")]
	ProviderDenied { code: String, description: String },

	#[error("unable to exchange external code: {0}")]
	TokenExchangeFailed(#[source] ProviderError),

	#[error("error getting user profile from external provider: {0}")]
	UserInfoFetchFailed(#[source] ProviderError),

	#[error("provider returned no email address")]
	MissingEmail,

	#[error("provider email is not verified")]
	EmailUnverified,

	#[error("signups are disabled and user does not exist")]
	SignupsDisabled,

	#[error("invite token not found")]
	InviteNotFound,

	#[error("invited email does not match any verified provider email")]
	InvitedEmailMismatch,

	#[error("database error: {0}")]
	Persistence(#[from] DbError),

	#[error("internal error: {0}")]
	Internal(String),
}

/// How a [`LinkError`] is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisposition {
	/// Send the browser back to the referrer with these query parameters.
	Redirect { code: String, description: String },
	/// Answer the request directly.
	Status {
		status: u16,
		code: &'static str,
		message: String,
	},
}

impl LinkError {
	pub fn disposition(&self) -> ErrorDisposition {
		use LinkError::*;

		let redirect = |code: &str, description: &str| ErrorDisposition::Redirect {
			code: code.to_string(),
			description: description.to_string(),
		};
		let status = |status: u16, code: &'static str, message: String| ErrorDisposition::Status {
			status,
			code,
			message,
		};

		match self {
			SignupsDisabled => redirect("access_denied", "Signups not allowed for this instance"),
			EmailUnverified => redirect("access_denied", "Unverified email with external provider"),
			MissingEmail => redirect(
				"server_error",
				"Error getting user email from external provider",
			),
			InvitedEmailMismatch => redirect(
				"invalid_request",
				"Invited email does not match emails from external provider",
			),
			TokenExchangeFailed(_) => redirect("server_error", "Unable to exchange external code"),
			UserInfoFetchFailed(_) => redirect(
				"server_error",
				"Error getting user profile from external provider",
			),
			ProviderDenied { code, description } => redirect(code.as_str(), description.as_str()),
			InvalidState(_) => status(
				400,
				"bad_request",
				"OAuth state parameter is invalid or expired".to_string(),
			),
			MissingProvider => status(400, "bad_request", "Missing provider parameter".to_string()),
			MissingCode => status(
				400,
				"bad_request",
				"Authorization code missing from callback".to_string(),
			),
			UnknownProvider(name) => {
				status(400, "bad_request", format!("Unsupported provider: {name}"))
			}
			InviteNotFound => status(
				404,
				"not_found",
				"User identified by invite token not found".to_string(),
			),
			Persistence(_) => status(
				500,
				"server_error",
				"Database error linking external identity".to_string(),
			),
			Internal(_) => status(500, "server_error", "Internal error".to_string()),
		}
	}

	/// Whether this failure is reported by redirecting back to the referrer.
	pub fn is_redirect(&self) -> bool {
		matches!(self.disposition(), ErrorDisposition::Redirect { .. })
	}
}

/// Append `error` and `error_description` to `referrer`, keeping any query
/// it already has.
pub fn redirect_with_error(referrer: &str, code: &str, description: &str) -> String {
	match Url::parse(referrer) {
		Ok(mut url) => {
			url.query_pairs_mut()
				.append_pair("error", code)
				.append_pair("error_description", description);
			url.to_string()
		}
		Err(_) => {
			let query = url::form_urlencoded::Serializer::new(String::new())
				.append_pair("error", code)
				.append_pair("error_description", description)
				.finish();
			let separator = if referrer.contains('?') { '&' } else { '?' };
			format!("{referrer}{separator}{query}")
		}
	}
}
