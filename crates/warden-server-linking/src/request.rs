// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use url::Url;
use warden_server_auth::User;
use warden_server_config::AuthConfig;

use crate::error::{redirect_with_error, ErrorDisposition, LinkError};

/// Query of `GET /authorize`.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
	pub provider: Option<String>,
	pub redirect_to: Option<String>,
	pub invite_token: Option<String>,
}

/// Query of `GET /callback`.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
	pub code: Option<String>,
	pub state: Option<String>,
	pub error: Option<String>,
	pub error_description: Option<String>,
}

/// Signup and redirect policy applied by the engine.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
	pub site_url: String,
	pub uri_allow_list: Vec<String>,
	pub signups_disabled: bool,
	pub signup_notify_recipients: Vec<String>,
}

impl From<&AuthConfig> for LinkPolicy {
	fn from(config: &AuthConfig) -> Self {
		Self {
			site_url: config.site_url.clone(),
			uri_allow_list: config.uri_allow_list.clone(),
			signups_disabled: config.signups_disabled,
			signup_notify_recipients: config.signup_notify_recipients.clone(),
		}
	}
}

/// Which branch of the reconciliation produced the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
	/// The `(provider, subject)` identity already existed.
	Existing,
	/// A pending invite was claimed.
	InviteAccepted,
	/// A new identity was attached to a user found by email.
	LinkedByEmail,
	/// A new user and identity were created.
	SignedUp,
}

impl fmt::Display for LinkOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			LinkOutcome::Existing => "existing",
			LinkOutcome::InviteAccepted => "invite_accepted",
			LinkOutcome::LinkedByEmail => "linked_by_email",
			LinkOutcome::SignedUp => "signed_up",
		};
		f.write_str(s)
	}
}

/// A completed callback.
#[derive(Debug, Clone)]
pub struct LinkSuccess {
	pub user: User,
	pub provider: String,
	pub outcome: LinkOutcome,
	/// Where to send the browser.
	pub redirect_url: String,
}

/// A failed callback, with the referrer a redirectable error goes back to.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct LinkFailure {
	#[source]
	pub error: LinkError,
	pub referrer: String,
}

impl LinkFailure {
	pub fn disposition(&self) -> ErrorDisposition {
		self.error.disposition()
	}

	/// The error redirect, when this failure is reported by redirect.
	pub fn redirect_url(&self) -> Option<String> {
		match self.disposition() {
			ErrorDisposition::Redirect { code, description } => {
				Some(redirect_with_error(&self.referrer, &code, &description))
			}
			ErrorDisposition::Status { .. } => None,
		}
	}
}

/// `referrer` with the session parameters, if any, as its fragment.
pub(crate) fn success_redirect(referrer: &str, fragment: Option<String>) -> String {
	let Some(fragment) = fragment.filter(|f| !f.is_empty()) else {
		return referrer.to_string();
	};
	match Url::parse(referrer) {
		Ok(mut url) => {
			url.set_fragment(Some(&fragment));
			url.to_string()
		}
		Err(_) => format!("{referrer}#{fragment}"),
	}
}
