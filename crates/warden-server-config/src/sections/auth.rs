// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication policy configuration.

use serde::Deserialize;
use warden_common_secret::SecretString;

pub const DEFAULT_STATE_TTL_SECS: u64 = 600;
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 10;

/// Authentication configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Where users land after sign-in when no acceptable `redirect_to` is given.
	pub site_url: String,
	/// Extra redirect targets accepted verbatim.
	pub uri_allow_list: Vec<String>,
	pub signups_disabled: bool,
	/// HMAC key for the OAuth state token.
	pub jwt_secret: SecretString,
	pub state_ttl_secs: u64,
	/// Bound on every request to an external provider.
	pub external_timeout_secs: u64,
	/// Operators told about each new signup.
	pub signup_notify_recipients: Vec<String>,
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize("http://localhost:9999")
	}
}

/// Authentication configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub site_url: Option<String>,
	#[serde(default)]
	pub uri_allow_list: Option<Vec<String>>,
	#[serde(default)]
	pub signups_disabled: Option<bool>,
	#[serde(default)]
	pub jwt_secret: Option<SecretString>,
	#[serde(default)]
	pub state_ttl_secs: Option<u64>,
	#[serde(default)]
	pub external_timeout_secs: Option<u64>,
	#[serde(default)]
	pub signup_notify_recipients: Option<Vec<String>>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.site_url.is_some() {
			self.site_url = other.site_url;
		}
		if other.uri_allow_list.is_some() {
			self.uri_allow_list = other.uri_allow_list;
		}
		if other.signups_disabled.is_some() {
			self.signups_disabled = other.signups_disabled;
		}
		if other.jwt_secret.is_some() {
			self.jwt_secret = other.jwt_secret;
		}
		if other.state_ttl_secs.is_some() {
			self.state_ttl_secs = other.state_ttl_secs;
		}
		if other.external_timeout_secs.is_some() {
			self.external_timeout_secs = other.external_timeout_secs;
		}
		if other.signup_notify_recipients.is_some() {
			self.signup_notify_recipients = other.signup_notify_recipients;
		}
	}

	/// Resolve the layer. `site_url` falls back to the server's base URL.
	pub fn finalize(self, base_url: &str) -> AuthConfig {
		AuthConfig {
			site_url: self.site_url.unwrap_or_else(|| base_url.to_string()),
			uri_allow_list: self.uri_allow_list.unwrap_or_default(),
			signups_disabled: self.signups_disabled.unwrap_or(false),
			jwt_secret: self.jwt_secret.unwrap_or_else(|| SecretString::from("")),
			state_ttl_secs: self.state_ttl_secs.unwrap_or(DEFAULT_STATE_TTL_SECS),
			external_timeout_secs: self
				.external_timeout_secs
				.unwrap_or(DEFAULT_EXTERNAL_TIMEOUT_SECS),
			signup_notify_recipients: self.signup_notify_recipients.unwrap_or_default(),
		}
	}
}
