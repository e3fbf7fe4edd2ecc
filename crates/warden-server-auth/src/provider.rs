// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provider adapter contract.
//!
//! Each external provider turns an authorization code into a
//! [`ProviderToken`] and the token into normalized [`UserData`]. Adapters
//! live in their own crates (`warden-server-auth-cognito`, `-okta`,
//! `-github`) and implement [`OAuthProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden_common_secret::SecretString;

use crate::user::normalize_email;

/// Errors raised by provider adapters.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
	/// Transport failure or timeout talking to the provider.
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The provider answered with an error.
	#[error("provider error: {0}")]
	Provider(String),

	#[error("failed to parse response: {0}")]
	Parse(String),

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// The provider returned a profile without any email address.
	///
	/// Carries the partial profile so a returning identity can still be
	/// resolved by subject.
	#[error("provider returned no email address")]
	MissingEmail { user_data: Box<UserData> },
}

/// Token returned by a provider's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToken {
	pub access_token: SecretString,
	#[serde(default)]
	pub token_type: Option<String>,
	#[serde(default)]
	pub expires_in: Option<u64>,
	#[serde(default)]
	pub refresh_token: Option<SecretString>,
	#[serde(default)]
	pub id_token: Option<SecretString>,
}

/// One email address reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
	pub email: String,
	pub verified: bool,
	pub primary: bool,
}

/// Provider profile normalized to a common shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
	/// Stable subject identifier at the provider.
	pub subject: String,
	pub email: Option<String>,
	pub email_verified: bool,
	pub full_name: Option<String>,
	pub given_name: Option<String>,
	pub family_name: Option<String>,
	pub avatar_url: Option<String>,
	pub preferred_username: Option<String>,
	#[serde(default)]
	pub emails: Vec<EmailRecord>,
	/// Provider-specific claims kept alongside the known ones (Okta `groups`).
	#[serde(default)]
	pub custom_claims: Map<String, Value>,
}

impl UserData {
	pub fn new(subject: impl Into<String>) -> Self {
		Self {
			subject: subject.into(),
			..Default::default()
		}
	}

	/// The address to sign the user up with.
	///
	/// The profile email wins. Otherwise verified records come before
	/// unverified ones, the primary flag breaking ties, and the first record
	/// is the last resort.
	pub fn primary_email(&self) -> Option<&str> {
		if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
			return Some(email);
		}
		self.emails
			.iter()
			.find(|r| r.primary && r.verified)
			.or_else(|| self.emails.iter().find(|r| r.verified))
			.or_else(|| self.emails.iter().find(|r| r.primary))
			.or_else(|| self.emails.first())
			.map(|r| r.email.as_str())
	}

	/// Whether the provider vouches for [`UserData::primary_email`].
	pub fn primary_email_verified(&self) -> bool {
		match self.primary_email() {
			Some(email) => self.has_verified_email(email),
			None => false,
		}
	}

	/// Whether `email` is one of the provider's verified addresses,
	/// compared case-insensitively.
	pub fn has_verified_email(&self, email: &str) -> bool {
		let wanted = normalize_email(email);
		let profile_match = self.email_verified
			&& self
				.email
				.as_deref()
				.is_some_and(|e| normalize_email(e) == wanted);
		profile_match
			|| self
				.emails
				.iter()
				.any(|r| r.verified && normalize_email(&r.email) == wanted)
	}

	/// Best human-readable name: the full name, else given and family names.
	pub fn display_name(&self) -> Option<String> {
		if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
			return Some(name.trim().to_string());
		}
		let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.filter(|p| !p.is_empty())
			.collect();
		if parts.is_empty() {
			None
		} else {
			Some(parts.join(" "))
		}
	}

	/// Fail with [`ProviderError::MissingEmail`] when no address is known.
	pub fn require_email(self) -> Result<Self, ProviderError> {
		if self.primary_email().is_some() {
			Ok(self)
		} else {
			Err(ProviderError::MissingEmail {
				user_data: Box::new(self),
			})
		}
	}

	/// Claims snapshot for the identity record.
	///
	/// Every known key is present; absent values are `null` so that a merge
	/// removes claims the provider stopped sending.
	pub fn identity_claims(&self) -> Map<String, Value> {
		let mut claims = self.custom_claims.clone();
		let opt = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);

		claims.insert("sub".into(), Value::String(self.subject.clone()));
		claims.insert("provider_id".into(), Value::String(self.subject.clone()));
		claims.insert(
			"email".into(),
			self
				.primary_email()
				.map(|e| Value::String(normalize_email(e)))
				.unwrap_or(Value::Null),
		);
		claims.insert("email_verified".into(), Value::Bool(self.primary_email_verified()));
		claims.insert("full_name".into(), opt(&self.full_name));
		claims.insert("name".into(), opt(&self.full_name));
		claims.insert("given_name".into(), opt(&self.given_name));
		claims.insert("family_name".into(), opt(&self.family_name));
		claims.insert("avatar_url".into(), opt(&self.avatar_url));
		claims.insert("preferred_username".into(), opt(&self.preferred_username));
		claims
	}
}

/// An external OAuth 2.0 / OIDC identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
	/// Registry key, e.g. `"cognito"`.
	fn name(&self) -> &'static str;

	/// URL the browser is sent to, carrying `state` for the round trip.
	fn authorization_url(&self, state: &str) -> String;

	/// Exchange a single-use authorization code.
	async fn get_oauth_token(&self, code: &str) -> Result<ProviderToken, ProviderError>;

	/// Fetch and normalize the signed-in user's profile.
	async fn get_user_data(&self, token: &ProviderToken) -> Result<UserData, ProviderError>;
}
