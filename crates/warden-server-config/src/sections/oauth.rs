// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External OAuth provider configuration.
//!
//! Each provider has its own table (`[oauth.cognito]`, `[oauth.okta]`,
//! `[oauth.github]`) with the same fields. A provider is only built when
//! `enabled = true`, and then `client_id`, `client_secret` and
//! `redirect_uri` are mandatory. Cognito and Okta also need `url`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use warden_common_secret::SecretString;

/// Configuration layer for one provider (all fields optional for layering).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfigLayer {
	pub enabled: Option<bool>,
	pub client_id: Option<String>,
	#[serde(skip_serializing)]
	pub client_secret: Option<SecretString>,
	pub redirect_uri: Option<String>,
	/// Provider base URL: Cognito domain, Okta issuer, or GitHub host.
	pub url: Option<String>,
	/// API host override, GitHub only.
	pub api_url: Option<String>,
	/// Comma- or space-separated scopes.
	pub scopes: Option<String>,
}

impl ProviderConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: ProviderConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
		if other.redirect_uri.is_some() {
			self.redirect_uri = other.redirect_uri;
		}
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.api_url.is_some() {
			self.api_url = other.api_url;
		}
		if other.scopes.is_some() {
			self.scopes = other.scopes;
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled.unwrap_or(false)
	}

	/// Build the final config, returning None if the provider is disabled.
	pub fn build(
		self,
		name: &str,
		url_required: bool,
	) -> Result<Option<OAuthProviderConfig>, ConfigError> {
		if !self.is_enabled() {
			return Ok(None);
		}

		let client_id = self
			.client_id
			.filter(|s| !s.trim().is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(format!("{name} OAuth client_id is required when enabled"))
			})?;

		let client_secret = self
			.client_secret
			.filter(|s| !s.expose().trim().is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(format!(
					"{name} OAuth client_secret is required when enabled"
				))
			})?;

		let redirect_uri = self
			.redirect_uri
			.filter(|s| !s.trim().is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(format!(
					"{name} OAuth redirect_uri is required when enabled"
				))
			})?;

		let url = self.url.filter(|s| !s.trim().is_empty());
		if url_required && url.is_none() {
			return Err(ConfigError::Validation(format!(
				"{name} OAuth url is required when enabled"
			)));
		}

		Ok(Some(OAuthProviderConfig {
			client_id,
			client_secret,
			redirect_uri,
			url,
			api_url: self.api_url.filter(|s| !s.trim().is_empty()),
			scopes: self.scopes.as_deref().map(parse_scopes).unwrap_or_default(),
		}))
	}
}

/// Validated configuration for one enabled provider.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
	pub client_id: String,
	pub client_secret: SecretString,
	pub redirect_uri: String,
	pub url: Option<String>,
	pub api_url: Option<String>,
	/// Empty means "use the provider's defaults".
	pub scopes: Vec<String>,
}

/// Split a scope list on spaces or commas.
pub fn parse_scopes(scope_str: &str) -> Vec<String> {
	scope_str
		.split([' ', ','])
		.map(|s| s.trim().to_string())
		.filter(|s| !s.is_empty())
		.collect()
}

/// OAuth configuration layer containing all providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfigLayer {
	#[serde(default)]
	pub cognito: ProviderConfigLayer,
	#[serde(default)]
	pub okta: ProviderConfigLayer,
	#[serde(default)]
	pub github: ProviderConfigLayer,
}

impl OAuthConfigLayer {
	pub fn merge(&mut self, other: OAuthConfigLayer) {
		self.cognito.merge(other.cognito);
		self.okta.merge(other.okta);
		self.github.merge(other.github);
	}

	pub fn build(self) -> Result<OAuthConfig, ConfigError> {
		Ok(OAuthConfig {
			cognito: self.cognito.build("Cognito", true)?,
			okta: self.okta.build("Okta", true)?,
			github: self.github.build("GitHub", false)?,
		})
	}
}

/// Resolved configuration for every enabled provider.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
	pub cognito: Option<OAuthProviderConfig>,
	pub okta: Option<OAuthProviderConfig>,
	pub github: Option<OAuthProviderConfig>,
}

impl OAuthConfig {
	pub fn has_any_provider(&self) -> bool {
		self.cognito.is_some() || self.okta.is_some() || self.github.is_some()
	}

	/// Names of the enabled providers.
	pub fn enabled(&self) -> Vec<&'static str> {
		[
			("cognito", self.cognito.is_some()),
			("okta", self.okta.is_some()),
			("github", self.github.is_some()),
		]
		.into_iter()
		.filter_map(|(name, on)| on.then_some(name))
		.collect()
	}
}
