// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The set of configured external providers.
//!
//! Built once at startup from [`OAuthConfig`] and never mutated. Every
//! adapter shares one `reqwest::Client` whose timeout bounds each call to
//! a provider.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use warden_server_auth::{OAuthProvider, ProviderConfig, ProviderError, ProviderToken, UserData};
use warden_server_auth_cognito::CognitoProvider;
use warden_server_auth_github::GitHubProvider;
use warden_server_auth_okta::OktaProvider;
use warden_server_config::{OAuthConfig, OAuthProviderConfig};

/// The closed set of supported providers.
#[derive(Debug, Clone)]
pub enum ExternalProvider {
	Cognito(CognitoProvider),
	Okta(OktaProvider),
	GitHub(GitHubProvider),
}

impl ExternalProvider {
	fn inner(&self) -> &dyn OAuthProvider {
		match self {
			ExternalProvider::Cognito(p) => p,
			ExternalProvider::Okta(p) => p,
			ExternalProvider::GitHub(p) => p,
		}
	}
}

#[async_trait]
impl OAuthProvider for ExternalProvider {
	fn name(&self) -> &'static str {
		self.inner().name()
	}

	fn authorization_url(&self, state: &str) -> String {
		self.inner().authorization_url(state)
	}

	async fn get_oauth_token(&self, code: &str) -> Result<ProviderToken, ProviderError> {
		self.inner().get_oauth_token(code).await
	}

	async fn get_user_data(&self, token: &ProviderToken) -> Result<UserData, ProviderError> {
		self.inner().get_user_data(token).await
	}
}

/// Immutable name → adapter lookup.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
	providers: BTreeMap<&'static str, ExternalProvider>,
}

impl ProviderRegistry {
	/// Construct an adapter for every enabled provider.
	///
	/// # Errors
	/// Fails if the HTTP client cannot be built or an adapter rejects its
	/// configuration.
	#[tracing::instrument(skip(config))]
	pub fn from_config(config: &OAuthConfig, timeout: Duration) -> Result<Self, ProviderError> {
		let client = warden_common_http::new_client_with_timeout(timeout)?;
		let mut providers = Vec::new();

		if let Some(c) = &config.cognito {
			providers.push(ExternalProvider::Cognito(CognitoProvider::new(
				provider_config(c),
				client.clone(),
			)?));
		}
		if let Some(c) = &config.okta {
			providers.push(ExternalProvider::Okta(OktaProvider::new(
				provider_config(c),
				client.clone(),
			)?));
		}
		if let Some(c) = &config.github {
			providers.push(ExternalProvider::GitHub(GitHubProvider::new(
				provider_config(c),
				client,
			)?));
		}

		let registry = Self::from_providers(providers);
		tracing::info!(providers = ?registry.names(), "provider registry built");
		Ok(registry)
	}

	pub fn from_providers(providers: impl IntoIterator<Item = ExternalProvider>) -> Self {
		Self {
			providers: providers.into_iter().map(|p| (p.name(), p)).collect(),
		}
	}

	pub fn get(&self, name: &str) -> Option<&ExternalProvider> {
		self.providers.get(name)
	}

	/// Names of the configured providers, sorted.
	pub fn names(&self) -> Vec<&'static str> {
		self.providers.keys().copied().collect()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}

fn provider_config(config: &OAuthProviderConfig) -> ProviderConfig {
	ProviderConfig {
		client_id: config.client_id.clone(),
		client_secret: config.client_secret.clone(),
		redirect_uri: config.redirect_uri.clone(),
		url: config.url.clone(),
		api_url: config.api_url.clone(),
		scopes: config.scopes.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_common_secret::SecretString;

	fn oauth_provider(url: Option<&str>) -> OAuthProviderConfig {
		OAuthProviderConfig {
			client_id: "client".to_string(),
			client_secret: SecretString::from("secret"),
			redirect_uri: "https://warden.example.com/callback".to_string(),
			url: url.map(String::from),
			api_url: None,
			scopes: vec![],
		}
	}

	#[test]
	fn builds_only_enabled_providers() {
		let config = OAuthConfig {
			cognito: Some(oauth_provider(Some("https://pool.auth.example.com"))),
			okta: None,
			github: Some(oauth_provider(None)),
		};
		let registry = ProviderRegistry::from_config(&config, Duration::from_secs(5)).unwrap();

		assert_eq!(registry.names(), vec!["cognito", "github"]);
		assert!(registry.get("okta").is_none());
		assert_eq!(registry.get("cognito").map(|p| p.name()), Some("cognito"));
	}

	#[test]
	fn empty_config_is_empty_registry() {
		let registry =
			ProviderRegistry::from_config(&OAuthConfig::default(), Duration::from_secs(5)).unwrap();
		assert!(registry.is_empty());
	}

	#[test]
	fn okta_without_issuer_fails() {
		let config = OAuthConfig {
			okta: Some(oauth_provider(None)),
			..Default::default()
		};
		assert!(matches!(
			ProviderRegistry::from_config(&config, Duration::from_secs(5)),
			Err(ProviderError::InvalidConfig(_))
		));
	}

	#[test]
	fn delegates_authorization_url() {
		let config = OAuthConfig {
			cognito: Some(oauth_provider(Some("https://pool.auth.example.com"))),
			..Default::default()
		};
		let registry = ProviderRegistry::from_config(&config, Duration::from_secs(5)).unwrap();
		let url = registry.get("cognito").unwrap().authorization_url("st");
		assert!(url.starts_with("https://pool.auth.example.com/oauth2/authorize?"));
		assert!(url.contains("state=st"));
	}
}
