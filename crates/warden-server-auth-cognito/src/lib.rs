// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Amazon Cognito user pool provider for Warden.
//!
//! Cognito exposes the standard authorization-code endpoints under the user
//! pool's hosted domain:
//!
//! - `{url}/oauth2/authorize`
//! - `{url}/oauth2/token`
//! - `{url}/oauth2/userInfo`
//!
//! `openid` is always requested; configured scopes are added to it.
//! Cognito only releases addresses it has verified, so any email returned
//! by `userInfo` is treated as verified and primary.
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_server_auth::{OAuthProvider, ProviderConfig};
//! use warden_server_auth_cognito::CognitoProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig {
//! 	client_id: "client".to_string(),
//! 	client_secret: "secret".into(),
//! 	redirect_uri: "https://warden.example.com/callback".to_string(),
//! 	url: Some("https://my-pool.auth.us-east-1.amazoncognito.com".to_string()),
//! 	api_url: None,
//! 	scopes: vec!["email".to_string(), "profile".to_string()],
//! };
//! let provider = CognitoProvider::new(config, reqwest::Client::new())?;
//!
//! let url = provider.authorization_url("signed-state");
//! let token = provider.get_oauth_token("code-from-callback").await?;
//! let user = provider.get_user_data(&token).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use warden_server_auth::oauth2::{self, ClientAuth};
use warden_server_auth::{
	EmailRecord, OAuthProvider, ProviderConfig, ProviderError, ProviderToken, UserData,
};

pub const PROVIDER_NAME: &str = "cognito";

const REQUIRED_SCOPE: &str = "openid";

/// Profile returned by `/oauth2/userInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct CognitoUser {
	pub sub: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub given_name: Option<String>,
	#[serde(default)]
	pub family_name: Option<String>,
	#[serde(default)]
	pub preferred_username: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub picture: Option<String>,
}

impl From<CognitoUser> for UserData {
	fn from(user: CognitoUser) -> Self {
		let email = user.email.filter(|e| !e.trim().is_empty());
		let emails = email
			.iter()
			.map(|e| EmailRecord {
				email: e.clone(),
				verified: true,
				primary: true,
			})
			.collect();

		UserData {
			subject: user.sub,
			email_verified: email.is_some(),
			email,
			full_name: user.name,
			given_name: user.given_name,
			family_name: user.family_name,
			avatar_url: user.picture,
			preferred_username: user.preferred_username,
			emails,
			..Default::default()
		}
	}
}

#[derive(Debug, Clone)]
pub struct CognitoProvider {
	config: ProviderConfig,
	authorize_url: Url,
	token_url: Url,
	userinfo_url: Url,
	http_client: reqwest::Client,
}

impl CognitoProvider {
	/// Build the adapter. `config.url` must be the user pool domain.
	#[tracing::instrument(skip_all, name = "CognitoProvider::new")]
	pub fn new(
		mut config: ProviderConfig,
		http_client: reqwest::Client,
	) -> Result<Self, ProviderError> {
		config.validate()?;
		let base = config
			.url
			.clone()
			.filter(|u| !u.trim().is_empty())
			.ok_or_else(|| ProviderError::InvalidConfig("cognito url is required".to_string()))?;

		if !config.scopes.iter().any(|s| s == REQUIRED_SCOPE) {
			config.scopes.insert(0, REQUIRED_SCOPE.to_string());
		}

		Ok(Self {
			authorize_url: oauth2::endpoint(&base, "oauth2/authorize")?,
			token_url: oauth2::endpoint(&base, "oauth2/token")?,
			userinfo_url: oauth2::endpoint(&base, "oauth2/userInfo")?,
			config,
			http_client,
		})
	}

	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}
}

#[async_trait]
impl OAuthProvider for CognitoProvider {
	fn name(&self) -> &'static str {
		PROVIDER_NAME
	}

	fn authorization_url(&self, state: &str) -> String {
		oauth2::authorization_url(&self.authorize_url, &self.config, state)
	}

	#[tracing::instrument(skip(self, code), name = "CognitoProvider::get_oauth_token")]
	async fn get_oauth_token(&self, code: &str) -> Result<ProviderToken, ProviderError> {
		oauth2::exchange_code(
			&self.http_client,
			&self.token_url,
			&self.config,
			ClientAuth::Post,
			code,
		)
		.await
	}

	#[tracing::instrument(skip(self, token), name = "CognitoProvider::get_user_data")]
	async fn get_user_data(&self, token: &ProviderToken) -> Result<UserData, ProviderError> {
		tracing::debug!("fetching Cognito user info");
		let user: CognitoUser =
			oauth2::get_json(&self.http_client, &self.userinfo_url, &token.access_token, &[])
				.await?;
		UserData::from(user).require_email()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_common_secret::SecretString;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config(url: &str) -> ProviderConfig {
		ProviderConfig {
			client_id: "testclientid".to_string(),
			client_secret: SecretString::from("testsecret"),
			redirect_uri: "https://warden.example.com/callback".to_string(),
			url: Some(url.to_string()),
			api_url: None,
			scopes: vec!["email".to_string()],
		}
	}

	fn token(value: &str) -> ProviderToken {
		serde_json::from_value(serde_json::json!({ "access_token": value })).unwrap()
	}

	#[test]
	fn requires_url() {
		let mut c = config("https://pool.example.com");
		c.url = None;
		assert!(matches!(
			CognitoProvider::new(c, reqwest::Client::new()),
			Err(ProviderError::InvalidConfig(_))
		));
	}

	#[test]
	fn rejects_missing_credentials() {
		let mut c = config("https://pool.example.com");
		c.client_id = String::new();
		assert!(CognitoProvider::new(c, reqwest::Client::new()).is_err());
	}

	#[test]
	fn authorization_url_targets_pool_and_requests_openid() {
		let client = reqwest::Client::new();
		let provider = CognitoProvider::new(config("https://pool.example.com"), client).unwrap();
		let url = Url::parse(&provider.authorization_url("st")).unwrap();

		assert_eq!(url.path(), "/oauth2/authorize");
		let scope = url
			.query_pairs()
			.find(|(k, _)| k == "scope")
			.map(|(_, v)| v.into_owned());
		assert_eq!(scope.as_deref(), Some("openid email"));
	}

	#[test]
	fn openid_is_not_duplicated() {
		let mut c = config("https://pool.example.com");
		c.scopes = vec!["openid".to_string(), "profile".to_string()];
		let provider = CognitoProvider::new(c, reqwest::Client::new()).unwrap();
		assert_eq!(provider.config().scopes_string(), "openid profile");
	}

	#[tokio::test]
	async fn exchanges_code_and_fetches_user() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/oauth2/token"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"access_token": "cognito_token",
				"expires_in": 100000
			})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/oauth2/userInfo"))
			.and(header("authorization", "Bearer cognito_token"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"name": "Cognito Test",
				"email": "cognito@example.com",
				"sub": "cognitotestid"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let provider = CognitoProvider::new(config(&server.uri()), reqwest::Client::new()).unwrap();
		let token = provider.get_oauth_token("code").await.unwrap();
		let user = provider.get_user_data(&token).await.unwrap();

		assert_eq!(user.subject, "cognitotestid");
		assert_eq!(user.primary_email(), Some("cognito@example.com"));
		assert!(user.email_verified);
		assert_eq!(user.emails.len(), 1);
		assert!(user.emails[0].primary && user.emails[0].verified);
		assert_eq!(user.full_name.as_deref(), Some("Cognito Test"));
	}

	#[tokio::test]
	async fn missing_email_carries_subject() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/oauth2/userInfo"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"name": "Cognito Test",
				"sub": "cognitotestid"
			})))
			.mount(&server)
			.await;

		let provider = CognitoProvider::new(config(&server.uri()), reqwest::Client::new()).unwrap();
		match provider.get_user_data(&token("cognito_token")).await {
			Err(ProviderError::MissingEmail { user_data }) => {
				assert_eq!(user_data.subject, "cognitotestid");
			}
			other => panic!("expected MissingEmail, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn userinfo_rejection_is_provider_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/oauth2/userInfo"))
			.respond_with(ResponseTemplate::new(401))
			.mount(&server)
			.await;

		let provider = CognitoProvider::new(config(&server.uri()), reqwest::Client::new()).unwrap();
		let err = provider.get_user_data(&token("expired")).await.unwrap_err();
		assert!(matches!(err, ProviderError::Provider(_)));
	}

	#[test]
	fn client_secret_is_not_logged() {
		let client = reqwest::Client::new();
		let provider = CognitoProvider::new(config("https://pool.example.com"), client).unwrap();
		assert!(!format!("{provider:?}").contains("testsecret"));
	}
}
