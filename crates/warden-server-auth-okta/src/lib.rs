// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Okta OpenID Connect provider for Warden.
//!
//! `config.url` is the authorization server issuer, for example
//! `https://dev-123456.okta.com/oauth2/default`. Endpoints hang off it:
//! `/v1/authorize`, `/v1/token` and `/v1/userinfo`. The token endpoint is
//! called with HTTP Basic client authentication.
//!
//! Group memberships are kept as the `groups` custom claim when the
//! authorization server is configured to release them.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use warden_server_auth::oauth2::{self, ClientAuth};
use warden_server_auth::{
	EmailRecord, OAuthProvider, ProviderConfig, ProviderError, ProviderToken, UserData,
};

pub const PROVIDER_NAME: &str = "okta";

pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Claims returned by `/v1/userinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct OktaUserInfo {
	pub sub: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub email_verified: Option<bool>,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub preferred_username: Option<String>,
	#[serde(default)]
	pub given_name: Option<String>,
	#[serde(default)]
	pub family_name: Option<String>,
	#[serde(default)]
	pub picture: Option<String>,
	#[serde(default)]
	pub groups: Option<Vec<String>>,
}

impl From<OktaUserInfo> for UserData {
	fn from(info: OktaUserInfo) -> Self {
		let email = info.email.filter(|e| !e.trim().is_empty());
		let verified = info.email_verified.unwrap_or(false);
		let emails = email
			.iter()
			.map(|e| EmailRecord {
				email: e.clone(),
				verified,
				primary: true,
			})
			.collect();

		let mut data = UserData {
			subject: info.sub,
			email,
			email_verified: verified,
			full_name: info.name,
			given_name: info.given_name,
			family_name: info.family_name,
			avatar_url: info.picture,
			preferred_username: info.preferred_username,
			emails,
			..Default::default()
		};
		if let Some(groups) = info.groups {
			data
				.custom_claims
				.insert("groups".to_string(), serde_json::json!(groups));
		}
		data
	}
}

#[derive(Debug, Clone)]
pub struct OktaProvider {
	config: ProviderConfig,
	authorize_url: Url,
	token_url: Url,
	userinfo_url: Url,
	http_client: reqwest::Client,
}

impl OktaProvider {
	#[tracing::instrument(skip_all, name = "OktaProvider::new")]
	pub fn new(
		mut config: ProviderConfig,
		http_client: reqwest::Client,
	) -> Result<Self, ProviderError> {
		config.validate()?;
		let issuer = config
			.url
			.clone()
			.filter(|u| !u.trim().is_empty())
			.ok_or_else(|| {
				ProviderError::InvalidConfig("okta issuer url is required".to_string())
			})?;

		if config.scopes.is_empty() {
			config.scopes = DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect();
		}

		Ok(Self {
			authorize_url: oauth2::endpoint(&issuer, "v1/authorize")?,
			token_url: oauth2::endpoint(&issuer, "v1/token")?,
			userinfo_url: oauth2::endpoint(&issuer, "v1/userinfo")?,
			config,
			http_client,
		})
	}

	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}
}

#[async_trait]
impl OAuthProvider for OktaProvider {
	fn name(&self) -> &'static str {
		PROVIDER_NAME
	}

	fn authorization_url(&self, state: &str) -> String {
		oauth2::authorization_url(&self.authorize_url, &self.config, state)
	}

	#[tracing::instrument(skip(self, code), name = "OktaProvider::get_oauth_token")]
	async fn get_oauth_token(&self, code: &str) -> Result<ProviderToken, ProviderError> {
		oauth2::exchange_code(
			&self.http_client,
			&self.token_url,
			&self.config,
			ClientAuth::Basic,
			code,
		)
		.await
	}

	#[tracing::instrument(skip(self, token), name = "OktaProvider::get_user_data")]
	async fn get_user_data(&self, token: &ProviderToken) -> Result<UserData, ProviderError> {
		let info: OktaUserInfo =
			oauth2::get_json(&self.http_client, &self.userinfo_url, &token.access_token, &[])
				.await?;
		UserData::from(info).require_email()
	}
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;
	use warden_common_secret::SecretString;

	proptest! {
		#[test]
		fn endpoints_stay_under_issuer(org in "[a-z0-9]{3,12}", server in "[a-z]{1,10}") {
			let issuer = format!("https://{org}.okta.com/oauth2/{server}");
			let config = ProviderConfig {
				client_id: "id".to_string(),
				client_secret: SecretString::from("secret"),
				redirect_uri: "https://warden.example.com/callback".to_string(),
				url: Some(issuer.clone()),
				api_url: None,
				scopes: vec![],
			};
			let provider = OktaProvider::new(config, reqwest::Client::new()).unwrap();
			let expected = format!("{issuer}/v1/authorize");
			prop_assert!(provider.authorization_url("s").starts_with(&expected));
		}
	}
}
