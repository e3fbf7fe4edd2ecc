// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub OAuth 2.0 provider for Warden.
//!
//! GitHub is plain OAuth 2.0 rather than OIDC, so the profile is assembled
//! from two API calls made concurrently:
//!
//! 1. `GET {api_url}/user` for the numeric id, login, name and avatar
//! 2. `GET {api_url}/user/emails` for every address with its verified and
//!    primary flags
//!
//! The numeric id is the subject; logins can be renamed.
//!
//! # Security Considerations
//!
//! - Only addresses GitHub marks `verified` count for invite matching or
//!   account linking.
//! - `url` and `api_url` can point at a GitHub Enterprise Server.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use warden_server_auth::oauth2::{self, ClientAuth};
use warden_server_auth::{
	EmailRecord, OAuthProvider, ProviderConfig, ProviderError, ProviderToken, UserData,
};

pub const PROVIDER_NAME: &str = "github";

pub const DEFAULT_URL: &str = "https://github.com";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SCOPES: [&str; 2] = ["user:email", "read:user"];

const API_HEADERS: [(&str, &str); 2] = [
	("Accept", "application/vnd.github+json"),
	("X-GitHub-Api-Version", "2022-11-28"),
];

/// Profile from `/user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
	/// Stable numeric id.
	pub id: i64,
	pub login: String,
	#[serde(default)]
	pub name: Option<String>,
	/// Public email only; may be absent or unverified.
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

/// One entry from `/user/emails`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
	pub email: String,
	pub primary: bool,
	pub verified: bool,
}

/// Combine the two API responses into normalized user data.
pub fn to_user_data(user: GitHubUser, emails: Vec<GitHubEmail>) -> UserData {
	let records: Vec<EmailRecord> = emails
		.into_iter()
		.map(|e| EmailRecord {
			email: e.email,
			verified: e.verified,
			primary: e.primary,
		})
		.collect();

	// Verified primary, then any verified address, then the bare primary.
	let chosen = records
		.iter()
		.find(|r| r.primary && r.verified)
		.or_else(|| records.iter().find(|r| r.verified))
		.or_else(|| records.iter().find(|r| r.primary));
	let (email, email_verified) = match (chosen, user.email) {
		(Some(record), _) => (Some(record.email.clone()), record.verified),
		(None, Some(public)) => {
			let verified = records
				.iter()
				.any(|r| r.verified && r.email.eq_ignore_ascii_case(&public));
			(Some(public), verified)
		}
		(None, None) => (None, false),
	};

	UserData {
		subject: user.id.to_string(),
		email: email.filter(|e| !e.trim().is_empty()),
		email_verified,
		full_name: user.name,
		avatar_url: user.avatar_url,
		preferred_username: Some(user.login),
		emails: records,
		..Default::default()
	}
}

#[derive(Debug, Clone)]
pub struct GitHubProvider {
	config: ProviderConfig,
	authorize_url: Url,
	token_url: Url,
	user_url: Url,
	emails_url: Url,
	http_client: reqwest::Client,
}

impl GitHubProvider {
	#[tracing::instrument(skip_all, name = "GitHubProvider::new")]
	pub fn new(
		mut config: ProviderConfig,
		http_client: reqwest::Client,
	) -> Result<Self, ProviderError> {
		config.validate()?;
		let base = config
			.url
			.clone()
			.filter(|u| !u.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_URL.to_string());
		let api = config
			.api_url
			.clone()
			.filter(|u| !u.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_API_URL.to_string());

		if config.scopes.is_empty() {
			config.scopes = DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect();
		}

		Ok(Self {
			authorize_url: oauth2::endpoint(&base, "login/oauth/authorize")?,
			token_url: oauth2::endpoint(&base, "login/oauth/access_token")?,
			user_url: oauth2::endpoint(&api, "user")?,
			emails_url: oauth2::endpoint(&api, "user/emails")?,
			config,
			http_client,
		})
	}

	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
	fn name(&self) -> &'static str {
		PROVIDER_NAME
	}

	fn authorization_url(&self, state: &str) -> String {
		oauth2::authorization_url(&self.authorize_url, &self.config, state)
	}

	#[tracing::instrument(skip(self, code), name = "GitHubProvider::get_oauth_token")]
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

	#[tracing::instrument(skip(self, token), name = "GitHubProvider::get_user_data")]
	async fn get_user_data(&self, token: &ProviderToken) -> Result<UserData, ProviderError> {
		tracing::debug!("fetching GitHub user and emails");
		let (user, emails) = futures::try_join!(
			oauth2::get_json::<GitHubUser>(
				&self.http_client,
				&self.user_url,
				&token.access_token,
				&API_HEADERS,
			),
			oauth2::get_json::<Vec<GitHubEmail>>(
				&self.http_client,
				&self.emails_url,
				&token.access_token,
				&API_HEADERS,
			),
		)?;
		to_user_data(user, emails).require_email()
	}
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		/// The subject is always the numeric id, never the login.
		#[test]
		fn subject_is_numeric_id(id in 1i64..i64::MAX, login in "[a-z][a-z0-9-]{0,38}") {
			let data = to_user_data(
				GitHubUser { id, login, name: None, email: None, avatar_url: None },
				vec![],
			);
			prop_assert_eq!(data.subject, id.to_string());
		}
	}
}
