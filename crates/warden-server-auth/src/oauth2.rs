// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization-code plumbing shared by the provider adapters.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;
use warden_common_secret::SecretString;

use crate::provider::{ProviderError, ProviderToken};

/// Client credentials and endpoint overrides for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
	pub client_id: String,
	pub client_secret: SecretString,
	pub redirect_uri: String,
	/// Base URL of the provider (Cognito domain, Okta issuer, GitHub host).
	pub url: Option<String>,
	/// API host override (GitHub Enterprise).
	pub api_url: Option<String>,
	pub scopes: Vec<String>,
}

impl ProviderConfig {
	/// Reject configurations missing client credentials.
	pub fn validate(&self) -> Result<(), ProviderError> {
		if self.client_id.trim().is_empty() {
			return Err(ProviderError::InvalidConfig(
				"client_id cannot be empty".to_string(),
			));
		}
		if self.client_secret.expose().trim().is_empty() {
			return Err(ProviderError::InvalidConfig(
				"client_secret cannot be empty".to_string(),
			));
		}
		if self.redirect_uri.trim().is_empty() {
			return Err(ProviderError::InvalidConfig(
				"redirect_uri cannot be empty".to_string(),
			));
		}
		Ok(())
	}

	pub fn scopes_string(&self) -> String {
		self.scopes.join(" ")
	}
}

/// How the client authenticates to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
	/// `client_id` and `client_secret` in the form body.
	Post,
	/// HTTP Basic `Authorization` header.
	Basic,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
	error: String,
	error_description: Option<String>,
}

/// Join `path` onto a base URL, keeping any path the base already has.
pub fn endpoint(base: &str, path: &str) -> Result<Url, ProviderError> {
	let joined = format!(
		"{}/{}",
		base.trim_end_matches('/'),
		path.trim_start_matches('/')
	);
	Url::parse(&joined)
		.map_err(|e| ProviderError::InvalidConfig(format!("invalid URL {joined}: {e}")))
}

/// Authorization URL carrying the standard code-flow parameters.
pub fn authorization_url(authorize: &Url, config: &ProviderConfig, state: &str) -> String {
	let mut url = authorize.clone();
	url
		.query_pairs_mut()
		.append_pair("client_id", &config.client_id)
		.append_pair("redirect_uri", &config.redirect_uri)
		.append_pair("response_type", "code")
		.append_pair("scope", &config.scopes_string())
		.append_pair("state", state);
	url.to_string()
}

/// Exchange an authorization code at `token_url`.
///
/// A JSON body of the form `{error, error_description}` is reported as
/// [`ProviderError::Provider`] regardless of status code.
#[tracing::instrument(skip(http_client, config, code), fields(token_url = %token_url))]
pub async fn exchange_code(
	http_client: &reqwest::Client,
	token_url: &Url,
	config: &ProviderConfig,
	auth: ClientAuth,
	code: &str,
) -> Result<ProviderToken, ProviderError> {
	tracing::debug!("exchanging authorization code for access token");

	let mut form = vec![
		("grant_type", "authorization_code"),
		("code", code),
		("redirect_uri", config.redirect_uri.as_str()),
	];
	let mut request = http_client
		.post(token_url.clone())
		.header(reqwest::header::ACCEPT, "application/json");

	match auth {
		ClientAuth::Post => {
			form.push(("client_id", config.client_id.as_str()));
			form.push(("client_secret", config.client_secret.expose().as_str()));
		}
		ClientAuth::Basic => {
			request = request.basic_auth(&config.client_id, Some(config.client_secret.expose()));
		}
	}

	let response = request.form(&form).send().await?;
	let status = response.status();
	let body = response.text().await?;

	if let Ok(error_response) = serde_json::from_str::<OAuthErrorResponse>(&body) {
		if !error_response.error.is_empty() {
			let message = error_response
				.error_description
				.unwrap_or(error_response.error);
			return Err(ProviderError::Provider(message));
		}
	}

	if !status.is_success() {
		return Err(ProviderError::Provider(format!(
			"token endpoint returned {status}"
		)));
	}

	serde_json::from_str(&body)
		.map_err(|e| ProviderError::Parse(format!("failed to parse token response: {e}")))
}

/// GET a JSON resource with a bearer token.
#[tracing::instrument(skip(http_client, access_token, headers), fields(url = %url))]
pub async fn get_json<T: DeserializeOwned>(
	http_client: &reqwest::Client,
	url: &Url,
	access_token: &SecretString,
	headers: &[(&'static str, &'static str)],
) -> Result<T, ProviderError> {
	let mut request = http_client.get(url.clone()).bearer_auth(access_token.expose());
	if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("accept")) {
		request = request.header(reqwest::header::ACCEPT, "application/json");
	}
	for (name, value) in headers {
		request = request.header(*name, *value);
	}

	let response = request.send().await?;
	if !response.status().is_success() {
		let status = response.status();
		let body = response.text().await.unwrap_or_default();
		return Err(ProviderError::Provider(format!(
			"{url} returned {status}: {body}"
		)));
	}

	response
		.json()
		.await
		.map_err(|e| ProviderError::Parse(format!("failed to parse response from {url}: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config() -> ProviderConfig {
		ProviderConfig {
			client_id: "client".to_string(),
			client_secret: SecretString::from("secret"),
			redirect_uri: "https://warden.example.com/callback".to_string(),
			url: None,
			api_url: None,
			scopes: vec!["openid".to_string(), "email".to_string()],
		}
	}

	#[test]
	fn validate_rejects_empty_fields() {
		assert!(config().validate().is_ok());

		let mut c = config();
		c.client_id = String::new();
		assert!(matches!(c.validate(), Err(ProviderError::InvalidConfig(_))));

		let mut c = config();
		c.client_secret = SecretString::from(" ");
		assert!(c.validate().is_err());

		let mut c = config();
		c.redirect_uri = String::new();
		assert!(c.validate().is_err());
	}

	#[test]
	fn endpoint_keeps_base_path() {
		let url = endpoint("https://example.okta.com/oauth2/default/", "/v1/token").unwrap();
		assert_eq!(url.as_str(), "https://example.okta.com/oauth2/default/v1/token");
		assert!(endpoint("not a url", "x").is_err());
	}

	#[test]
	fn authorization_url_has_code_flow_params() {
		let authorize = endpoint("https://auth.example.com", "oauth2/authorize").unwrap();
		let url = Url::parse(&authorization_url(&authorize, &config(), "st")).unwrap();
		let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

		assert!(pairs.contains(&("client_id".into(), "client".into())));
		assert!(pairs.contains(&("response_type".into(), "code".into())));
		assert!(pairs.contains(&("scope".into(), "openid email".into())));
		assert!(pairs.contains(&("state".into(), "st".into())));
		assert!(pairs.contains(&(
			"redirect_uri".into(),
			"https://warden.example.com/callback".into()
		)));
	}

	#[tokio::test]
	async fn exchange_code_posts_form() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/oauth2/token"))
			.and(body_string_contains("grant_type=authorization_code"))
			.and(body_string_contains("code=abc"))
			.and(body_string_contains("client_secret=secret"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"access_token": "cognito_token",
				"expires_in": 100000
			})))
			.expect(1)
			.mount(&server)
			.await;

		let token_url = endpoint(&server.uri(), "oauth2/token").unwrap();
		let token = exchange_code(
			&reqwest::Client::new(),
			&token_url,
			&config(),
			ClientAuth::Post,
			"abc",
		)
		.await
		.unwrap();
		assert_eq!(token.access_token.expose(), "cognito_token");
	}

	#[tokio::test]
	async fn exchange_code_uses_basic_auth() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/token"))
			.and(header_exists("authorization"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "t"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let token_url = endpoint(&server.uri(), "v1/token").unwrap();
		let token = exchange_code(
			&reqwest::Client::new(),
			&token_url,
			&config(),
			ClientAuth::Basic,
			"abc",
		)
		.await
		.unwrap();
		assert_eq!(token.access_token.expose(), "t");
	}

	#[tokio::test]
	async fn exchange_code_reports_provider_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
				"error": "invalid_grant",
				"error_description": "code expired"
			})))
			.mount(&server)
			.await;

		let token_url = endpoint(&server.uri(), "token").unwrap();
		let err = exchange_code(
			&reqwest::Client::new(),
			&token_url,
			&config(),
			ClientAuth::Post,
			"abc",
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ProviderError::Provider(m) if m == "code expired"));
	}

	#[tokio::test]
	async fn exchange_code_rejects_garbage() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("not json"))
			.mount(&server)
			.await;

		let token_url = endpoint(&server.uri(), "token").unwrap();
		let err = exchange_code(
			&reqwest::Client::new(),
			&token_url,
			&config(),
			ClientAuth::Post,
			"abc",
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ProviderError::Parse(_)));
	}

	#[tokio::test]
	async fn get_json_sends_bearer_and_checks_status() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/userinfo"))
			.and(header("authorization", "Bearer tok"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sub": "1"})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/denied"))
			.respond_with(ResponseTemplate::new(401))
			.mount(&server)
			.await;

		let client = reqwest::Client::new();
		let token = SecretString::from("tok");

		let ok: serde_json::Value =
			get_json(&client, &endpoint(&server.uri(), "userinfo").unwrap(), &token, &[])
				.await
				.unwrap();
		assert_eq!(ok["sub"], "1");

		let err = get_json::<serde_json::Value>(
			&client,
			&endpoint(&server.uri(), "denied").unwrap(),
			&token,
			&[],
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ProviderError::Provider(_)));
	}
}
