// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the external login routes.
//!
//! Tests cover:
//! - Cognito signup, repeat login and invite acceptance
//! - Signups disabled, with and without an existing user
//! - Providers that return no email
//! - Protocol failures answered with JSON
//! - Health reporting

use axum::{
	body::Body,
	http::{header::LOCATION, Request, StatusCode},
	Router,
};
use tempfile::tempdir;
use tower::ServiceExt;
use url::Url;
use warden_common_secret::SecretString;
use warden_server::{create_app_state, create_router, AppState, ServerConfig};
use warden_server_auth::User;
use warden_server_config::OAuthProviderConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "https://app.example.com";
const COGNITO_USER: &str =
	r#"{"name":"Cognito Test","email":"cognito@example.com","sub":"cognitotestid"}"#;
const COGNITO_USER_NO_EMAIL: &str = r#"{"name":"Cognito Test","sub":"cognitotestid"}"#;

/// Creates a test app with an isolated database and a mocked Cognito pool.
async fn setup_test_app(
	signups_disabled: bool,
) -> (Router, AppState, MockServer, tempfile::TempDir) {
	let dir = tempdir().unwrap();
	let db_path = dir.path().join("test_linking.db");
	let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
	let pool = warden_server_db::create_pool(&db_url).await.unwrap();
	warden_server_db::run_migrations(&pool).await.unwrap();

	let server = MockServer::start().await;
	let mut config = ServerConfig::default();
	config.auth.site_url = SITE.to_string();
	config.auth.jwt_secret = SecretString::from("integration-secret");
	config.auth.signups_disabled = signups_disabled;
	config.oauth.cognito = Some(OAuthProviderConfig {
		client_id: "testclient".to_string(),
		client_secret: SecretString::from("testsecret"),
		redirect_uri: "https://warden.example.com/callback".to_string(),
		url: Some(server.uri()),
		api_url: None,
		scopes: vec![],
	});

	let state = create_app_state(pool, &config).await.unwrap();
	(create_router(state.clone()), state, server, dir)
}

async fn mount_cognito(server: &MockServer, user_json: &'static str) {
	Mock::given(method("POST"))
		.and(path("/oauth2/token"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(
			r#"{"access_token":"cognito_token","expires_in":100000}"#,
			"application/json",
		))
		.mount(server)
		.await;
	Mock::given(method("GET"))
		.and(path("/oauth2/userInfo"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(user_json, "application/json"))
		.mount(server)
		.await;
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
	app.clone()
		.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
		.await
		.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> Url {
	let value = response.headers().get(LOCATION).unwrap().to_str().unwrap();
	Url::parse(value).unwrap()
}

fn query_value(url: &Url, key: &str) -> Option<String> {
	url.query_pairs()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
}

/// Runs `/authorize` then `/callback` and returns the callback response.
async fn login(app: &Router, authorize_query: &str) -> axum::response::Response {
	let response = get(app, &format!("/authorize?{authorize_query}")).await;
	assert_eq!(response.status(), StatusCode::FOUND);
	let provider_url = location(&response);
	assert_eq!(provider_url.path(), "/oauth2/authorize");
	assert_eq!(query_value(&provider_url, "scope").as_deref(), Some("openid"));
	let state = query_value(&provider_url, "state").unwrap();

	let callback = Url::parse_with_params(
		"http://warden.local/callback",
		&[("code", "authcode"), ("state", state.as_str())],
	)
	.unwrap();
	let uri = format!("/callback?{}", callback.query().unwrap());
	get(app, &uri).await
}

// ============================================================================
// Signup and login
// ============================================================================

#[tokio::test]
async fn test_cognito_signup_then_login_reuses_user() {
	let (app, state, server, _dir) = setup_test_app(false).await;
	mount_cognito(&server, COGNITO_USER).await;

	let response = login(&app, "provider=cognito").await;
	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response).as_str(), "https://app.example.com/");

	let user = state
		.users
		.get_user_by_email("cognito@example.com")
		.await
		.unwrap()
		.unwrap();
	assert_eq!(user.display_name.as_deref(), Some("Cognito Test"));

	let response = login(&app, "provider=cognito").await;
	assert_eq!(response.status(), StatusCode::FOUND);
	let identities = state.users.get_identities_for_user(&user.id).await.unwrap();
	assert_eq!(identities.len(), 1);
	assert_eq!(identities[0].provider, "cognito");
	assert_eq!(identities[0].provider_id, "cognitotestid");
}

#[tokio::test]
async fn test_login_returns_to_relative_redirect() {
	let (app, _state, server, _dir) = setup_test_app(false).await;
	mount_cognito(&server, COGNITO_USER).await;

	let response = login(&app, "provider=cognito&redirect_to=%2Fdashboard").await;
	assert_eq!(
		location(&response).as_str(),
		"https://app.example.com/dashboard"
	);
}

#[tokio::test]
async fn test_foreign_redirect_falls_back_to_site_url() {
	let (app, _state, server, _dir) = setup_test_app(false).await;
	mount_cognito(&server, COGNITO_USER).await;

	let response = login(
		&app,
		"provider=cognito&redirect_to=https%3A%2F%2Fevil.example.net%2F",
	)
	.await;
	assert_eq!(location(&response).host_str(), Some("app.example.com"));
}

// ============================================================================
// Signups disabled
// ============================================================================

#[tokio::test]
async fn test_signups_disabled_without_user_redirects_access_denied() {
	let (app, state, server, _dir) = setup_test_app(true).await;
	mount_cognito(&server, COGNITO_USER).await;

	let response = login(&app, "provider=cognito").await;
	assert_eq!(response.status(), StatusCode::FOUND);
	let target = location(&response);
	assert_eq!(query_value(&target, "error").as_deref(), Some("access_denied"));
	assert_eq!(
		query_value(&target, "error_description").as_deref(),
		Some("Signups not allowed for this instance")
	);
	assert!(state
		.users
		.get_user_by_email("cognito@example.com")
		.await
		.unwrap()
		.is_none());
}

#[tokio::test]
async fn test_signups_disabled_with_existing_user_links_identity() {
	let (app, state, server, _dir) = setup_test_app(true).await;
	mount_cognito(&server, COGNITO_USER).await;
	let existing = User::new("cognito@example.com");
	state.users.create_user(&existing).await.unwrap();

	let response = login(&app, "provider=cognito").await;
	assert_eq!(response.status(), StatusCode::FOUND);
	assert!(query_value(&location(&response), "error").is_none());

	let identities = state.users.get_identities_for_user(&existing.id).await.unwrap();
	assert_eq!(identities.len(), 1);
}

#[tokio::test]
async fn test_signups_disabled_without_email_redirects_server_error() {
	let (app, _state, server, _dir) = setup_test_app(true).await;
	mount_cognito(&server, COGNITO_USER_NO_EMAIL).await;

	let response = login(&app, "provider=cognito").await;
	let target = location(&response);
	assert_eq!(query_value(&target, "error").as_deref(), Some("server_error"));
	assert_eq!(
		query_value(&target, "error_description").as_deref(),
		Some("Error getting user email from external provider")
	);
}

// ============================================================================
// Invites
// ============================================================================

#[tokio::test]
async fn test_invite_with_matching_email_is_accepted() {
	let (app, state, server, _dir) = setup_test_app(false).await;
	mount_cognito(&server, COGNITO_USER).await;
	let mut invited = User::invited("cognito@example.com");
	invited.invite_token = Some("invite_token".to_string());
	state.users.create_user(&invited).await.unwrap();

	let response = login(&app, "provider=cognito&invite_token=invite_token").await;
	assert_eq!(response.status(), StatusCode::FOUND);
	assert!(query_value(&location(&response), "error").is_none());

	let user = state.users.get_user_by_id(&invited.id).await.unwrap().unwrap();
	assert!(user.invite_token.is_none());
	assert!(user.email_confirmed_at.is_some());
	assert_eq!(user.display_name.as_deref(), Some("Cognito Test"));
}

#[tokio::test]
async fn test_invite_with_other_email_redirects_invalid_request() {
	let (app, state, server, _dir) = setup_test_app(false).await;
	mount_cognito(
		&server,
		r#"{"name":"Cognito Test","email":"someone.else@example.com","sub":"cognitotestid"}"#,
	)
	.await;
	let mut invited = User::invited("cognito@example.com");
	invited.invite_token = Some("invite_token".to_string());
	state.users.create_user(&invited).await.unwrap();

	let response = login(&app, "provider=cognito&invite_token=invite_token").await;
	let target = location(&response);
	assert_eq!(query_value(&target, "error").as_deref(), Some("invalid_request"));
	assert_eq!(
		query_value(&target, "error_description").as_deref(),
		Some("Invited email does not match emails from external provider")
	);
	assert!(state
		.users
		.get_identities_for_user(&invited.id)
		.await
		.unwrap()
		.is_empty());
}

#[tokio::test]
async fn test_authorize_with_unknown_invite_returns_404() {
	let (app, _state, _server, _dir) = setup_test_app(false).await;

	let response = get(&app, "/authorize?provider=cognito&invite_token=nope").await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	let body = json_body(response).await;
	assert_eq!(body["error"], "not_found");
}

// ============================================================================
// Protocol failures
// ============================================================================

#[tokio::test]
async fn test_authorize_requires_known_provider() {
	let (app, _state, _server, _dir) = setup_test_app(false).await;

	let response = get(&app, "/authorize").await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = json_body(response).await;
	assert_eq!(body["message"], "Missing provider parameter");

	let response = get(&app, "/authorize?provider=myspace").await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = json_body(response).await;
	assert_eq!(body["message"], "Unsupported provider: myspace");
}

#[tokio::test]
async fn test_callback_with_bad_state_returns_400() {
	let (app, _state, server, _dir) = setup_test_app(false).await;
	mount_cognito(&server, COGNITO_USER).await;

	let response = get(&app, "/callback?code=authcode&state=forged").await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = json_body(response).await;
	assert_eq!(body["error"], "bad_request");

	let response = get(&app, "/callback?code=authcode").await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_denial_redirects_with_provider_error() {
	let (app, _state, _server, _dir) = setup_test_app(false).await;

	let response = get(&app, "/authorize?provider=cognito").await;
	let state = query_value(&location(&response), "state").unwrap();
	let callback = Url::parse_with_params(
		"http://warden.local/callback",
		&[
			("state", state.as_str()),
			("error", "access_denied"),
			("error_description", "User declined"),
		],
	)
	.unwrap();

	let response = get(&app, &format!("/callback?{}", callback.query().unwrap())).await;
	assert_eq!(response.status(), StatusCode::FOUND);
	let target = location(&response);
	assert_eq!(target.host_str(), Some("app.example.com"));
	assert_eq!(query_value(&target, "error").as_deref(), Some("access_denied"));
	assert_eq!(
		query_value(&target, "error_description").as_deref(),
		Some("User declined")
	);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_database_and_providers() {
	let (app, _state, _server, _dir) = setup_test_app(false).await;

	let response = get(&app, "/health").await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = json_body(response).await;
	assert_eq!(body["status"], "healthy");
	assert_eq!(body["database"]["status"], "healthy");
	assert_eq!(body["providers"], serde_json::json!(["cognito"]));
}
