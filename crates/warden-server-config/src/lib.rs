// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Warden server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`WARDEN_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	load_secret_env, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource,
};

use tracing::{debug, info};
use url::Url;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	pub oauth: OAuthConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WARDEN_SERVER_*`)
/// 2. Config file (`/etc/warden/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let auth = layer.auth.unwrap_or_default().finalize(&http.base_url);
	let oauth = layer.oauth.unwrap_or_default().build()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&auth)?;

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		site_url = %auth.site_url,
		signups_disabled = auth.signups_disabled,
		providers = ?oauth.enabled(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		auth,
		oauth,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(auth: &AuthConfig) -> Result<(), ConfigError> {
	if auth.jwt_secret.expose().trim().is_empty() {
		return Err(ConfigError::Validation(
			"WARDEN_SERVER_JWT_SECRET must be set; it signs the OAuth state parameter".to_string(),
		));
	}

	require_http_url("site_url", &auth.site_url)?;
	for entry in &auth.uri_allow_list {
		require_http_url("uri_allow_list", entry)?;
	}

	if auth.state_ttl_secs == 0 {
		return Err(ConfigError::InvalidValue {
			key: "state_ttl_secs".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}
	if auth.external_timeout_secs == 0 {
		return Err(ConfigError::InvalidValue {
			key: "external_timeout_secs".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}

	Ok(())
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
	let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("'{value}' is not a valid URL: {e}"),
	})?;
	if url.scheme() != "http" && url.scheme() != "https" {
		return Err(ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("'{value}' must use http or https"),
		});
	}
	Ok(())
}
