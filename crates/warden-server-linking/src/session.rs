// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hook for whatever issues a session once an identity is linked.

use async_trait::async_trait;
use warden_server_auth::User;

#[derive(Debug, thiserror::Error)]
#[error("session issuance failed: {0}")]
pub struct SessionError(pub String);

/// Key/value pairs delivered to the client in the redirect fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams(pub Vec<(String, String)>);

impl SessionParams {
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Form-encoded, for use as a URL fragment.
	pub fn to_fragment(&self) -> String {
		let mut serializer = url::form_urlencoded::Serializer::new(String::new());
		for (k, v) in &self.0 {
			serializer.append_pair(k, v);
		}
		serializer.finish()
	}
}

#[async_trait]
pub trait SessionIssuer: Send + Sync {
	/// Parameters for the signed-in `user`, or `None` to redirect bare.
	async fn issue(
		&self,
		user: &User,
		provider: &str,
	) -> Result<Option<SessionParams>, SessionError>;
}

/// Issues nothing; the redirect carries no fragment.
#[derive(Debug, Clone, Default)]
pub struct NoSession;

#[async_trait]
impl SessionIssuer for NoSession {
	async fn issue(
		&self,
		_user: &User,
		_provider: &str,
	) -> Result<Option<SessionParams>, SessionError> {
		Ok(None)
	}
}
