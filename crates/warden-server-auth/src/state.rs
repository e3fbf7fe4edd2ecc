// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signed OAuth `state` parameter.
//!
//! The state token is an HS256 JWT carrying everything the callback needs to
//! know about the authorize request that started the flow. Nothing in it is
//! trusted until the signature and expiry check out; there is no leeway.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use warden_common_secret::SecretString;

/// Default lifetime of a state token.
pub const DEFAULT_STATE_TTL_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
	#[error("state token expired")]
	Expired,

	#[error("state token invalid: {0}")]
	Invalid(String),

	#[error("failed to encode state token: {0}")]
	Encode(String),

	#[error("state signing secret must not be empty")]
	EmptySecret,
}

/// Authorize-request context carried through the provider round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateClaims {
	pub provider: String,
	pub site_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub invite_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub referrer: Option<String>,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
}

/// Encodes and verifies state tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct StateCodec {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	ttl_secs: u64,
}

impl fmt::Debug for StateCodec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateCodec")
			.field("ttl_secs", &self.ttl_secs)
			.finish_non_exhaustive()
	}
}

impl StateCodec {
	pub fn new(secret: &SecretString, ttl_secs: u64) -> Result<Self, StateError> {
		if secret.expose().is_empty() {
			return Err(StateError::EmptySecret);
		}
		let bytes = secret.expose().as_bytes();
		Ok(Self {
			encoding_key: EncodingKey::from_secret(bytes),
			decoding_key: DecodingKey::from_secret(bytes),
			ttl_secs,
		})
	}

	pub fn ttl_secs(&self) -> u64 {
		self.ttl_secs
	}

	/// Claims for a new authorize request, expiring `ttl` from now.
	pub fn claims(
		&self,
		provider: &str,
		site_url: &str,
		invite_token: Option<String>,
		referrer: Option<String>,
	) -> StateClaims {
		let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
		StateClaims {
			provider: provider.to_string(),
			site_url: site_url.to_string(),
			invite_token,
			referrer,
			exp: Utc::now().timestamp().saturating_add(ttl),
		}
	}

	#[instrument(skip(self, claims), fields(provider = %claims.provider))]
	pub fn encode(&self, claims: &StateClaims) -> Result<String, StateError> {
		encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
			.map_err(|e| StateError::Encode(e.to_string()))
	}

	#[instrument(skip_all)]
	pub fn decode(&self, token: &str) -> Result<StateClaims, StateError> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		validation.validate_exp = true;
		validation.set_required_spec_claims(&["exp"]);

		decode::<StateClaims>(token, &self.decoding_key, &validation)
			.map(|data| data.claims)
			.map_err(|e| match e.kind() {
				ErrorKind::ExpiredSignature => StateError::Expired,
				_ => StateError::Invalid(e.to_string()),
			})
	}
}
