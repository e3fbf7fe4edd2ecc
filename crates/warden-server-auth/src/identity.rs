// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External identities linked to local users.
//!
//! An [`Identity`] is keyed by `(provider, provider_id)` and belongs to
//! exactly one user. Its [`IdentityData`] is a snapshot of the provider's
//! normalized claims, refreshed on every sign-in with merge semantics:
//!
//! - a key whose new value is `null` is removed
//! - a key with a non-null value replaces the stored one
//! - keys the update does not mention are kept

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::UserData;
use crate::types::UserId;

/// Opaque claims snapshot stored with an identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityData(Map<String, Value>);

impl IdentityData {
	/// Build from a claims map, dropping `null` entries.
	pub fn from_map(map: Map<String, Value>) -> Self {
		let mut data = Self::default();
		data.merge(map);
		data
	}

	/// Apply `updates` on top of the stored snapshot.
	pub fn merge(&mut self, updates: Map<String, Value>) {
		for (key, value) in updates {
			if value.is_null() {
				self.0.remove(&key);
			} else {
				self.0.insert(key, value);
			}
		}
		self.normalize_email();
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn email(&self) -> Option<&str> {
		self.0.get("email").and_then(Value::as_str)
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.0
	}

	fn normalize_email(&mut self) {
		if let Some(Value::String(email)) = self.0.get_mut("email") {
			*email = email.to_lowercase();
		}
	}
}

/// A provider account linked to a local user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	pub provider: String,
	/// The provider's subject identifier.
	pub provider_id: String,
	pub user_id: UserId,
	pub identity_data: IdentityData,
	pub last_sign_in_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Identity {
	/// A new identity for `user_id`, signed in now.
	pub fn new(user_id: UserId, provider: &str, user_data: &UserData) -> Self {
		let now = Utc::now();
		Self {
			provider: provider.to_string(),
			provider_id: user_data.subject.clone(),
			user_id,
			identity_data: IdentityData::from_map(user_data.identity_claims()),
			last_sign_in_at: Some(now),
			created_at: now,
			updated_at: now,
		}
	}

	/// Merge fresh claims and stamp the sign-in.
	pub fn refresh(&mut self, user_data: &UserData, now: DateTime<Utc>) {
		self.identity_data.merge(user_data.identity_claims());
		self.last_sign_in_at = Some(now);
		self.updated_at = now;
	}
}
