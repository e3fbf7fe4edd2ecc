// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local user accounts.
//!
//! A [`User`] is either active or pending. Pending users were created by an
//! invite: they carry an `invite_token`, have no confirmed email and no
//! password, and become active when an external identity links to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Number of random bytes in an invite token (produces 64 hex chars).
pub const INVITE_TOKEN_BYTES: usize = 32;

/// A local user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	/// Always stored lowercased.
	pub email: String,
	pub display_name: Option<String>,
	pub avatar_url: Option<String>,
	pub email_confirmed_at: Option<DateTime<Utc>>,
	/// Present while the account is an unclaimed invite.
	#[serde(skip_serializing)]
	pub invite_token: Option<String>,
	pub invited_at: Option<DateTime<Utc>>,
	pub last_sign_in_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	/// A fresh, unconfirmed account for `email`.
	pub fn new(email: &str) -> Self {
		let now = Utc::now();
		Self {
			id: UserId::generate(),
			email: normalize_email(email),
			display_name: None,
			avatar_url: None,
			email_confirmed_at: None,
			invite_token: None,
			invited_at: None,
			last_sign_in_at: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// A pending account that can be claimed with the generated invite token.
	pub fn invited(email: &str) -> Self {
		let mut user = Self::new(email);
		user.invite_token = Some(generate_invite_token());
		user.invited_at = Some(user.created_at);
		user
	}

	pub fn is_pending(&self) -> bool {
		self.invite_token.is_some() && self.email_confirmed_at.is_none()
	}

	/// Clear the invite and mark the email confirmed.
	pub fn confirm_invite(&mut self, now: DateTime<Utc>) {
		self.invite_token = None;
		if self.email_confirmed_at.is_none() {
			self.email_confirmed_at = Some(now);
		}
		self.updated_at = now;
	}

	/// Set the display name only if the user has none. Returns whether it changed.
	pub fn backfill_display_name(&mut self, name: Option<&str>) -> bool {
		let has_name = self
			.display_name
			.as_deref()
			.is_some_and(|n| !n.trim().is_empty());
		match name.map(str::trim).filter(|n| !n.is_empty()) {
			Some(name) if !has_name => {
				self.display_name = Some(name.to_string());
				true
			}
			_ => false,
		}
	}

	pub fn record_sign_in(&mut self, now: DateTime<Utc>) {
		self.last_sign_in_at = Some(now);
		self.updated_at = now;
	}
}

/// Canonical form used for storage and comparison.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// Generate a new random invite token.
pub fn generate_invite_token() -> String {
	use rand::Rng;
	let mut rng = rand::thread_rng();
	let bytes: [u8; INVITE_TOKEN_BYTES] = rng.gen();
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_user_email_is_normalized() {
		let user = User::new("  Cognito@Example.COM ");
		assert_eq!(user.email, "cognito@example.com");
		assert!(!user.is_pending());
	}

	#[test]
	fn invited_user_is_pending_until_confirmed() {
		let mut user = User::invited("invitee@example.com");
		assert!(user.is_pending());
		assert_eq!(user.invite_token.as_ref().unwrap().len(), INVITE_TOKEN_BYTES * 2);
		assert_eq!(user.invited_at, Some(user.created_at));

		user.confirm_invite(Utc::now());
		assert!(!user.is_pending());
		assert!(user.invite_token.is_none());
		assert!(user.email_confirmed_at.is_some());
	}

	#[test]
	fn backfill_only_fills_missing_name() {
		let mut user = User::new("a@example.com");
		assert!(user.backfill_display_name(Some("Cognito Test")));
		assert_eq!(user.display_name.as_deref(), Some("Cognito Test"));

		assert!(!user.backfill_display_name(Some("Someone Else")));
		assert_eq!(user.display_name.as_deref(), Some("Cognito Test"));
	}

	#[test]
	fn backfill_treats_blank_name_as_missing() {
		let mut user = User::new("a@example.com");
		user.display_name = Some("   ".to_string());
		assert!(user.backfill_display_name(Some("Cognito Test")));
		assert!(!user.backfill_display_name(None));
	}

	#[test]
	fn invite_token_is_not_serialized() {
		let user = User::invited("invitee@example.com");
		let json = serde_json::to_string(&user).unwrap();
		assert!(!json.contains(user.invite_token.as_deref().unwrap()));
	}

	#[test]
	fn invite_tokens_are_unique() {
		assert_ne!(generate_invite_token(), generate_invite_token());
	}
}
