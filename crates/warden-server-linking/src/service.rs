// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authorize and callback flows.
//!
//! A callback resolves to exactly one of:
//!
//! 1. **Existing identity**: `(provider, subject)` is already linked. The
//!    claims snapshot is refreshed and the owning user signed in. No email
//!    is needed.
//! 2. **Invite**: the state carries an invite token. The invited user's
//!    email must equal one of the provider's verified emails; the new
//!    identity confirms the account.
//! 3. **Known email**: a user with the provider's (verified) email exists
//!    and gets a new identity, even with signups disabled.
//! 4. **Signup**: a new user and identity, unless signups are disabled.
//!
//! All database work for one callback runs in a single transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use warden_server_auth::{
	Identity, OAuthProvider, ProviderError, StateClaims, StateCodec, StateError, User, UserData,
};
use warden_server_db::{LinkTransaction, UserStore};

use crate::error::LinkError;
use crate::notify::{dispatch_all, signup_messages, LogMailer, Mailer};
use crate::referrer::resolve_referrer;
use crate::registry::ProviderRegistry;
use crate::request::{
	success_redirect, AuthorizeRequest, CallbackRequest, LinkFailure, LinkOutcome, LinkPolicy,
	LinkSuccess,
};
use crate::session::{NoSession, SessionIssuer};

/// Result type for linking operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Service turning external provider logins into local accounts.
#[derive(Clone)]
pub struct LinkingService {
	store: Arc<dyn UserStore>,
	registry: Arc<ProviderRegistry>,
	codec: StateCodec,
	policy: Arc<LinkPolicy>,
	mailer: Arc<dyn Mailer>,
	sessions: Arc<dyn SessionIssuer>,
}

impl LinkingService {
	/// Create a service that logs signup mail and issues no session.
	pub fn new(
		store: Arc<dyn UserStore>,
		registry: Arc<ProviderRegistry>,
		codec: StateCodec,
		policy: LinkPolicy,
	) -> Self {
		Self {
			store,
			registry,
			codec,
			policy: Arc::new(policy),
			mailer: Arc::new(LogMailer),
			sessions: Arc::new(NoSession),
		}
	}

	pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
		self.mailer = mailer;
		self
	}

	pub fn with_session_issuer(mut self, sessions: Arc<dyn SessionIssuer>) -> Self {
		self.sessions = sessions;
		self
	}

	pub fn registry(&self) -> &ProviderRegistry {
		&self.registry
	}

	pub fn policy(&self) -> &LinkPolicy {
		&self.policy
	}

	/// Build the provider authorization URL for an authorize request.
	///
	/// An invite token is checked here so an unknown token fails before the
	/// browser leaves for the provider.
	#[tracing::instrument(skip(self, request), fields(provider = ?request.provider))]
	pub async fn authorize(&self, request: AuthorizeRequest) -> Result<String> {
		let name = request
			.provider
			.as_deref()
			.map(str::trim)
			.filter(|p| !p.is_empty())
			.ok_or(LinkError::MissingProvider)?
			.to_ascii_lowercase();
		let provider = self
			.registry
			.get(&name)
			.ok_or_else(|| LinkError::UnknownProvider(name.clone()))?;

		let invite_token = request.invite_token.filter(|t| !t.trim().is_empty());
		if let Some(token) = &invite_token {
			if self.store.get_user_by_invite_token(token).await?.is_none() {
				tracing::warn!(provider = %name, "authorize with unknown invite token");
				return Err(LinkError::InviteNotFound);
			}
		}

		let referrer = resolve_referrer(
			request.redirect_to.as_deref(),
			&self.policy.site_url,
			&self.policy.uri_allow_list,
		);
		let claims = self
			.codec
			.claims(provider.name(), &self.policy.site_url, invite_token, Some(referrer));
		let state = self
			.codec
			.encode(&claims)
			.map_err(|e| LinkError::Internal(e.to_string()))?;

		tracing::debug!(provider = %name, "redirecting to provider");
		Ok(provider.authorization_url(&state))
	}

	/// Complete an OAuth callback.
	///
	/// On failure the returned [`LinkFailure`] carries the referrer that a
	/// redirectable error should be sent back to.
	#[tracing::instrument(skip(self, request))]
	pub async fn callback(
		&self,
		request: CallbackRequest,
	) -> std::result::Result<LinkSuccess, LinkFailure> {
		let claims = match self.decode_state(request.state.as_deref()) {
			Ok(claims) => claims,
			Err(error) => {
				tracing::warn!(error = %error, "rejected OAuth callback state");
				return Err(LinkFailure {
					error,
					referrer: self.policy.site_url.clone(),
				});
			}
		};
		let referrer = claims
			.referrer
			.clone()
			.unwrap_or_else(|| claims.site_url.clone());

		match self.link(&claims, request).await {
			Ok((user, outcome)) => {
				let fragment = match self.sessions.issue(&user, &claims.provider).await {
					Ok(params) => params.map(|p| p.to_fragment()),
					Err(e) => {
						tracing::error!(error = %e, user_id = %user.id, "session issuance failed");
						return Err(LinkFailure {
							error: LinkError::Internal(e.to_string()),
							referrer,
						});
					}
				};
				tracing::info!(
					user_id = %user.id,
					provider = %claims.provider,
					outcome = %outcome,
					"external identity linked"
				);
				Ok(LinkSuccess {
					redirect_url: success_redirect(&referrer, fragment),
					provider: claims.provider,
					user,
					outcome,
				})
			}
			Err(error) => {
				if error.is_redirect() {
					tracing::warn!(
						error = %error,
						provider = %claims.provider,
						"external login refused"
					);
				} else {
					tracing::error!(
						error = %error,
						provider = %claims.provider,
						"external login failed"
					);
				}
				Err(LinkFailure { error, referrer })
			}
		}
	}

	fn decode_state(&self, state: Option<&str>) -> Result<StateClaims> {
		let token = state.filter(|s| !s.is_empty()).ok_or_else(|| {
			LinkError::InvalidState(StateError::Invalid("missing state".to_string()))
		})?;
		self.codec.decode(token).map_err(LinkError::InvalidState)
	}

	async fn link(
		&self,
		claims: &StateClaims,
		request: CallbackRequest,
	) -> Result<(User, LinkOutcome)> {
		if let Some(code) = request.error.filter(|e| !e.is_empty()) {
			return Err(LinkError::ProviderDenied {
				code,
				description: request.error_description.unwrap_or_default(),
			});
		}
		let code = request
			.code
			.filter(|c| !c.is_empty())
			.ok_or(LinkError::MissingCode)?;

		let provider = self
			.registry
			.get(&claims.provider)
			.ok_or_else(|| LinkError::UnknownProvider(claims.provider.clone()))?;

		let token = provider
			.get_oauth_token(&code)
			.await
			.map_err(LinkError::TokenExchangeFailed)?;

		let user_data = match provider.get_user_data(&token).await {
			Ok(data) => data,
			Err(ProviderError::MissingEmail { user_data }) => *user_data,
			Err(e) => return Err(LinkError::UserInfoFetchFailed(e)),
		};

		let now = Utc::now();
		let provider_name = provider.name();
		let mut tx = self.store.begin().await?;

		let (user, outcome) = match tx.find_identity(provider_name, &user_data.subject).await? {
			Some(identity) => {
				let user = refresh_identity(&mut tx, identity, &user_data, now).await?;
				(user, LinkOutcome::Existing)
			}
			None => match claims.invite_token.as_deref() {
				Some(invite_token) => {
					let user =
						accept_invite(&mut tx, invite_token, provider_name, &user_data, now).await?;
					(user, LinkOutcome::InviteAccepted)
				}
				None => self.link_or_sign_up(&mut tx, provider_name, &user_data, now).await?,
			},
		};

		tx.commit().await?;

		if outcome == LinkOutcome::SignedUp {
			self.notify_signup(&user, provider_name).await;
		}
		Ok((user, outcome))
	}

	async fn link_or_sign_up(
		&self,
		tx: &mut LinkTransaction,
		provider: &str,
		user_data: &UserData,
		now: DateTime<Utc>,
	) -> Result<(User, LinkOutcome)> {
		let email = user_data.primary_email().ok_or(LinkError::MissingEmail)?;
		let verified = user_data.has_verified_email(email);

		if let Some(mut user) = tx.find_user_by_email(email).await? {
			if !verified {
				return Err(LinkError::EmailUnverified);
			}
			// Open question: this links without checking for a password or
			// other identities, including when signups are disabled.
			tracing::warn!(
				user_id = %user.id,
				provider = %provider,
				"linking new external identity to existing user by verified email"
			);
			tx.create_identity(&Identity::new(user.id, provider, user_data)).await?;
			user.backfill_display_name(user_data.display_name().as_deref());
			if user.avatar_url.is_none() {
				user.avatar_url = user_data.avatar_url.clone();
			}
			if user.email_confirmed_at.is_none() {
				user.confirm_invite(now);
			}
			user.record_sign_in(now);
			tx.update_user(&user).await?;
			return Ok((user, LinkOutcome::LinkedByEmail));
		}

		if self.policy.signups_disabled {
			tracing::warn!(provider = %provider, "signup rejected: signups are disabled");
			return Err(LinkError::SignupsDisabled);
		}

		let mut user = User::new(email);
		user.display_name = user_data.display_name();
		user.avatar_url = user_data.avatar_url.clone();
		if verified {
			user.email_confirmed_at = Some(now);
		}
		user.record_sign_in(now);
		tx.create_user(&user).await?;
		tx.create_identity(&Identity::new(user.id, provider, user_data)).await?;

		tracing::info!(user_id = %user.id, provider = %provider, "created new user");
		Ok((user, LinkOutcome::SignedUp))
	}

	/// Best effort: failures are logged and never fail the login.
	async fn notify_signup(&self, user: &User, provider: &str) {
		let messages = signup_messages(user, provider, &self.policy.signup_notify_recipients);
		if let Err(e) = dispatch_all(self.mailer.as_ref(), &messages).await {
			tracing::warn!(error = %e, user_id = %user.id, "signup notification failed");
		}
	}
}

async fn refresh_identity(
	tx: &mut LinkTransaction,
	mut identity: Identity,
	user_data: &UserData,
	now: DateTime<Utc>,
) -> Result<User> {
	let mut user = tx.find_user_by_id(&identity.user_id).await?.ok_or_else(|| {
		LinkError::Internal(format!("identity owner {} is missing", identity.user_id))
	})?;

	identity.refresh(user_data, now);
	tx.update_identity_data(&identity).await?;

	user.record_sign_in(now);
	tx.update_user(&user).await?;
	Ok(user)
}

async fn accept_invite(
	tx: &mut LinkTransaction,
	invite_token: &str,
	provider: &str,
	user_data: &UserData,
	now: DateTime<Utc>,
) -> Result<User> {
	let mut user = tx
		.find_user_by_invite_token(invite_token)
		.await?
		.ok_or(LinkError::InviteNotFound)?;

	if user_data.primary_email().is_none() {
		return Err(LinkError::MissingEmail);
	}
	if !user_data.has_verified_email(&user.email) {
		tracing::warn!(
			user_id = %user.id,
			provider = %provider,
			"invited email does not match provider"
		);
		return Err(LinkError::InvitedEmailMismatch);
	}

	tx.create_identity(&Identity::new(user.id, provider, user_data)).await?;

	user.backfill_display_name(user_data.display_name().as_deref());
	user.confirm_invite(now);
	user.record_sign_in(now);
	tx.update_user(&user).await?;

	tracing::info!(user_id = %user.id, provider = %provider, "invite accepted");
	Ok(user)
}
