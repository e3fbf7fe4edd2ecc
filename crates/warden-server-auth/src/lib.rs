// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core authentication types for Warden.
//!
//! This crate provides:
//! - The local account model: [`User`], [`Identity`] and the opaque
//!   [`IdentityData`] snapshot of provider claims
//! - The contract every external identity provider implements
//!   ([`OAuthProvider`]) and the normalized [`UserData`] it produces
//! - Shared OAuth 2.0 request helpers used by the provider crates
//! - The signed, short-lived state token that carries authorize-request
//!   context across the browser round trip ([`StateCodec`])
//!
//! # Security Considerations
//!
//! - Client secrets and access tokens use [`warden_common_secret::SecretString`]
//! - Identities are matched by `(provider, subject)`, never by email alone
//! - State tokens are rejected outright on a bad signature or expiry

pub mod identity;
pub mod oauth2;
pub mod provider;
pub mod state;
pub mod types;
pub mod user;

pub use identity::{Identity, IdentityData};
pub use oauth2::{ClientAuth, ProviderConfig};
pub use provider::{EmailRecord, OAuthProvider, ProviderError, ProviderToken, UserData};
pub use state::{StateClaims, StateCodec, StateError, DEFAULT_STATE_TTL_SECS};
pub use types::UserId;
pub use user::{generate_invite_token, normalize_email, User, INVITE_TOKEN_BYTES};
