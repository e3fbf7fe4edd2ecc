// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External identity linking for the Warden server.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`registry`] | Configured provider adapters, looked up by name |
//! | [`referrer`] | Post-login redirect target validation |
//! | [`service`] | The authorize and callback flows |
//! | [`error`] | Failure kinds and how each reaches the browser |
//! | [`notify`] | Signup notification mail |
//! | [`session`] | Hook for issuing a session after login |
//!
//! # Example
//!
//! ```ignore
//! let service = LinkingService::new(store, registry, codec, LinkPolicy::from(&config.auth));
//! let url = service.authorize(AuthorizeRequest {
//!     provider: Some("cognito".into()),
//!     ..Default::default()
//! }).await?;
//! ```

pub mod error;
pub mod notify;
pub mod referrer;
pub mod registry;
pub mod request;
pub mod service;
pub mod session;

pub use error::{redirect_with_error, ErrorDisposition, LinkError};
pub use notify::{dispatch_all, signup_messages, LogMailer, MailError, MailMessage, Mailer};
pub use referrer::resolve_referrer;
pub use registry::{ExternalProvider, ProviderRegistry};
pub use request::{
	AuthorizeRequest, CallbackRequest, LinkFailure, LinkOutcome, LinkPolicy, LinkSuccess,
};
pub use service::LinkingService;
pub use session::{NoSession, SessionError, SessionIssuer, SessionParams};
