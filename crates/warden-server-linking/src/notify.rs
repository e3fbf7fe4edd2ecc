// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signup notifications.
//!
//! Delivery itself belongs to a [`Mailer`]; this module only decides who
//! hears about a new account and fans the sends out concurrently with
//! [`dispatch_all`].

use async_trait::async_trait;
use futures::future::join_all;
use warden_server_auth::User;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
	#[error("send failed to {to}: {message}")]
	Send { to: String, message: String },

	#[error("invalid recipient: {0}")]
	Address(String),
}

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
	pub to: String,
	pub subject: String,
	pub body: String,
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
	async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mailer that records each message in the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
	#[tracing::instrument(
		name = "log_mailer_send",
		skip(self, message),
		fields(to = %message.to, subject = %message.subject)
	)]
	async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
		if !message.to.contains('@') {
			return Err(MailError::Address(message.to.clone()));
		}
		tracing::info!("mail delivery not configured, message logged only");
		Ok(())
	}
}

/// Send every message concurrently and wait for all of them.
///
/// Returns the first error in message order; a failure does not cancel the
/// other sends.
pub async fn dispatch_all(mailer: &dyn Mailer, messages: &[MailMessage]) -> Result<(), MailError> {
	let results = join_all(messages.iter().map(|m| mailer.send(m))).await;
	results.into_iter().collect()
}

/// The welcome message for `user` plus one notice per operator recipient.
pub fn signup_messages(user: &User, provider: &str, recipients: &[String]) -> Vec<MailMessage> {
	let name = user.display_name.as_deref().unwrap_or(&user.email);
	let mut messages = vec![MailMessage {
		to: user.email.clone(),
		subject: "Welcome".to_string(),
		body: format!("Hi {name},\n\nYour account was created by signing in with {provider}.\n"),
	}];

	messages.extend(recipients.iter().map(|to| MailMessage {
		to: to.clone(),
		subject: format!("New signup: {}", user.email),
		body: format!("{} ({}) signed up via {provider}.\n", user.email, user.id),
	}));
	messages
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingMailer {
		sent: AtomicUsize,
		fail_for: Option<&'static str>,
	}

	#[async_trait]
	impl Mailer for CountingMailer {
		async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
			self.sent.fetch_add(1, Ordering::SeqCst);
			match self.fail_for {
				Some(addr) if message.to == addr => Err(MailError::Send {
					to: message.to.clone(),
					message: "mailbox full".to_string(),
				}),
				_ => Ok(()),
			}
		}
	}

	fn message(to: &str) -> MailMessage {
		MailMessage {
			to: to.to_string(),
			subject: "s".to_string(),
			body: "b".to_string(),
		}
	}

	#[tokio::test]
	async fn dispatch_sends_everything() {
		let mailer = CountingMailer {
			sent: AtomicUsize::new(0),
			fail_for: None,
		};
		let messages = [message("a@example.com"), message("b@example.com")];
		dispatch_all(&mailer, &messages).await.unwrap();
		assert_eq!(mailer.sent.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn dispatch_reports_first_error_after_all_sends() {
		let mailer = CountingMailer {
			sent: AtomicUsize::new(0),
			fail_for: Some("b@example.com"),
		};
		let messages = [
			message("a@example.com"),
			message("b@example.com"),
			message("c@example.com"),
		];
		let err = dispatch_all(&mailer, &messages).await.unwrap_err();
		assert!(matches!(err, MailError::Send { ref to, .. } if to == "b@example.com"));
		assert_eq!(mailer.sent.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn dispatch_of_nothing_is_ok() {
		dispatch_all(&LogMailer, &[]).await.unwrap();
	}

	#[tokio::test]
	async fn log_mailer_rejects_bad_address() {
		assert!(LogMailer.send(&message("not-an-address")).await.is_err());
		assert!(LogMailer.send(&message("ok@example.com")).await.is_ok());
	}

	#[test]
	fn signup_messages_cover_user_and_recipients() {
		let mut user = User::new("cognito@example.com");
		user.display_name = Some("Cognito Test".to_string());
		let messages = signup_messages(&user, "cognito", &["ops@example.com".to_string()]);

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0].to, "cognito@example.com");
		assert!(messages[0].body.contains("Cognito Test"));
		assert_eq!(messages[1].to, "ops@example.com");
		assert!(messages[1].subject.contains("cognito@example.com"));
	}
}
