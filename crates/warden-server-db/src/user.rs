// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User and identity persistence.
//!
//! [`UserRepository`] serves pool-level reads and writes (invite creation,
//! the `/authorize` invite check). An OAuth callback does all of its work
//! inside one [`LinkTransaction`] so the user row and its identity commit
//! together or not at all. Dropping the transaction without calling
//! [`LinkTransaction::commit`] rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Row, Transaction};
use warden_server_auth::{normalize_email, Identity, IdentityData, User, UserId};

use crate::error::DbError;

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn get_user_by_invite_token(&self, token: &str) -> Result<Option<User>, DbError>;
	async fn get_identity_by_provider(
		&self,
		provider: &str,
		provider_id: &str,
	) -> Result<Option<Identity>, DbError>;
	async fn get_identities_for_user(&self, user_id: &UserId) -> Result<Vec<Identity>, DbError>;
	async fn begin(&self) -> Result<LinkTransaction, DbError>;
}

/// Repository for user database operations.
///
/// All user IDs are UUIDs stored as strings, timestamps as RFC 3339 text.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new user.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email or invite token is taken.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn create_user(&self, user: &User) -> Result<(), DbError> {
		let mut conn = self.pool.acquire().await?;
		insert_user(&mut conn, user).await
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let mut conn = self.pool.acquire().await?;
		select_user_by_id(&mut conn, id).await
	}

	/// Get a user by email, compared case-insensitively.
	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let mut conn = self.pool.acquire().await?;
		select_user_by_email(&mut conn, email).await
	}

	/// Get the pending user holding `token`.
	#[tracing::instrument(skip(self, token))]
	pub async fn get_user_by_invite_token(&self, token: &str) -> Result<Option<User>, DbError> {
		let mut conn = self.pool.acquire().await?;
		select_user_by_invite_token(&mut conn, token).await
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_identity_by_provider(
		&self,
		provider: &str,
		provider_id: &str,
	) -> Result<Option<Identity>, DbError> {
		let mut conn = self.pool.acquire().await?;
		select_identity(&mut conn, provider, provider_id).await
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_identities_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Vec<Identity>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT provider, provider_id, user_id, identity_data,
				   last_sign_in_at, created_at, updated_at
			FROM identities
			WHERE user_id = ?
			ORDER BY created_at
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_identity).collect()
	}

	/// Start the transaction for one OAuth callback.
	///
	/// Opened `IMMEDIATE` so the write lock is taken before the first read. A
	/// second callback then waits on the busy timeout instead of failing its
	/// first write with a stale WAL snapshot.
	#[tracing::instrument(skip(self))]
	pub async fn begin(&self) -> Result<LinkTransaction, DbError> {
		let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
		Ok(LinkTransaction { tx })
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, user: &User) -> Result<(), DbError> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn get_user_by_invite_token(&self, token: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_invite_token(token).await
	}

	async fn get_identity_by_provider(
		&self,
		provider: &str,
		provider_id: &str,
	) -> Result<Option<Identity>, DbError> {
		self.get_identity_by_provider(provider, provider_id).await
	}

	async fn get_identities_for_user(&self, user_id: &UserId) -> Result<Vec<Identity>, DbError> {
		self.get_identities_for_user(user_id).await
	}

	async fn begin(&self) -> Result<LinkTransaction, DbError> {
		self.begin().await
	}
}

/// The unit of work for one OAuth callback.
pub struct LinkTransaction {
	tx: Transaction<'static, Sqlite>,
}

impl LinkTransaction {
	#[tracing::instrument(skip(self))]
	pub async fn find_identity(
		&mut self,
		provider: &str,
		provider_id: &str,
	) -> Result<Option<Identity>, DbError> {
		select_identity(&mut self.tx, provider, provider_id).await
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn find_user_by_id(&mut self, id: &UserId) -> Result<Option<User>, DbError> {
		select_user_by_id(&mut self.tx, id).await
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DbError> {
		select_user_by_email(&mut self.tx, email).await
	}

	#[tracing::instrument(skip(self, token))]
	pub async fn find_user_by_invite_token(
		&mut self,
		token: &str,
	) -> Result<Option<User>, DbError> {
		select_user_by_invite_token(&mut self.tx, token).await
	}

	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn create_user(&mut self, user: &User) -> Result<(), DbError> {
		insert_user(&mut self.tx, user).await
	}

	/// Insert a new identity.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if `(provider, provider_id)` is already linked.
	#[tracing::instrument(
		skip(self, identity),
		fields(provider = %identity.provider, user_id = %identity.user_id)
	)]
	pub async fn create_identity(&mut self, identity: &Identity) -> Result<(), DbError> {
		let data = serde_json::to_string(&identity.identity_data)?;
		sqlx::query(
			r#"
			INSERT INTO identities (
				provider, provider_id, user_id, identity_data,
				last_sign_in_at, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&identity.provider)
		.bind(&identity.provider_id)
		.bind(identity.user_id.to_string())
		.bind(data)
		.bind(identity.last_sign_in_at.map(|dt| dt.to_rfc3339()))
		.bind(identity.created_at.to_rfc3339())
		.bind(identity.updated_at.to_rfc3339())
		.execute(&mut *self.tx)
		.await
		.map_err(|e| DbError::from_insert(e, "identity"))?;

		tracing::debug!(
			provider = %identity.provider,
			user_id = %identity.user_id,
			"identity created"
		);
		Ok(())
	}

	/// Persist a refreshed claims snapshot and sign-in time.
	#[tracing::instrument(skip(self, identity), fields(provider = %identity.provider))]
	pub async fn update_identity_data(&mut self, identity: &Identity) -> Result<(), DbError> {
		let data = serde_json::to_string(&identity.identity_data)?;
		let result = sqlx::query(
			r#"
			UPDATE identities SET
				identity_data = ?,
				last_sign_in_at = ?,
				updated_at = ?
			WHERE provider = ? AND provider_id = ?
			"#,
		)
		.bind(data)
		.bind(identity.last_sign_in_at.map(|dt| dt.to_rfc3339()))
		.bind(identity.updated_at.to_rfc3339())
		.bind(&identity.provider)
		.bind(&identity.provider_id)
		.execute(&mut *self.tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!(
				"identity {}/{}",
				identity.provider, identity.provider_id
			)));
		}
		Ok(())
	}

	/// Write back every mutable user column.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn update_user(&mut self, user: &User) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE users SET
				email = ?,
				display_name = ?,
				avatar_url = ?,
				email_confirmed_at = ?,
				invite_token = ?,
				last_sign_in_at = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(normalize_email(&user.email))
		.bind(&user.display_name)
		.bind(&user.avatar_url)
		.bind(user.email_confirmed_at.map(|dt| dt.to_rfc3339()))
		.bind(&user.invite_token)
		.bind(user.last_sign_in_at.map(|dt| dt.to_rfc3339()))
		.bind(user.updated_at.to_rfc3339())
		.bind(user.id.to_string())
		.execute(&mut *self.tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {}", user.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn commit(self) -> Result<(), DbError> {
		self.tx.commit().await?;
		Ok(())
	}
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), DbError> {
	sqlx::query(
		r#"
		INSERT INTO users (
			id, email, display_name, avatar_url, email_confirmed_at,
			invite_token, invited_at, last_sign_in_at, created_at, updated_at
		) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(user.id.to_string())
	.bind(normalize_email(&user.email))
	.bind(&user.display_name)
	.bind(&user.avatar_url)
	.bind(user.email_confirmed_at.map(|dt| dt.to_rfc3339()))
	.bind(&user.invite_token)
	.bind(user.invited_at.map(|dt| dt.to_rfc3339()))
	.bind(user.last_sign_in_at.map(|dt| dt.to_rfc3339()))
	.bind(user.created_at.to_rfc3339())
	.bind(user.updated_at.to_rfc3339())
	.execute(&mut *conn)
	.await
	.map_err(|e| DbError::from_insert(e, "user"))?;

	tracing::debug!(user_id = %user.id, "user created");
	Ok(())
}

async fn select_user_by_id(
	conn: &mut SqliteConnection,
	id: &UserId,
) -> Result<Option<User>, DbError> {
	let row = sqlx::query(
		r#"
		SELECT id, email, display_name, avatar_url, email_confirmed_at,
			   invite_token, invited_at, last_sign_in_at, created_at, updated_at
		FROM users
		WHERE id = ?
		"#,
	)
	.bind(id.to_string())
	.fetch_optional(&mut *conn)
	.await?;

	row.as_ref().map(row_to_user).transpose()
}

async fn select_user_by_email(
	conn: &mut SqliteConnection,
	email: &str,
) -> Result<Option<User>, DbError> {
	let row = sqlx::query(
		r#"
		SELECT id, email, display_name, avatar_url, email_confirmed_at,
			   invite_token, invited_at, last_sign_in_at, created_at, updated_at
		FROM users
		WHERE email = ?
		"#,
	)
	.bind(normalize_email(email))
	.fetch_optional(&mut *conn)
	.await?;

	let result = row.as_ref().map(row_to_user).transpose()?;
	if let Some(ref user) = result {
		tracing::debug!(user_id = %user.id, "user found by email");
	}
	Ok(result)
}

async fn select_user_by_invite_token(
	conn: &mut SqliteConnection,
	token: &str,
) -> Result<Option<User>, DbError> {
	let row = sqlx::query(
		r#"
		SELECT id, email, display_name, avatar_url, email_confirmed_at,
			   invite_token, invited_at, last_sign_in_at, created_at, updated_at
		FROM users
		WHERE invite_token = ?
		"#,
	)
	.bind(token)
	.fetch_optional(&mut *conn)
	.await?;

	row.as_ref().map(row_to_user).transpose()
}

async fn select_identity(
	conn: &mut SqliteConnection,
	provider: &str,
	provider_id: &str,
) -> Result<Option<Identity>, DbError> {
	let row = sqlx::query(
		r#"
		SELECT provider, provider_id, user_id, identity_data,
			   last_sign_in_at, created_at, updated_at
		FROM identities
		WHERE provider = ? AND provider_id = ?
		"#,
	)
	.bind(provider)
	.bind(provider_id)
	.fetch_optional(&mut *conn)
	.await?;

	row.as_ref().map(row_to_identity).transpose()
}

fn row_to_user(row: &SqliteRow) -> Result<User, DbError> {
	let id: String = row.get("id");
	let id = id
		.parse::<UserId>()
		.map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;

	Ok(User {
		id,
		email: row.get("email"),
		display_name: row.get("display_name"),
		avatar_url: row.get("avatar_url"),
		email_confirmed_at: parse_optional_timestamp(
			"email_confirmed_at",
			row.get("email_confirmed_at"),
		)?,
		invite_token: row.get("invite_token"),
		invited_at: parse_optional_timestamp("invited_at", row.get("invited_at"))?,
		last_sign_in_at: parse_optional_timestamp("last_sign_in_at", row.get("last_sign_in_at"))?,
		created_at: parse_timestamp("created_at", row.get("created_at"))?,
		updated_at: parse_timestamp("updated_at", row.get("updated_at"))?,
	})
}

fn row_to_identity(row: &SqliteRow) -> Result<Identity, DbError> {
	let user_id: String = row.get("user_id");
	let user_id = user_id
		.parse::<UserId>()
		.map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;
	let data: String = row.get("identity_data");
	let identity_data: IdentityData = serde_json::from_str(&data)?;

	Ok(Identity {
		provider: row.get("provider"),
		provider_id: row.get("provider_id"),
		user_id,
		identity_data,
		last_sign_in_at: parse_optional_timestamp("last_sign_in_at", row.get("last_sign_in_at"))?,
		created_at: parse_timestamp("created_at", row.get("created_at"))?,
		updated_at: parse_timestamp("updated_at", row.get("updated_at"))?,
	})
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(&value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

fn parse_optional_timestamp(
	column: &str,
	value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
	value.map(|v| parse_timestamp(column, v)).transpose()
}
