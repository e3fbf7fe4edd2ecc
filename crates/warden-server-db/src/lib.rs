// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # warden-server-db
//!
//! Persistence for Warden's users and linked identities, on SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! - **[`UserStore`]**: the interface
//! - **[`UserRepository`]**: the implementation, holding a `SqlitePool`
//! - **[`LinkTransaction`]**: one transaction per OAuth callback; the user
//!   row and its identity commit together or not at all
//!
//! ## Error Handling
//!
//! | Variant | When |
//! |---------|------|
//! | `NotFound` | An update targeted a row that does not exist |
//! | `Conflict` | Unique constraint violation (email, invite token, identity key) |
//! | `Sqlx` | Anything else sqlx reports |
//! | `Internal` | Unparseable stored data |
//!
//! Lookups where absence is normal return `Result<Option<T>>`.
//!
//! ## Storage Conventions
//!
//! - IDs are UUID strings, timestamps RFC 3339 text
//! - Emails are stored lowercased and looked up lowercased
//! - `identity_data` is a JSON object in a TEXT column

mod error;
pub mod migrations;
pub mod pool;
pub mod user;

#[cfg(test)]
pub mod testing;

pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::{create_pool, ping};
pub use user::{LinkTransaction, UserRepository, UserStore};
