// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::{create_pool, run_migrations};

/// A migrated pool backed by a file in a fresh temp dir.
///
/// File-backed so every pooled connection sees the same database; keep the
/// returned `TempDir` alive for the duration of the test.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite:{}", dir.path().join("warden-test.db").display());
	let pool = create_pool(&url).await.unwrap();
	run_migrations(&pool).await.unwrap();
	(pool, dir)
}
