// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client for calls out to identity providers.
//!
//! Every provider adapter builds its client here so that all outbound
//! requests carry the same User-Agent and are bounded by a timeout. Nothing
//! here retries; an authorization code is single-use.

mod client;

pub use client::{builder, new_client_with_timeout, user_agent, DEFAULT_TIMEOUT};
