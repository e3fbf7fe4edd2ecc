// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden HTTP server.
//!
//! Exposes the external identity linking flow over HTTP: `/authorize` sends
//! the browser to a provider and `/callback` turns the provider's answer
//! into a local user.

pub mod api;
pub mod error;
pub mod routes;

pub use api::{create_app_state, create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use warden_server_config::ServerConfig;
