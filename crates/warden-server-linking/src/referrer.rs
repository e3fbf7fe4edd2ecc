// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where to send the browser once the flow finishes.

use url::Url;

/// Pick the post-login destination for a requested `redirect_to`.
///
/// Accepted, in order:
/// - a relative path (`/dashboard`, but not `//host`), resolved against `site_url`
/// - an absolute URL with the same origin as `site_url`
/// - an exact entry of `allow_list`
///
/// Anything else, or nothing, yields `site_url`.
pub fn resolve_referrer(
	redirect_to: Option<&str>,
	site_url: &str,
	allow_list: &[String],
) -> String {
	let Some(requested) = redirect_to.map(str::trim).filter(|r| !r.is_empty()) else {
		return site_url.to_string();
	};

	if is_relative_path(requested) {
		return match Url::parse(site_url) {
			Ok(site) => match site.join(requested) {
				Ok(url) if url.origin() == site.origin() => url.to_string(),
				_ => site_url.to_string(),
			},
			Err(_) => site_url.to_string(),
		};
	}

	if allow_list.iter().any(|allowed| allowed == requested) {
		return requested.to_string();
	}

	match (Url::parse(requested), Url::parse(site_url)) {
		(Ok(target), Ok(site)) if target.origin() == site.origin() => requested.to_string(),
		_ => {
			tracing::debug!(
				redirect_to = %requested,
				"redirect target not allowed, using site url"
			);
			site_url.to_string()
		}
	}
}

fn is_relative_path(url: &str) -> bool {
	url.starts_with('/')
		&& !url.starts_with("//")
		&& !url.chars().any(|c| c == '\\' || c.is_control())
}
