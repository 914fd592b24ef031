// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Sensitive-key classification and value masking.

/// Placeholder emitted for values that were never set.
const NOT_SET: &str = "(not set)";

/// Placeholder that hides a value entirely.
const FULL_MASK: &str = "****";

/// Lowercase substrings that mark a field name as sensitive.
///
/// Matching is case-insensitive and substring-based, so `TMDB_API_KEY`,
/// `Password`, and `oauth_token` all classify as sensitive.
pub const SENSITIVE_PATTERNS: &[&str] = &[
	"_key",
	"secret",
	"password",
	"token",
	"credential",
	"api_key",
	"apikey",
	"auth",
	"encryption",
];

/// Whether a field name should have its value masked.
pub fn is_sensitive_key(key: &str) -> bool {
	let key = key.to_lowercase();
	SENSITIVE_PATTERNS.iter().any(|p| key.contains(p))
}

/// Partially mask a secret, keeping just enough to recognize it.
///
/// Values of 8 characters or fewer are hidden entirely; longer values
/// keep their first and last 4 characters so an operator can tell two
/// keys apart without seeing either.
pub fn mask_secret(value: &str) -> String {
	if value.is_empty() {
		return NOT_SET.to_string();
	}

	let chars: Vec<char> = value.chars().collect();
	if chars.len() <= 8 {
		return FULL_MASK.to_string();
	}

	let head: String = chars[..4].iter().collect();
	let tail: String = chars[chars.len() - 4..].iter().collect();
	format!("{head}{FULL_MASK}{tail}")
}

/// Mask a secret entirely, only distinguishing set from unset.
pub fn mask_secret_full(value: &str) -> String {
	if value.is_empty() {
		NOT_SET.to_string()
	} else {
		FULL_MASK.to_string()
	}
}
