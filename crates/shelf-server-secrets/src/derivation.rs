// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Deterministic derivation of the at-rest encryption key.
//!
//! The key comes from the `SHELF_ENCRYPTION_KEY` environment variable
//! when the operator set one, and from the machine identifier
//! otherwise. Either input is stretched with PBKDF2-HMAC-SHA256 under a
//! fixed application salt, so the same input always yields the same
//! 32-byte key across restarts.
//!
//! The salt is intentionally fixed rather than random: a random salt
//! would have to be persisted alongside the data it protects or the key
//! could never be re-derived after a restart.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::encryption::KEY_SIZE;
use crate::error::{SecretsError, SecretsResult};
use crate::machine_id::{resolve_machine_id, CommandRunner};

/// Environment variable holding the operator-supplied key input.
pub const ENCRYPTION_KEY_ENV: &str = "SHELF_ENCRYPTION_KEY";

/// PBKDF2 iteration count.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Fixed application salt. See the module docs before changing this;
/// any change orphans every previously encrypted secret.
const KEY_DERIVATION_SALT: &[u8] = b"shelf/secrets:v1";

/// How the encryption key was obtained. Informational only; the key
/// format is identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
	/// Operator-supplied via the environment.
	EnvVar,
	/// Derived from the machine identifier.
	MachineFallback,
}

/// Derive a 32-byte key from an arbitrary input string.
///
/// Deterministic: identical inputs yield identical keys.
pub fn derive_key_from_string(input: &str) -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	pbkdf2_hmac::<Sha256>(
		input.as_bytes(),
		KEY_DERIVATION_SALT,
		PBKDF2_ITERATIONS,
		key.as_mut(),
	);
	key
}

/// Derive the service key, preferring the operator-supplied input.
pub async fn derive_key(
	runner: &dyn CommandRunner,
) -> SecretsResult<(Zeroizing<[u8; KEY_SIZE]>, KeySource)> {
	let env_value = std::env::var(ENCRYPTION_KEY_ENV).ok();
	derive_key_with(env_value.as_deref(), runner).await
}

/// Resolution order: operator input first, machine identifier second.
/// Split from [`derive_key`] so tests control the environment value.
pub(crate) async fn derive_key_with(
	operator_input: Option<&str>,
	runner: &dyn CommandRunner,
) -> SecretsResult<(Zeroizing<[u8; KEY_SIZE]>, KeySource)> {
	match operator_input_or_not_set(operator_input) {
		Ok(input) => Ok((derive_key_from_string(input), KeySource::EnvVar)),
		Err(SecretsError::EncryptionKeyNotSet) => {
			tracing::debug!(
				env = ENCRYPTION_KEY_ENV,
				"no operator key set, deriving from machine identifier"
			);
			let machine_id = resolve_machine_id(runner).await?;
			Ok((
				derive_key_from_string(&machine_id),
				KeySource::MachineFallback,
			))
		}
		Err(e) => Err(e),
	}
}

/// An unset or empty operator input signals
/// [`SecretsError::EncryptionKeyNotSet`], the non-fatal trigger for the
/// machine fallback.
fn operator_input_or_not_set(value: Option<&str>) -> Result<&str, SecretsError> {
	match value {
		Some(v) if !v.is_empty() => Ok(v),
		_ => Err(SecretsError::EncryptionKeyNotSet),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::io;

	struct FixedHostRunner;

	#[async_trait]
	impl CommandRunner for FixedHostRunner {
		async fn run(&self, _program: &str, _args: &[&str]) -> io::Result<String> {
			Ok("test-host\n".to_string())
		}
	}

	#[test]
	fn derivation_is_deterministic() {
		let k1 = derive_key_from_string("x");
		let k2 = derive_key_from_string("x");
		assert_eq!(k1.as_slice(), k2.as_slice());
	}

	#[test]
	fn derivation_is_input_sensitive() {
		let k1 = derive_key_from_string("x");
		let k2 = derive_key_from_string("y");
		assert_ne!(k1.as_slice(), k2.as_slice());
	}

	#[test]
	fn derived_keys_are_32_bytes() {
		assert_eq!(derive_key_from_string("anything").len(), KEY_SIZE);
	}

	#[test]
	fn pbkdf2_known_vector() {
		// RFC 6070-style check that the primitive underneath is PBKDF2-HMAC-SHA256.
		let mut key = [0u8; KEY_SIZE];
		pbkdf2_hmac::<Sha256>(b"password", b"salt", 1, &mut key);
		assert_eq!(
			hex::encode(key),
			"120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
		);
	}

	#[test]
	fn empty_operator_input_signals_not_set() {
		assert!(matches!(
			operator_input_or_not_set(Some("")),
			Err(SecretsError::EncryptionKeyNotSet)
		));
		assert!(matches!(
			operator_input_or_not_set(None),
			Err(SecretsError::EncryptionKeyNotSet)
		));
		assert_eq!(operator_input_or_not_set(Some("abc")).unwrap(), "abc");
	}

	#[tokio::test]
	async fn operator_input_takes_priority() {
		let (key, source) = derive_key_with(Some("abc"), &FixedHostRunner).await.unwrap();

		assert_eq!(source, KeySource::EnvVar);
		assert_eq!(key.as_slice(), derive_key_from_string("abc").as_slice());
	}

	#[tokio::test]
	async fn missing_operator_input_falls_back_to_machine_id() {
		let (key, source) = derive_key_with(None, &FixedHostRunner).await.unwrap();

		assert_eq!(source, KeySource::MachineFallback);

		let machine_id = resolve_machine_id(&FixedHostRunner).await.unwrap();
		assert_eq!(
			key.as_slice(),
			derive_key_from_string(&machine_id).as_slice()
		);
	}

	#[tokio::test]
	async fn empty_operator_input_falls_back_to_machine_id() {
		let (_, source) = derive_key_with(Some(""), &FixedHostRunner).await.unwrap();
		assert_eq!(source, KeySource::MachineFallback);
	}
}
