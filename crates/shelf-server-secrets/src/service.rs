// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The secrets service: derivation, encryption, and persistence tied
//! together behind store/retrieve/delete/exists/list.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use shelf_common_secret::Secret;
use zeroize::Zeroizing;

use crate::derivation::{self, KeySource};
use crate::encryption::{decrypt, encrypt, KEY_SIZE};
use crate::error::{SecretsError, SecretsResult};
use crate::machine_id::{CommandRunner, SystemCommandRunner};
use crate::store::{SecretStore, StoreError};
use shelf_server_logs::mask_secret;

/// Service owning the at-rest encryption key and the persistence
/// collaborator.
///
/// The key is derived (or injected) once at construction and lives,
/// immutable, for the service's lifetime; it is zeroized on drop.
/// Methods take `&self` and add no locking; concurrent stores racing on
/// one name resolve to the collaborator's last-write-wins upsert.
pub struct SecretsService {
	key: Zeroizing<[u8; KEY_SIZE]>,
	key_source: Option<KeySource>,
	store: Arc<dyn SecretStore>,
}

impl SecretsService {
	/// Build a service around an explicitly provided 32-byte key.
	pub fn with_key(key: &[u8], store: Arc<dyn SecretStore>) -> SecretsResult<Self> {
		let key: [u8; KEY_SIZE] = key
			.try_into()
			.map_err(|_| SecretsError::InvalidKeySize {
				expected: KEY_SIZE,
				actual: key.len(),
			})?;

		Ok(Self {
			key: Zeroizing::new(key),
			key_source: None,
			store,
		})
	}

	/// Build a service whose key is derived from the environment, or
	/// from the machine identifier when no operator key is set.
	pub async fn from_environment(store: Arc<dyn SecretStore>) -> SecretsResult<Self> {
		Self::from_derivation(store, &SystemCommandRunner).await
	}

	/// As [`Self::from_environment`], with an injected command runner
	/// for the machine-identifier probes.
	pub async fn from_derivation(
		store: Arc<dyn SecretStore>,
		runner: &dyn CommandRunner,
	) -> SecretsResult<Self> {
		let (key, source) = derivation::derive_key(runner).await?;
		tracing::info!(key_source = ?source, "encryption key derived");

		Ok(Self {
			key,
			key_source: Some(source),
			store,
		})
	}

	/// How the key was obtained, when it was derived rather than
	/// injected. Informational only.
	pub fn key_source(&self) -> Option<KeySource> {
		self.key_source
	}

	/// Encrypt and persist a secret value under a name, overwriting any
	/// previous value.
	#[tracing::instrument(skip(self, value))]
	pub async fn store(&self, name: &str, value: &str) -> SecretsResult<()> {
		let blob = encrypt(value.as_bytes(), self.key.as_ref())?;
		let encoded = BASE64.encode(blob);

		self.store
			.set(name, &encoded)
			.await
			.map_err(|e| wrap_store_error("set", name, e))?;

		tracing::info!(name = %name, value = %mask_secret(value), "secret stored");
		Ok(())
	}

	/// Fetch and decrypt a secret. Plaintext is re-derived from the
	/// persisted blob on every call; nothing is cached.
	#[tracing::instrument(skip(self))]
	pub async fn retrieve(&self, name: &str) -> SecretsResult<Secret<String>> {
		let encoded = self
			.store
			.get(name)
			.await
			.map_err(|e| wrap_store_error("get", name, e))?;

		let blob = BASE64
			.decode(encoded.as_bytes())
			.map_err(|_| SecretsError::InvalidEncryptedData(name.to_string()))?;

		let mut plaintext = decrypt(&blob, self.key.as_ref())?;
		let bytes = std::mem::take(&mut *plaintext);

		String::from_utf8(bytes)
			.map(Secret::new)
			.map_err(|_| SecretsError::InvalidEncryptedData(name.to_string()))
	}

	/// Remove a secret. Removing an absent name is not an error.
	#[tracing::instrument(skip(self))]
	pub async fn delete(&self, name: &str) -> SecretsResult<()> {
		self.store
			.delete(name)
			.await
			.map_err(|e| wrap_store_error("delete", name, e))?;

		tracing::info!(name = %name, "secret deleted");
		Ok(())
	}

	/// Whether a secret exists under this name.
	pub async fn exists(&self, name: &str) -> SecretsResult<bool> {
		self.store
			.exists(name)
			.await
			.map_err(|e| wrap_store_error("exists", name, e))
	}

	/// Names of all stored secrets. Never values, never blobs.
	pub async fn list(&self) -> SecretsResult<Vec<String>> {
		self.store
			.list()
			.await
			.map_err(|e| wrap_store_error("list", "*", e))
	}
}

/// Collaborator errors are wrapped with call-site context; the
/// distinguished not-found condition passes through unchanged.
fn wrap_store_error(operation: &'static str, name: &str, source: StoreError) -> SecretsError {
	match source {
		StoreError::NotFound(name) => SecretsError::SecretNotFound(name),
		source => SecretsError::Store {
			operation,
			name: name.to_string(),
			source,
		},
	}
}
