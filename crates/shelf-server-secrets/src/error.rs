// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::store::StoreError;

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Error)]
pub enum SecretsError {
	#[error("encryption key must be {expected} bytes, got {actual}")]
	InvalidKeySize { expected: usize, actual: usize },

	#[error("encrypted blob too short: {actual} bytes, minimum {min}")]
	CiphertextTooShort { min: usize, actual: usize },

	/// Covers both a wrong key and tampered data. The two causes are
	/// deliberately indistinguishable.
	#[error("decryption failed")]
	DecryptionFailed,

	/// The operator did not supply a key. Non-fatal; derivation falls
	/// back to the machine identifier.
	#[error("encryption key environment variable is not set")]
	EncryptionKeyNotSet,

	#[error("machine identifier could not be determined")]
	MachineIdNotFound,

	#[error("secret '{0}' not found")]
	SecretNotFound(String),

	#[error("stored value for '{0}' is not valid encrypted data")]
	InvalidEncryptedData(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("secret store {operation} '{name}' failed: {source}")]
	Store {
		operation: &'static str,
		name: String,
		#[source]
		source: StoreError,
	},
}
