// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Authenticated encryption of secret values.
//!
//! AES-256-GCM with no associated data. Encrypted blobs are laid out as
//! `nonce (12) ‖ ciphertext ‖ tag (16)`, so the blob for an empty
//! plaintext is exactly 28 bytes.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of the encryption key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Generate a random nonce.
///
/// Uses 96-bit random nonces from OsRng. The same (key, nonce) pair
/// must never be reused; at Shelf's encryption volumes (one blob per
/// stored API key) random nonces are safely below the AES-GCM
/// collision bound.
fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

fn cipher_for(key: &[u8]) -> SecretsResult<Aes256Gcm> {
	if key.len() != KEY_SIZE {
		return Err(SecretsError::InvalidKeySize {
			expected: KEY_SIZE,
			actual: key.len(),
		});
	}
	Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}

/// Encrypt a plaintext under a 32-byte key.
///
/// Every call draws a fresh random nonce, so encrypting the same
/// plaintext twice yields different blobs.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> SecretsResult<Vec<u8>> {
	let cipher = cipher_for(key)?;

	let nonce_bytes = generate_nonce();
	let nonce = Nonce::from_slice(&nonce_bytes);

	let ciphertext = cipher
		.encrypt(nonce, plaintext)
		.map_err(|e| SecretsError::Encryption(format!("secret encryption failed: {e}")))?;

	let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
	blob.extend_from_slice(&nonce_bytes);
	blob.extend_from_slice(&ciphertext);
	Ok(blob)
}

/// Decrypt a `nonce ‖ ciphertext ‖ tag` blob under a 32-byte key.
///
/// Authentication failure reports [`SecretsError::DecryptionFailed`]
/// whether the key is wrong or the data was tampered with.
pub fn decrypt(blob: &[u8], key: &[u8]) -> SecretsResult<Zeroizing<Vec<u8>>> {
	let cipher = cipher_for(key)?;

	if blob.len() < NONCE_SIZE {
		return Err(SecretsError::CiphertextTooShort {
			min: NONCE_SIZE,
			actual: blob.len(),
		});
	}

	let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
	let plaintext = cipher
		.decrypt(Nonce::from_slice(nonce), ciphertext)
		.map_err(|_| SecretsError::DecryptionFailed)?;

	Ok(Zeroizing::new(plaintext))
}
