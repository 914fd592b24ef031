// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! A wrapper type for sensitive values.
//!
//! [`Secret`] keeps API keys, tokens, and decrypted secret material out
//! of `Debug`/`Display` output. The inner value is only reachable
//! through [`Secret::expose`] or [`Secret::into_inner`], so every place
//! that handles plaintext is explicit about it. The wrapped value is
//! zeroized when the wrapper is dropped.
//!
//! `Serialize` is deliberately not implemented; a secret that needs to
//! leave the process must be encrypted first.

use std::fmt;

use zeroize::Zeroize;

/// A sensitive value that redacts itself in `Debug` and `Display`.
pub struct Secret<T: Zeroize> {
	inner: T,
}

impl<T: Zeroize> Secret<T> {
	/// Wrap a sensitive value.
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the wrapped value.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Consume the wrapper and return the inner value.
	///
	/// The caller takes over responsibility for not logging it.
	pub fn into_inner(mut self) -> T
	where
		T: Default,
	{
		// Swap out so Drop zeroizes the leftover default, not the value
		// being handed to the caller.
		let inner = std::mem::take(&mut self.inner);
		std::mem::forget(self);
		inner
	}
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Zeroize> Drop for Secret<T> {
	fn drop(&mut self) {
		self.inner.zeroize();
	}
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl<T: Zeroize> fmt::Display for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl<T: Zeroize> From<T> for Secret<T> {
	fn from(inner: T) -> Self {
		Self::new(inner)
	}
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for Secret<T>
where
	T: Zeroize + serde::Deserialize<'de>,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}
}
