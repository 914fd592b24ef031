// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Persistence boundary for encrypted secrets.
//!
//! The service never hands plaintext to a store; values crossing this
//! boundary are base64-encoded encrypted blobs. Uniqueness of names and
//! durability are the store's responsibility. Concurrent writes to the
//! same name resolve to last-write-wins via the store's upsert.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use sqlx::Row;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("secret '{0}' not found")]
	NotFound(String),

	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),
}

/// Storage collaborator for encrypted secret values.
///
/// One entry per secret; names are case-sensitive and unique.
#[async_trait]
pub trait SecretStore: Send + Sync {
	/// Upsert the encrypted value for a name.
	async fn set(&self, name: &str, value: &str) -> Result<(), StoreError>;

	/// Fetch the encrypted value for a name.
	async fn get(&self, name: &str) -> Result<String, StoreError>;

	/// Remove a secret. Removing an absent name is not an error.
	async fn delete(&self, name: &str) -> Result<(), StoreError>;

	/// Whether a secret exists under this name.
	async fn exists(&self, name: &str) -> Result<bool, StoreError>;

	/// All stored secret names.
	async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// SQLite-backed secret store.
#[derive(Clone)]
pub struct SqliteSecretStore {
	pool: SqlitePool,
}

impl SqliteSecretStore {
	/// Open (creating if missing) a store at the given SQLite URL.
	///
	/// # Arguments
	/// * `database_url` - SQLite connection string (e.g., "sqlite:./shelf.db")
	pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
		let options = SqliteConnectOptions::from_str(database_url)?
			.journal_mode(SqliteJournalMode::Wal)
			.synchronous(SqliteSynchronous::Normal)
			.create_if_missing(true);

		let pool = SqlitePool::connect_with(options).await?;
		Self::with_pool(pool).await
	}

	/// Build a store over an existing pool, creating the schema if
	/// needed.
	pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS secrets (
				name TEXT PRIMARY KEY,
				value TEXT NOT NULL
			)
			"#,
		)
		.execute(&pool)
		.await?;

		tracing::debug!("secret store schema ready");
		Ok(Self { pool })
	}
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
	#[tracing::instrument(skip(self, value))]
	async fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
		sqlx::query(
			r#"
			INSERT INTO secrets (name, value) VALUES (?, ?)
			ON CONFLICT(name) DO UPDATE SET value = excluded.value
			"#,
		)
		.bind(name)
		.bind(value)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, name: &str) -> Result<String, StoreError> {
		let row = sqlx::query("SELECT value FROM secrets WHERE name = ?")
			.bind(name)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => Ok(row.get("value")),
			None => Err(StoreError::NotFound(name.to_string())),
		}
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, name: &str) -> Result<(), StoreError> {
		sqlx::query("DELETE FROM secrets WHERE name = ?")
			.bind(name)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn exists(&self, name: &str) -> Result<bool, StoreError> {
		let row = sqlx::query("SELECT 1 FROM secrets WHERE name = ?")
			.bind(name)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.is_some())
	}

	async fn list(&self) -> Result<Vec<String>, StoreError> {
		let rows = sqlx::query("SELECT name FROM secrets ORDER BY name")
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.iter().map(|row| row.get("name")).collect())
	}
}

/// In-memory secret store for tests and ephemeral setups.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
	entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Raw stored value, bypassing the trait. Lets tests inspect what
	/// actually crossed the persistence boundary.
	pub fn raw(&self, name: &str) -> Option<String> {
		self.entries.lock().unwrap().get(name).cloned()
	}

	/// Overwrite the raw stored value, bypassing the trait.
	pub fn put_raw(&self, name: &str, value: &str) {
		self.entries
			.lock()
			.unwrap()
			.insert(name.to_string(), value.to_string());
	}
}

#[async_trait]
impl SecretStore for MemorySecretStore {
	async fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
		self.entries
			.lock()
			.unwrap()
			.insert(name.to_string(), value.to_string());
		Ok(())
	}

	async fn get(&self, name: &str) -> Result<String, StoreError> {
		self.entries
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| StoreError::NotFound(name.to_string()))
	}

	async fn delete(&self, name: &str) -> Result<(), StoreError> {
		self.entries.lock().unwrap().remove(name);
		Ok(())
	}

	async fn exists(&self, name: &str) -> Result<bool, StoreError> {
		Ok(self.entries.lock().unwrap().contains_key(name))
	}

	async fn list(&self) -> Result<Vec<String>, StoreError> {
		let mut names: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
		names.sort();
		Ok(names)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn sqlite_store() -> SqliteSecretStore {
		let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
		SqliteSecretStore::with_pool(pool).await.unwrap()
	}

	#[tokio::test]
	async fn set_then_get_roundtrips() {
		let store = sqlite_store().await;

		store.set("tmdb_api_key", "AAAA").await.unwrap();
		assert_eq!(store.get("tmdb_api_key").await.unwrap(), "AAAA");
	}

	#[tokio::test]
	async fn set_is_an_upsert() {
		let store = sqlite_store().await;

		store.set("k", "first").await.unwrap();
		store.set("k", "second").await.unwrap();

		assert_eq!(store.get("k").await.unwrap(), "second");
		assert_eq!(store.list().await.unwrap(), vec!["k"]);
	}

	#[tokio::test]
	async fn get_missing_is_not_found() {
		let store = sqlite_store().await;

		assert!(matches!(
			store.get("absent").await,
			Err(StoreError::NotFound(name)) if name == "absent"
		));
	}

	#[tokio::test]
	async fn names_are_case_sensitive() {
		let store = sqlite_store().await;

		store.set("Key", "upper").await.unwrap();
		store.set("key", "lower").await.unwrap();

		assert_eq!(store.get("Key").await.unwrap(), "upper");
		assert_eq!(store.get("key").await.unwrap(), "lower");
	}

	#[tokio::test]
	async fn delete_removes_and_is_idempotent() {
		let store = sqlite_store().await;

		store.set("k", "v").await.unwrap();
		store.delete("k").await.unwrap();
		store.delete("k").await.unwrap();

		assert!(!store.exists("k").await.unwrap());
	}

	#[tokio::test]
	async fn list_returns_sorted_names() {
		let store = sqlite_store().await;

		store.set("b", "2").await.unwrap();
		store.set("a", "1").await.unwrap();
		store.set("c", "3").await.unwrap();

		assert_eq!(store.list().await.unwrap(), vec!["a", "b", "c"]);
	}

	#[tokio::test]
	async fn memory_store_matches_contract() {
		let store = MemorySecretStore::new();

		store.set("k", "v1").await.unwrap();
		store.set("k", "v2").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), "v2");
		assert!(store.exists("k").await.unwrap());

		assert!(matches!(
			store.get("other").await,
			Err(StoreError::NotFound(_))
		));

		store.delete("k").await.unwrap();
		assert!(!store.exists("k").await.unwrap());
		assert!(store.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn connect_creates_database_file() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite:{}", dir.path().join("secrets.db").display());

		let store = SqliteSecretStore::connect(&url).await.unwrap();
		store.set("k", "v").await.unwrap();

		assert!(dir.path().join("secrets.db").exists());
	}
}
