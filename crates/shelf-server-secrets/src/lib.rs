// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Encrypted at-rest storage for Shelf's third-party API keys and
//! tokens.
//!
//! Plaintext never reaches storage or logs. The at-rest key is derived
//! once per service lifetime - from `SHELF_ENCRYPTION_KEY` when the
//! operator set one, from a stable machine identifier otherwise - so
//! secrets survive restarts with zero configuration. Values are sealed
//! with AES-256-GCM and handed to the persistence collaborator as
//! base64 text.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use shelf_server_secrets::{SecretsService, SqliteSecretStore};
//!
//! let store = Arc::new(SqliteSecretStore::connect("sqlite:./shelf.db").await?);
//! let secrets = SecretsService::from_environment(store).await?;
//!
//! secrets.store("tmdb_api_key", "sk-test-123").await?;
//! let key = secrets.retrieve("tmdb_api_key").await?;
//! ```

mod derivation;
mod encryption;
mod error;
mod machine_id;
mod service;
mod store;

pub use derivation::{derive_key, derive_key_from_string, KeySource, ENCRYPTION_KEY_ENV};
pub use encryption::{decrypt, encrypt, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{SecretsError, SecretsResult};
pub use machine_id::{resolve_machine_id, CommandRunner, SystemCommandRunner};
pub use service::SecretsService;
pub use store::{MemorySecretStore, SecretStore, SqliteSecretStore, StoreError};
