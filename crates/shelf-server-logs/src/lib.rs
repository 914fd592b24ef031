// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Structured log sinks with masking of sensitive field values.
//!
//! This crate provides:
//! - [`LogSink`] - A capability trait for structured, leveled log sinks
//! - [`MaskingSink`] - A decorator that masks attribute values whose keys
//!   look sensitive before the inner sink sees them
//! - [`MaskingLayer`] - A tracing Layer that applies the same masking to
//!   tracing events and forwards them to a [`LogSink`]
//! - [`BufferSink`] - A thread-safe sink that retains records in memory
//!
//! Masking is keyed on attribute *names*: a field called `api_key` or
//! `password` gets its value replaced regardless of what the value looks
//! like. Values are never pattern-matched, because the secrets Shelf
//! protects (arbitrary third-party API keys) have no recognizable shape.
//!
//! # Usage
//!
//! ```ignore
//! use shelf_server_logs::{BufferSink, MaskingLayer};
//! use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
//!
//! let sink = BufferSink::new();
//! tracing_subscriber::registry()
//!     .with(MaskingLayer::new(sink.clone()))
//!     .init();
//! ```

mod layer;
mod mask;
mod sink;

pub use layer::MaskingLayer;
pub use mask::{is_sensitive_key, mask_secret, mask_secret_full, SENSITIVE_PATTERNS};
pub use sink::{Attr, AttrValue, BufferSink, Level, LogSink, MaskingSink, Record};
