// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The structured-sink capability trait and its masking decorator.

use std::sync::{Arc, Mutex};

use crate::mask::{is_sensitive_key, mask_secret, mask_secret_full};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl Level {
	pub fn from_tracing(level: &tracing::Level) -> Self {
		match *level {
			tracing::Level::TRACE => Level::Trace,
			tracing::Level::DEBUG => Level::Debug,
			tracing::Level::INFO => Level::Info,
			tracing::Level::WARN => Level::Warn,
			tracing::Level::ERROR => Level::Error,
		}
	}
}

/// An attribute value. Text values can be partially masked; everything
/// else is replaced wholesale when its key is sensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	Text(String),
	Int(i64),
	Uint(u64),
	Float(f64),
	Bool(bool),
}

impl AttrValue {
	fn render(&self) -> String {
		match self {
			AttrValue::Text(s) => s.clone(),
			AttrValue::Int(v) => v.to_string(),
			AttrValue::Uint(v) => v.to_string(),
			AttrValue::Float(v) => v.to_string(),
			AttrValue::Bool(v) => v.to_string(),
		}
	}
}

/// An ordered key/value pair attached to a record or bound to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
	pub key: String,
	pub value: AttrValue,
}

impl Attr {
	pub fn new(key: impl Into<String>, value: AttrValue) -> Self {
		Self {
			key: key.into(),
			value,
		}
	}

	pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::new(key, AttrValue::Text(value.into()))
	}
}

/// A structured, leveled log record.
#[derive(Debug, Clone)]
pub struct Record {
	pub level: Level,
	pub target: String,
	pub message: String,
	pub attrs: Vec<Attr>,
}

/// A structured-logging sink.
///
/// Decorators wrap an inner sink and intercept each capability method;
/// see [`MaskingSink`]. Implementations must be cheap to fan out, since
/// `with_attrs`/`with_group` return fresh boxed sinks.
pub trait LogSink: Send + Sync {
	/// Whether the sink wants records at this level. Decorators must
	/// delegate unchanged; level gating belongs to the terminal sink.
	fn enabled(&self, level: Level) -> bool;

	/// Consume one record.
	fn handle(&self, record: Record);

	/// A sink with additional attributes bound ahead of time.
	fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn LogSink>;

	/// A sink that nests subsequent attribute keys under a group name.
	fn with_group(&self, name: &str) -> Box<dyn LogSink>;
}

impl LogSink for Box<dyn LogSink> {
	fn enabled(&self, level: Level) -> bool {
		(**self).enabled(level)
	}

	fn handle(&self, record: Record) {
		(**self).handle(record)
	}

	fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn LogSink> {
		(**self).with_attrs(attrs)
	}

	fn with_group(&self, name: &str) -> Box<dyn LogSink> {
		(**self).with_group(name)
	}
}

/// Mask a single attribute if its key is sensitive.
pub(crate) fn mask_attr(attr: Attr) -> Attr {
	if !is_sensitive_key(&attr.key) {
		return attr;
	}

	let masked = match &attr.value {
		AttrValue::Text(s) => mask_secret(s),
		other => mask_secret_full(&other.render()),
	};

	Attr {
		key: attr.key,
		value: AttrValue::Text(masked),
	}
}

/// A decorator that masks sensitive attribute values before delegating
/// to the inner sink.
///
/// `enabled` and `with_group` pass through untouched; `with_attrs`
/// masks the bound attributes so context attached ahead of time is
/// scrubbed exactly like per-record attributes.
pub struct MaskingSink<S> {
	inner: S,
}

impl<S> MaskingSink<S> {
	pub fn new(inner: S) -> Self {
		Self { inner }
	}
}

impl<S: LogSink> LogSink for MaskingSink<S> {
	fn enabled(&self, level: Level) -> bool {
		self.inner.enabled(level)
	}

	fn handle(&self, mut record: Record) {
		record.attrs = record.attrs.into_iter().map(mask_attr).collect();
		self.inner.handle(record);
	}

	fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn LogSink> {
		let masked = attrs.into_iter().map(mask_attr).collect();
		Box::new(MaskingSink {
			inner: self.inner.with_attrs(masked),
		})
	}

	fn with_group(&self, name: &str) -> Box<dyn LogSink> {
		Box::new(MaskingSink {
			inner: self.inner.with_group(name),
		})
	}
}

/// A thread-safe sink that retains records in memory.
///
/// Clones share the same backing storage, so a handle kept by a test
/// observes records pushed through sinks derived via `with_attrs` or
/// `with_group`. Group names prefix attribute keys dot-separated.
#[derive(Clone)]
pub struct BufferSink {
	records: Arc<Mutex<Vec<Record>>>,
	min_level: Level,
	bound: Vec<Attr>,
	group: Option<String>,
}

impl BufferSink {
	pub fn new() -> Self {
		Self::with_min_level(Level::Trace)
	}

	pub fn with_min_level(min_level: Level) -> Self {
		Self {
			records: Arc::new(Mutex::new(Vec::new())),
			min_level,
			bound: Vec::new(),
			group: None,
		}
	}

	/// Snapshot of everything handled so far.
	pub fn records(&self) -> Vec<Record> {
		self.records.lock().unwrap().clone()
	}

	pub fn is_empty(&self) -> bool {
		self.records.lock().unwrap().is_empty()
	}

	fn qualify(&self, key: &str) -> String {
		match &self.group {
			Some(group) => format!("{group}.{key}"),
			None => key.to_string(),
		}
	}
}

impl Default for BufferSink {
	fn default() -> Self {
		Self::new()
	}
}

impl LogSink for BufferSink {
	fn enabled(&self, level: Level) -> bool {
		level >= self.min_level
	}

	fn handle(&self, record: Record) {
		let Record {
			level,
			target,
			message,
			attrs: record_attrs,
		} = record;

		let mut attrs: Vec<Attr> = self.bound.clone();
		attrs.extend(record_attrs);
		let attrs = attrs
			.into_iter()
			.map(|a| Attr {
				key: self.qualify(&a.key),
				value: a.value,
			})
			.collect();

		self.records.lock().unwrap().push(Record {
			level,
			target,
			message,
			attrs,
		});
	}

	fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn LogSink> {
		let mut sink = self.clone();
		sink.bound.extend(attrs);
		Box::new(sink)
	}

	fn with_group(&self, name: &str) -> Box<dyn LogSink> {
		let mut sink = self.clone();
		sink.group = Some(match &self.group {
			Some(group) => format!("{group}.{name}"),
			None => name.to_string(),
		});
		Box::new(sink)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(attrs: Vec<Attr>) -> Record {
		Record {
			level: Level::Info,
			target: "test".to_string(),
			message: "hello".to_string(),
			attrs,
		}
	}

	fn find<'a>(record: &'a Record, key: &str) -> &'a AttrValue {
		&record
			.attrs
			.iter()
			.find(|a| a.key == key)
			.unwrap_or_else(|| panic!("missing attr {key}"))
			.value
	}

	#[test]
	fn masks_sensitive_text_attrs_partially() {
		let buffer = BufferSink::new();
		let sink = MaskingSink::new(buffer.clone());

		sink.handle(record(vec![
			Attr::text("password", "secret123"),
			Attr::text("username", "john"),
		]));

		let records = buffer.records();
		assert_eq!(records.len(), 1);
		assert_eq!(
			find(&records[0], "password"),
			&AttrValue::Text("secr****t123".to_string())
		);
		assert_eq!(
			find(&records[0], "username"),
			&AttrValue::Text("john".to_string())
		);
	}

	#[test]
	fn masks_sensitive_non_text_attrs_fully() {
		let buffer = BufferSink::new();
		let sink = MaskingSink::new(buffer.clone());

		sink.handle(record(vec![
			Attr::new("token", AttrValue::Int(1234567890)),
			Attr::new("port", AttrValue::Uint(8080)),
		]));

		let records = buffer.records();
		assert_eq!(
			find(&records[0], "token"),
			&AttrValue::Text("****".to_string())
		);
		assert_eq!(find(&records[0], "port"), &AttrValue::Uint(8080));
	}

	#[test]
	fn with_attrs_masks_bound_context() {
		let buffer = BufferSink::new();
		let sink = MaskingSink::new(buffer.clone());

		let scoped = sink.with_attrs(vec![
			Attr::text("api_key", "sk-test-abcdef123456"),
			Attr::text("component", "metadata"),
		]);
		scoped.handle(record(vec![]));

		let records = buffer.records();
		assert_eq!(
			find(&records[0], "api_key"),
			&AttrValue::Text("sk-t****3456".to_string())
		);
		assert_eq!(
			find(&records[0], "component"),
			&AttrValue::Text("metadata".to_string())
		);
	}

	#[test]
	fn with_group_is_transparent() {
		let buffer = BufferSink::new();
		let sink = MaskingSink::new(buffer.clone());

		let grouped = sink.with_group("tmdb");
		grouped.handle(record(vec![Attr::text("api_key", "sk-test-abcdef123456")]));

		let records = buffer.records();
		// Grouping changed the key shape but masking still applied.
		assert_eq!(
			find(&records[0], "tmdb.api_key"),
			&AttrValue::Text("sk-t****3456".to_string())
		);
	}

	#[test]
	fn enabled_delegates_to_inner_sink() {
		let buffer = BufferSink::with_min_level(Level::Warn);
		let sink = MaskingSink::new(buffer);

		assert!(!sink.enabled(Level::Debug));
		assert!(sink.enabled(Level::Warn));
		assert!(sink.enabled(Level::Error));
	}

	#[test]
	fn buffer_sink_prefixes_grouped_keys() {
		let buffer = BufferSink::new();
		let nested = buffer.with_group("outer").with_group("inner");
		nested.handle(record(vec![Attr::text("name", "value")]));

		let records = buffer.records();
		assert_eq!(records[0].attrs[0].key, "outer.inner.name");
	}

	#[test]
	fn masked_record_never_contains_plaintext() {
		let buffer = BufferSink::new();
		let sink = MaskingSink::new(buffer.clone());

		sink.handle(record(vec![Attr::text("tmdb_api_key", "sk-test-123")]));

		let rendered = format!("{:?}", buffer.records());
		assert!(rendered.contains("tmdb_api_key"));
		assert!(!rendered.contains("sk-test-123"));
	}
}
