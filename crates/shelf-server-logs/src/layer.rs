// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tracing layer that masks sensitive fields before they reach a sink.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::mask::{is_sensitive_key, mask_secret, mask_secret_full};
use crate::sink::{Attr, AttrValue, Level, LogSink, Record};

/// A tracing Layer that masks event fields with sensitive names and
/// forwards the assembled record to a [`LogSink`].
///
/// This is the application-wide arm of the masking decorator: any
/// `tracing::info!(api_key = %key, ...)` call anywhere in the process,
/// including inside the secrets service, is scrubbed before the sink
/// sees it. The event message itself is passed through unchanged.
#[derive(Clone)]
pub struct MaskingLayer {
	sink: Arc<dyn LogSink>,
}

impl MaskingLayer {
	/// Create a masking layer in front of the given sink.
	pub fn new(sink: impl LogSink + 'static) -> Self {
		Self {
			sink: Arc::new(sink),
		}
	}
}

impl<S> Layer<S> for MaskingLayer
where
	S: Subscriber + for<'a> LookupSpan<'a>,
{
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		let metadata = event.metadata();
		let level = Level::from_tracing(metadata.level());
		if !self.sink.enabled(level) {
			return;
		}

		let mut visitor = MaskingVisitor::new();
		event.record(&mut visitor);

		self.sink.handle(Record {
			level,
			target: metadata.target().to_string(),
			message: visitor.message.unwrap_or_default(),
			attrs: visitor.attrs,
		});
	}
}

struct MaskingVisitor {
	message: Option<String>,
	attrs: Vec<Attr>,
}

impl MaskingVisitor {
	fn new() -> Self {
		Self {
			message: None,
			attrs: Vec::new(),
		}
	}

	fn push_text(&mut self, field: &Field, value: String) {
		let name = field.name();
		if name == "message" {
			self.message = Some(value);
			return;
		}

		let value = if is_sensitive_key(name) {
			mask_secret(&value)
		} else {
			value
		};
		self.attrs.push(Attr::text(name, value));
	}

	fn push_other(&mut self, field: &Field, value: AttrValue) {
		let name = field.name();
		let value = if is_sensitive_key(name) {
			AttrValue::Text(mask_secret_full(&format!("{value:?}")))
		} else {
			value
		};
		self.attrs.push(Attr::new(name, value));
	}
}

impl Visit for MaskingVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		// Display/Debug-captured values arrive here as formatted text.
		self.push_text(field, format!("{value:?}"));
	}

	fn record_str(&mut self, field: &Field, value: &str) {
		self.push_text(field, value.to_string());
	}

	fn record_i64(&mut self, field: &Field, value: i64) {
		self.push_other(field, AttrValue::Int(value));
	}

	fn record_u64(&mut self, field: &Field, value: u64) {
		self.push_other(field, AttrValue::Uint(value));
	}

	fn record_f64(&mut self, field: &Field, value: f64) {
		self.push_other(field, AttrValue::Float(value));
	}

	fn record_bool(&mut self, field: &Field, value: bool) {
		self.push_other(field, AttrValue::Bool(value));
	}

	fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
		self.push_text(field, value.to_string());
	}
}
