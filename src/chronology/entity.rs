//! Typed domain records as delivered by the chronology backend.
//!
//! The backend returns loosely typed JSON. Each collection is validated once
//! here: records are coerced one by one, and a record that cannot be turned
//! into a usable entity is skipped with a warning instead of failing the
//! whole payload.

use log::warn;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::graph::{NATIVE_IDS, is_native_id};

/// Maximum number of characters of prophecy text used as a fallback label.
pub const LABEL_TRUNCATE: usize = 40;

/// Failure to decode a whole collection payload.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The payload is not valid JSON.
	#[error("invalid JSON payload: {0}")]
	Json(#[from] serde_json::Error),
	/// The payload is valid JSON but not an array of records.
	#[error("expected a JSON array of {collection}, found {found}")]
	NotAList {
		/// Which collection was being decoded.
		collection: &'static str,
		/// JSON type actually found.
		found: &'static str,
	},
}

/// A chronological event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
	/// Backend id, also the node id.
	#[serde(deserialize_with = "native_id")]
	pub id: i64,
	/// Display name; blank names become `None`.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub name: Option<String>,
	/// Start year; negative years are BC.
	#[serde(deserialize_with = "lenient_i64")]
	pub year_start: i64,
	/// End year for events spanning a period.
	#[serde(default, deserialize_with = "lenient_opt_i64")]
	pub year_end: Option<i64>,
	/// Era the timeline groups the event under.
	#[serde(default, deserialize_with = "nullable_string")]
	pub era: String,
	/// Backend event type, e.g. `JUDGMENT`.
	#[serde(default, deserialize_with = "nullable_string")]
	pub event_type: String,
	/// Drawn larger on the timeline.
	#[serde(default, deserialize_with = "nullable_bool")]
	pub is_pivotal: bool,
	/// Free-text description.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub description: Option<String>,
}

/// A recurring historical pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
	/// Backend id.
	#[serde(deserialize_with = "native_id")]
	pub id: i64,
	/// Display name; blank names become `None`.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub name: Option<String>,
	/// Free-text description.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub description: Option<String>,
	/// Backend pattern type, e.g. `CYCLE`.
	#[serde(default, deserialize_with = "nullable_string")]
	pub pattern_type: String,
}

/// A prophecy record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prophecy {
	/// Backend id.
	#[serde(deserialize_with = "native_id")]
	pub id: i64,
	/// Scripture reference, the preferred label.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub reference: Option<String>,
	/// Prophecy text.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub text: Option<String>,
	/// Prophecy category, e.g. `Messianic`.
	#[serde(default, deserialize_with = "non_empty_string")]
	pub category: Option<String>,
}

/// Back-reference from a graph node to the record it was built from.
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
	/// Event record.
	Event(Event),
	/// Pattern record.
	Pattern(Pattern),
	/// Prophecy record.
	Prophecy(Prophecy),
}

impl Event {
	/// Display label, falling back to a placeholder when the name is missing.
	pub fn label(&self) -> String {
		self.name.clone().unwrap_or_else(|| "Untitled event".into())
	}

	/// Year span, e.g. `4004 BC` or `1491 BC – 1451 BC`.
	pub fn span(&self) -> String {
		match self.year_end {
			Some(end) if end != self.year_start => {
				format!("{} – {}", format_year(self.year_start), format_year(end))
			}
			_ => format_year(self.year_start),
		}
	}

	/// Multi-line hover text: label, span, type, description.
	pub fn tooltip(&self) -> String {
		let mut lines = vec![self.label(), self.span()];
		if !self.event_type.is_empty() {
			lines.push(self.event_type.clone());
		}
		lines.extend(self.description.clone());
		lines.join("\n")
	}
}

impl Pattern {
	/// Display label, falling back to a placeholder.
	pub fn label(&self) -> String {
		self.name.clone().unwrap_or_else(|| "Untitled pattern".into())
	}

	/// Multi-line hover text.
	pub fn tooltip(&self) -> String {
		let mut lines = vec![self.label()];
		if !self.pattern_type.is_empty() {
			lines.push(self.pattern_type.clone());
		}
		lines.extend(self.description.clone());
		lines.join("\n")
	}
}

impl Prophecy {
	/// Reference if present, else the start of the text, else a generic
	/// placeholder.
	pub fn label(&self) -> String {
		if let Some(reference) = &self.reference {
			return reference.clone();
		}
		match &self.text {
			Some(text) if text.chars().count() > LABEL_TRUNCATE => {
				let head: String = text.chars().take(LABEL_TRUNCATE).collect();
				format!("{}…", head.trim_end())
			}
			Some(text) => text.clone(),
			None => format!("Prophecy {}", self.id),
		}
	}

	/// Multi-line hover text.
	pub fn tooltip(&self) -> String {
		let mut lines = vec![self.label()];
		lines.extend(self.category.clone());
		if self.reference.is_some() {
			lines.extend(self.text.clone());
		}
		lines.join("\n")
	}
}

impl Entity {
	/// Identifier as assigned by the backend (not the graph node id).
	pub fn native_id(&self) -> i64 {
		match self {
			Entity::Event(e) => e.id,
			Entity::Pattern(p) => p.id,
			Entity::Prophecy(p) => p.id,
		}
	}

	/// Display label of the wrapped record.
	pub fn label(&self) -> String {
		match self {
			Entity::Event(e) => e.label(),
			Entity::Pattern(p) => p.label(),
			Entity::Prophecy(p) => p.label(),
		}
	}

	/// Hover text of the wrapped record.
	pub fn tooltip(&self) -> String {
		match self {
			Entity::Event(e) => e.tooltip(),
			Entity::Pattern(p) => p.tooltip(),
			Entity::Prophecy(p) => p.tooltip(),
		}
	}

	/// The wrapped event, if this is one.
	pub fn as_event(&self) -> Option<&Event> {
		match self {
			Entity::Event(e) => Some(e),
			_ => None,
		}
	}
}

/// Formats a signed year the way the timeline axis shows it.
pub fn format_year(year: i64) -> String {
	if year < 0 {
		format!("{} BC", year.unsigned_abs())
	} else {
		format!("{} AD", year)
	}
}

/// Decodes the `/events` payload.
pub fn decode_events(payload: &Value) -> Result<Vec<Event>, DecodeError> {
	decode_collection(payload, "events")
}

/// Decodes the `/patterns` payload.
pub fn decode_patterns(payload: &Value) -> Result<Vec<Pattern>, DecodeError> {
	decode_collection(payload, "patterns")
}

/// Decodes the `/prophecies` payload.
pub fn decode_prophecies(payload: &Value) -> Result<Vec<Prophecy>, DecodeError> {
	decode_collection(payload, "prophecies")
}

/// Parses raw response text and decodes it as a collection.
pub fn decode_str<T: DeserializeOwned>(
	text: &str,
	collection: &'static str,
) -> Result<Vec<T>, DecodeError> {
	let payload: Value = serde_json::from_str(text)?;
	decode_collection(&payload, collection)
}

fn decode_collection<T: DeserializeOwned>(
	payload: &Value,
	collection: &'static str,
) -> Result<Vec<T>, DecodeError> {
	let Value::Array(items) = payload else {
		return Err(DecodeError::NotAList {
			collection,
			found: json_type(payload),
		});
	};
	let mut records = Vec::with_capacity(items.len());
	for (i, item) in items.iter().enumerate() {
		match T::deserialize(item) {
			Ok(record) => records.push(record),
			Err(err) => warn!("skipping {collection}[{i}]: {err}"),
		}
	}
	Ok(records)
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

fn coerce_i64<E: de::Error>(value: &Value) -> Result<i64, E> {
	match value {
		Value::Number(n) => n
			.as_i64()
			.or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
			.ok_or_else(|| E::custom(format!("{n} is not an integer"))),
		Value::String(s) => s
			.trim()
			.parse()
			.map_err(|_| E::custom(format!("{s:?} is not an integer"))),
		other => Err(E::custom(format!("expected an integer, found {}", json_type(other)))),
	}
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
	coerce_i64(&Value::deserialize(d)?)
}

fn native_id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
	let id = coerce_i64(&Value::deserialize(d)?)?;
	if is_native_id(id) {
		Ok(id)
	} else {
		Err(de::Error::custom(format!("id {id} outside {NATIVE_IDS:?}")))
	}
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
	match Value::deserialize(d)? {
		Value::Null => Ok(None),
		Value::String(s) if s.trim().is_empty() => Ok(None),
		other => coerce_i64(&other).map(Some),
	}
}

fn nullable_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
	Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn non_empty_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
	Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
}

fn nullable_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
	Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}
