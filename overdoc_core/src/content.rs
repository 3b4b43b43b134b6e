use derive_more::Deref;
use derive_more::DerefMut;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;

/// A dynamically shaped content tree loaded from a structured document.
///
/// Every base document owns exactly one tree. The merger and the schema
/// processor pattern-match on this enum, so adding a node kind forces every
/// walker to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
	Scalar(Scalar),
	Object(ContentMap),
	Array(Vec<ContentNode>),
}

/// A leaf value in a [`ContentNode`] tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Null,
	Bool(bool),
	Integer(i64),
	Float(OrderedFloat),
	String(String),
}

/// A float wrapper that implements `PartialEq` via approximate comparison so
/// content trees compare cleanly after a round trip through text.
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
	fn eq(&self, other: &Self) -> bool {
		float_cmp::approx_eq!(f64, self.0, other.0)
	}
}

impl std::fmt::Display for OrderedFloat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// An ordered mapping of property names to content.
///
/// Lookups are linear. Insertion order is kept so documents serialize back in
/// the order they were authored; it carries no meaning for merging.
#[derive(Debug, Clone, Default, Deref, DerefMut)]
pub struct ContentMap(Vec<(String, ContentNode)>);

impl PartialEq for ContentMap {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len()
			&& self
				.iter()
				.all(|(key, value)| other.get(key).is_some_and(|other| other == value))
	}
}

impl ContentMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&ContentNode> {
		self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut ContentNode> {
		self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.iter().any(|(k, _)| k == key)
	}

	/// Insert a value, replacing any existing value in place so the original
	/// position of the key is kept.
	pub fn insert(&mut self, key: impl Into<String>, value: ContentNode) -> Option<ContentNode> {
		let key = key.into();
		if let Some(existing) = self.get_mut(&key) {
			return Some(std::mem::replace(existing, value));
		}

		self.0.push((key, value));
		None
	}

	pub fn remove(&mut self, key: &str) -> Option<ContentNode> {
		let index = self.0.iter().position(|(k, _)| k == key)?;
		Some(self.0.remove(index).1)
	}

	/// Return a mutable reference to the value at `key`, inserting the result
	/// of `default` first when the key is missing.
	pub fn get_or_insert_with(
		&mut self,
		key: &str,
		default: impl FnOnce() -> ContentNode,
	) -> &mut ContentNode {
		let index = match self.0.iter().position(|(k, _)| k == key) {
			Some(index) => index,
			None => {
				self.0.push((key.to_string(), default()));
				self.0.len() - 1
			}
		};

		&mut self.0[index].1
	}
}

impl FromIterator<(String, ContentNode)> for ContentMap {
	fn from_iter<T: IntoIterator<Item = (String, ContentNode)>>(iter: T) -> Self {
		let mut map = Self::new();
		for (key, value) in iter {
			map.insert(key, value);
		}
		map
	}
}

impl ContentNode {
	pub fn null() -> Self {
		Self::Scalar(Scalar::Null)
	}

	pub fn string(value: impl Into<String>) -> Self {
		Self::Scalar(Scalar::String(value.into()))
	}

	pub fn object() -> Self {
		Self::Object(ContentMap::new())
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Scalar(Scalar::Null))
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Scalar(Scalar::String(value)) => Some(value),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&ContentMap> {
		match self {
			Self::Object(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_object_mut(&mut self) -> Option<&mut ContentMap> {
		match self {
			Self::Object(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[ContentNode]> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	/// Look up a property when this node is an object.
	pub fn get(&self, key: &str) -> Option<&ContentNode> {
		self.as_object().and_then(|map| map.get(key))
	}

	/// The textual form of a scalar as used for merge-key comparison and
	/// `[key="value"]` path filters. Objects, arrays and null have none.
	pub fn key_text(&self) -> Option<String> {
		match self {
			Self::Scalar(Scalar::String(value)) => Some(value.clone()),
			Self::Scalar(Scalar::Integer(value)) => Some(value.to_string()),
			Self::Scalar(Scalar::Float(value)) => Some(value.to_string()),
			Self::Scalar(Scalar::Bool(value)) => Some(value.to_string()),
			Self::Scalar(Scalar::Null) | Self::Object(_) | Self::Array(_) => None,
		}
	}

	/// Whether this node is an object whose `key` property has the textual
	/// value `value`.
	pub fn has_key_value(&self, key: &str, value: &str) -> bool {
		self.get(key)
			.and_then(Self::key_text)
			.is_some_and(|text| text == value)
	}

	/// A short description of the node kind used in error messages.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Scalar(Scalar::Null) => "null",
			Self::Scalar(Scalar::Bool(_)) => "boolean",
			Self::Scalar(Scalar::Integer(_) | Scalar::Float(_)) => "number",
			Self::Scalar(Scalar::String(_)) => "string",
			Self::Object(_) => "object",
			Self::Array(_) => "array",
		}
	}
}

impl From<serde_yaml_ng::Value> for ContentNode {
	fn from(value: serde_yaml_ng::Value) -> Self {
		use serde_yaml_ng::Value;

		match value {
			Value::Null => Self::null(),
			Value::Bool(value) => Self::Scalar(Scalar::Bool(value)),
			Value::Number(number) => {
				if let Some(value) = number.as_i64() {
					Self::Scalar(Scalar::Integer(value))
				} else {
					Self::Scalar(Scalar::Float(OrderedFloat(
						number.as_f64().unwrap_or(f64::NAN),
					)))
				}
			}
			Value::String(value) => Self::string(value),
			Value::Sequence(items) => Self::Array(items.into_iter().map(Into::into).collect()),
			Value::Mapping(mapping) => {
				Self::Object(
					mapping
						.into_iter()
						.map(|(key, value)| (yaml_key_to_string(key), value.into()))
						.collect(),
				)
			}
			Value::Tagged(tagged) => {
				let tagged = *tagged;
				tagged.value.into()
			}
		}
	}
}

fn yaml_key_to_string(key: serde_yaml_ng::Value) -> String {
	use serde_yaml_ng::Value;

	match key {
		Value::String(value) => value,
		Value::Bool(value) => value.to_string(),
		Value::Number(number) => number.to_string(),
		Value::Null => "null".to_string(),
		other => serde_yaml_ng::to_string(&other)
			.map(|text| text.trim_end().to_string())
			.unwrap_or_default(),
	}
}

impl From<serde_json::Value> for ContentNode {
	fn from(value: serde_json::Value) -> Self {
		use serde_json::Value;

		match value {
			Value::Null => Self::null(),
			Value::Bool(value) => Self::Scalar(Scalar::Bool(value)),
			Value::Number(number) => {
				if let Some(value) = number.as_i64() {
					Self::Scalar(Scalar::Integer(value))
				} else {
					Self::Scalar(Scalar::Float(OrderedFloat(
						number.as_f64().unwrap_or(f64::NAN),
					)))
				}
			}
			Value::String(value) => Self::string(value),
			Value::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
			Value::Object(map) => {
				Self::Object(map.into_iter().map(|(key, value)| (key, value.into())).collect())
			}
		}
	}
}

impl Serialize for ContentNode {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Scalar(scalar) => scalar.serialize(serializer),
			Self::Object(map) => {
				let mut state = serializer.serialize_map(Some(map.len()))?;
				for (key, value) in map.iter() {
					state.serialize_entry(key, value)?;
				}
				state.end()
			}
			Self::Array(items) => {
				let mut state = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					state.serialize_element(item)?;
				}
				state.end()
			}
		}
	}
}

impl Serialize for Scalar {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Null => serializer.serialize_unit(),
			Self::Bool(value) => serializer.serialize_bool(*value),
			Self::Integer(value) => serializer.serialize_i64(*value),
			Self::Float(value) => serializer.serialize_f64(value.0),
			Self::String(value) => serializer.serialize_str(value),
		}
	}
}
