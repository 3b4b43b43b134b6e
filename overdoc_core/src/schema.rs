use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::MapAccess;
use serde::de::Visitor;

use crate::FileLayer;
use crate::OverdocConfig;
use crate::OverdocError;
use crate::OverdocResult;

/// The structural kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
	Scalar,
	Object,
	Array,
}

impl Display for SchemaKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Scalar => write!(f, "scalar"),
			Self::Object => write!(f, "object"),
			Self::Array => write!(f, "array"),
		}
	}
}

/// The declared type of a scalar schema node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
	#[default]
	Any,
	String,
	Integer,
	Number,
	Boolean,
	Null,
}

impl Display for ValueType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Any => write!(f, "scalar"),
			Self::String => write!(f, "string"),
			Self::Integer => write!(f, "integer"),
			Self::Number => write!(f, "number"),
			Self::Boolean => write!(f, "boolean"),
			Self::Null => write!(f, "null"),
		}
	}
}

/// Gives meaning to a schema-tagged field. Interpreters declare which content
/// types they handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
	#[default]
	None,
	Markdown,
	Href,
	FileInclude,
	Xref,
	Uid,
}

impl ContentType {
	fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_lowercase().as_str() {
			"" | "none" | "default" => Some(Self::None),
			"markdown" => Some(Self::Markdown),
			"href" => Some(Self::Href),
			"file" | "fileinclude" => Some(Self::FileInclude),
			"xref" => Some(Self::Xref),
			"uid" => Some(Self::Uid),
			_ => None,
		}
	}
}

impl Display for ContentType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::None => write!(f, "none"),
			Self::Markdown => write!(f, "markdown"),
			Self::Href => write!(f, "href"),
			Self::FileInclude => write!(f, "file"),
			Self::Xref => write!(f, "xref"),
			Self::Uid => write!(f, "uid"),
		}
	}
}

/// How an overwrite value combines with the source value for one property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeType {
	/// Dispatch on the schema kind.
	#[default]
	Merge,
	/// Marks the property used to match elements of the enclosing array.
	/// Merges like a scalar.
	Key,
	/// The overwrite value replaces the whole subtree.
	Replace,
	/// Overwrites never change this property.
	Ignore,
}

impl MergeType {
	fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_lowercase().as_str() {
			"merge" => Some(Self::Merge),
			"key" => Some(Self::Key),
			"replace" => Some(Self::Replace),
			"ignore" => Some(Self::Ignore),
			_ => None,
		}
	}
}

/// One node of a schema tree.
///
/// Schemas are immutable once loaded and shared read-only (behind an `Arc` in
/// [`DocumentSchema`]) by every document of the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
	pub kind: SchemaKind,
	pub value_type: ValueType,
	pub properties: Vec<(String, Schema)>,
	pub items: Option<Box<Schema>>,
	/// Explicit merge key for array nodes. See [`Schema::merge_key`].
	pub merge_key: Option<String>,
	pub merge_type: MergeType,
	pub content_type: ContentType,
	pub tags: BTreeSet<String>,
	/// Properties copied into the cross-reference record of the uid declared
	/// by this object.
	pub xref_properties: Vec<String>,
}

impl Default for Schema {
	fn default() -> Self {
		Self::scalar()
	}
}

impl Schema {
	fn with_kind(kind: SchemaKind) -> Self {
		Self {
			kind,
			value_type: ValueType::Any,
			properties: vec![],
			items: None,
			merge_key: None,
			merge_type: MergeType::Merge,
			content_type: ContentType::None,
			tags: BTreeSet::new(),
			xref_properties: vec![],
		}
	}

	pub fn scalar() -> Self {
		Self::with_kind(SchemaKind::Scalar)
	}

	pub fn string() -> Self {
		Self::scalar().with_value_type(ValueType::String)
	}

	pub fn object(properties: impl IntoIterator<Item = (impl Into<String>, Schema)>) -> Self {
		let mut schema = Self::with_kind(SchemaKind::Object);
		schema.properties = properties
			.into_iter()
			.map(|(name, schema)| (name.into(), schema))
			.collect();
		schema
	}

	pub fn array(items: Schema) -> Self {
		let mut schema = Self::with_kind(SchemaKind::Array);
		schema.items = Some(Box::new(items));
		schema
	}

	pub fn with_value_type(mut self, value_type: ValueType) -> Self {
		self.value_type = value_type;
		self
	}

	pub fn with_content_type(mut self, content_type: ContentType) -> Self {
		self.content_type = content_type;
		self
	}

	pub fn with_merge_type(mut self, merge_type: MergeType) -> Self {
		self.merge_type = merge_type;
		self
	}

	pub fn with_merge_key(mut self, key: impl Into<String>) -> Self {
		self.merge_key = Some(key.into());
		self
	}

	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.insert(tag.into());
		self
	}

	pub fn with_xref_properties(
		mut self,
		properties: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.xref_properties = properties.into_iter().map(Into::into).collect();
		self
	}

	/// Look up the child schema of an object property.
	pub fn property(&self, name: &str) -> Option<&Schema> {
		self.properties
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, schema)| schema)
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.contains(tag)
	}

	/// The property used to match elements of this array: the explicit
	/// `mergeKey`, or the item property declared with `mergeType: key`.
	pub fn merge_key(&self) -> Option<&str> {
		if let Some(key) = &self.merge_key {
			return Some(key);
		}

		self.items.as_deref().and_then(|items| {
			items
				.properties
				.iter()
				.find(|(_, schema)| schema.merge_type == MergeType::Key)
				.map(|(name, _)| name.as_str())
		})
	}

	/// The name of the first property of this object tagged as a uid.
	pub fn uid_property(&self) -> Option<&str> {
		self.properties
			.iter()
			.find(|(_, schema)| schema.content_type == ContentType::Uid)
			.map(|(name, _)| name.as_str())
	}
}

/// The schema of one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
	/// The document type named by the YAML MIME header of base documents.
	pub title: String,
	pub root: Schema,
}

impl DocumentSchema {
	pub fn new(title: impl Into<String>, root: Schema) -> Self {
		Self {
			title: title.into(),
			root,
		}
	}

	/// Parse a schema written in YAML. `name` is used as the title when the
	/// schema declares none.
	///
	/// Text that is not YAML fails with [`OverdocError::Yaml`]; YAML that is
	/// not a schema fails with [`OverdocError::SchemaParse`].
	pub fn from_yaml(name: &str, text: &str) -> OverdocResult<Self> {
		let value: serde_yaml_ng::Value =
			serde_yaml_ng::from_str(text).map_err(|e| OverdocError::Yaml {
				file: name.to_string(),
				reason: e.to_string(),
			})?;
		let raw: RawSchema =
			serde_yaml_ng::from_value(value).map_err(|e| OverdocError::SchemaParse {
				name: name.to_string(),
				reason: e.to_string(),
			})?;
		Self::from_raw(name, raw)
	}

	/// Parse a schema written in JSON. Malformed JSON fails with
	/// [`OverdocError::Json`].
	pub fn from_json(name: &str, text: &str) -> OverdocResult<Self> {
		let raw: RawSchema = serde_json::from_str(text).map_err(|e| {
			match e.classify() {
				serde_json::error::Category::Data => {
					OverdocError::SchemaParse {
						name: name.to_string(),
						reason: e.to_string(),
					}
				}
				_ => {
					OverdocError::Json {
						file: name.to_string(),
						reason: e.to_string(),
					}
				}
			}
		})?;
		Self::from_raw(name, raw)
	}

	/// Load the schema file at `path` through `files`, choosing the format
	/// from its extension.
	pub fn load(name: &str, path: &str, files: &dyn FileLayer) -> OverdocResult<Self> {
		let text = files.read_text(path)?;
		let extension = Path::new(path)
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		let parsed = match extension.as_str() {
			"json" => Self::from_json(name, &text),
			_ => Self::from_yaml(name, &text),
		};

		parsed.map_err(|error| {
			match error {
				OverdocError::Yaml { reason, .. } => {
					OverdocError::Yaml {
						file: path.to_string(),
						reason,
					}
				}
				OverdocError::Json { reason, .. } => {
					OverdocError::Json {
						file: path.to_string(),
						reason,
					}
				}
				other => other,
			}
		})
	}

	fn from_raw(name: &str, raw: RawSchema) -> OverdocResult<Self> {
		let title = raw.title.clone().unwrap_or_else(|| name.to_string());
		let definitions = raw.definitions.clone();
		let mut builder = SchemaBuilder {
			name,
			definitions: &definitions,
			resolving: vec![],
		};
		let root = builder.build(&raw)?;

		Ok(Self { title, root })
	}
}

/// Document type to schema lookup, created once per build and passed down.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
	schemas: HashMap<String, Arc<DocumentSchema>>,
}

impl SchemaRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a schema under its title.
	pub fn insert(&mut self, schema: DocumentSchema) -> Arc<DocumentSchema> {
		let schema = Arc::new(schema);
		self.schemas.insert(schema.title.clone(), schema.clone());
		schema
	}

	/// Register a schema under an explicit document type.
	pub fn insert_as(
		&mut self,
		document_type: impl Into<String>,
		schema: DocumentSchema,
	) -> Arc<DocumentSchema> {
		let schema = Arc::new(schema);
		self.schemas.insert(document_type.into(), schema.clone());
		schema
	}

	pub fn get(&self, document_type: &str) -> OverdocResult<Arc<DocumentSchema>> {
		self.schemas
			.get(document_type)
			.cloned()
			.ok_or_else(|| OverdocError::UnknownDocumentType(document_type.to_string()))
	}

	pub fn len(&self) -> usize {
		self.schemas.len()
	}

	pub fn is_empty(&self) -> bool {
		self.schemas.is_empty()
	}

	/// Load every schema listed in the `[schemas]` section of the config.
	/// Paths are relative to the root of `files`.
	pub fn from_config(files: &dyn FileLayer, config: &OverdocConfig) -> OverdocResult<Self> {
		let mut registry = Self::new();
		for (document_type, relative) in &config.schemas {
			let path = relative.to_string_lossy().replace('\\', "/");
			let schema = DocumentSchema::load(document_type, &path, files)?;
			registry.insert_as(document_type.clone(), schema);
		}

		Ok(registry)
	}
}

/// The serialized form of a schema node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
	#[serde(rename = "$ref")]
	reference: Option<String>,
	#[serde(rename = "type")]
	kind: Option<RawType>,
	title: Option<String>,
	#[serde(default)]
	properties: RawProperties,
	items: Option<Box<RawSchema>>,
	content_type: Option<String>,
	merge_type: Option<String>,
	merge_key: Option<String>,
	#[serde(default)]
	tags: Vec<String>,
	#[serde(default)]
	xref_properties: Vec<String>,
	#[serde(default)]
	definitions: BTreeMap<String, RawSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawType {
	One(String),
	Many(Vec<String>),
}

impl RawType {
	/// `["string", "null"]` means an optional string.
	fn primary(&self) -> Option<&str> {
		match self {
			Self::One(name) => Some(name),
			Self::Many(names) => {
				names
					.iter()
					.find(|name| name.as_str() != "null")
					.or_else(|| names.first())
					.map(String::as_str)
			}
		}
	}
}

/// Object properties in document order.
#[derive(Debug, Clone, Default)]
struct RawProperties(Vec<(String, RawSchema)>);

impl<'de> Deserialize<'de> for RawProperties {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct PropertiesVisitor;

		impl<'de> Visitor<'de> for PropertiesVisitor {
			type Value = RawProperties;

			fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
				formatter.write_str("a map of property names to schemas")
			}

			fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
				let mut properties = vec![];
				while let Some((name, schema)) = access.next_entry::<String, RawSchema>()? {
					properties.push((name, schema));
				}
				Ok(RawProperties(properties))
			}
		}

		deserializer.deserialize_map(PropertiesVisitor)
	}
}

struct SchemaBuilder<'a> {
	name: &'a str,
	definitions: &'a BTreeMap<String, RawSchema>,
	/// Definitions currently being expanded, for cycle detection.
	resolving: Vec<String>,
}

impl SchemaBuilder<'_> {
	fn error(&self, reason: impl Into<String>) -> OverdocError {
		OverdocError::SchemaParse {
			name: self.name.to_string(),
			reason: reason.into(),
		}
	}

	fn build(&mut self, raw: &RawSchema) -> OverdocResult<Schema> {
		if let Some(reference) = &raw.reference {
			return self.build_reference(reference, raw);
		}

		let type_name = raw.kind.as_ref().and_then(RawType::primary);
		let (kind, value_type) = match type_name {
			Some("object") => (SchemaKind::Object, ValueType::Any),
			Some("array") => (SchemaKind::Array, ValueType::Any),
			Some("string") => (SchemaKind::Scalar, ValueType::String),
			Some("integer") => (SchemaKind::Scalar, ValueType::Integer),
			Some("number") => (SchemaKind::Scalar, ValueType::Number),
			Some("boolean") => (SchemaKind::Scalar, ValueType::Boolean),
			Some("null") => (SchemaKind::Scalar, ValueType::Null),
			Some(other) => return Err(self.error(format!("unknown type `{other}`"))),
			None if !raw.properties.0.is_empty() => (SchemaKind::Object, ValueType::Any),
			None if raw.items.is_some() => (SchemaKind::Array, ValueType::Any),
			None => (SchemaKind::Scalar, ValueType::Any),
		};

		let mut schema = Schema::with_kind(kind).with_value_type(value_type);

		for (name, property) in &raw.properties.0 {
			schema.properties.push((name.clone(), self.build(property)?));
		}

		if let Some(items) = &raw.items {
			schema.items = Some(Box::new(self.build(items)?));
		} else if kind == SchemaKind::Array {
			schema.items = Some(Box::new(Schema::scalar()));
		}

		if let Some(content_type) = &raw.content_type {
			schema.content_type = ContentType::parse(content_type)
				.ok_or_else(|| self.error(format!("unknown contentType `{content_type}`")))?;
		}

		if let Some(merge_type) = &raw.merge_type {
			schema.merge_type = MergeType::parse(merge_type)
				.ok_or_else(|| self.error(format!("unknown mergeType `{merge_type}`")))?;
		}

		schema.merge_key.clone_from(&raw.merge_key);
		schema.tags = raw.tags.iter().cloned().collect();
		schema.xref_properties.clone_from(&raw.xref_properties);

		if schema.merge_key.is_some() && kind != SchemaKind::Array {
			return Err(self.error("`mergeKey` is only allowed on arrays"));
		}

		Ok(schema)
	}

	/// Expand `$ref`. Sibling keywords on the referencing node refine the
	/// referenced schema.
	fn build_reference(&mut self, reference: &str, raw: &RawSchema) -> OverdocResult<Schema> {
		let Some(name) = reference.strip_prefix("#/definitions/") else {
			return Err(self.error(format!(
				"unsupported `$ref` `{reference}`, only `#/definitions/<name>` is allowed"
			)));
		};

		if self.resolving.iter().any(|current| current == name) {
			return Err(self.error(format!(
				"recursive `$ref` through `{}`",
				self.resolving.join(" -> ")
			)));
		}

		let definition = self
			.definitions
			.get(name)
			.ok_or_else(|| self.error(format!("unknown definition `{name}`")))?;

		self.resolving.push(name.to_string());
		let mut schema = self.build(definition)?;
		self.resolving.pop();

		if let Some(content_type) = &raw.content_type {
			schema.content_type = ContentType::parse(content_type)
				.ok_or_else(|| self.error(format!("unknown contentType `{content_type}`")))?;
		}
		if let Some(merge_type) = &raw.merge_type {
			schema.merge_type = MergeType::parse(merge_type)
				.ok_or_else(|| self.error(format!("unknown mergeType `{merge_type}`")))?;
		}
		if raw.merge_key.is_some() {
			schema.merge_key.clone_from(&raw.merge_key);
		}
		schema.tags.extend(raw.tags.iter().cloned());
		for property in &raw.xref_properties {
			if !schema.xref_properties.contains(property) {
				schema.xref_properties.push(property.clone());
			}
		}

		if schema.merge_key.is_some() && schema.kind != SchemaKind::Array {
			return Err(self.error("`mergeKey` is only allowed on arrays"));
		}

		Ok(schema)
	}
}
