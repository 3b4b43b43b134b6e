use serde::Serialize;

use crate::ContentNode;
use crate::ContentType;
use crate::OPath;
use crate::OverdocError;
use crate::OverdocResult;
use crate::Scalar;
use crate::Schema;
use crate::SchemaKind;
use crate::ValueType;

/// A uid declared by a Uid-tagged field of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UidDefinition {
	pub uid: String,
	/// Address of the Uid-tagged field. The object that owns the uid is at
	/// `address.parent()`.
	pub address: OPath,
	/// The document declaring the uid.
	pub file: String,
	pub line: Option<usize>,
	pub column: Option<usize>,
}

impl UidDefinition {
	/// Address of the object that declares this uid.
	pub fn target(&self) -> OPath {
		self.address.parent()
	}
}

/// Check `content` against `schema` and collect every uid it declares.
///
/// Null values are accepted anywhere. Object properties the schema does not
/// describe are accepted and not walked. Elements of keyed arrays are
/// addressed with `[key="value"]` filters, other elements by index.
pub fn validate(
	content: &ContentNode,
	schema: &Schema,
	file: &str,
) -> OverdocResult<Vec<UidDefinition>> {
	let mut validator = Validator {
		file,
		definitions: vec![],
	};
	validator.walk(content, schema, &OPath::root())?;

	Ok(validator.definitions)
}

struct Validator<'a> {
	file: &'a str,
	definitions: Vec<UidDefinition>,
}

impl Validator<'_> {
	fn mismatch(&self, path: &OPath, expected: impl ToString, node: &ContentNode) -> OverdocError {
		OverdocError::SchemaMismatch {
			file: self.file.to_string(),
			path: path.to_string(),
			expected: expected.to_string(),
			found: node.kind_name().to_string(),
		}
	}

	fn walk(&mut self, node: &ContentNode, schema: &Schema, path: &OPath) -> OverdocResult<()> {
		if node.is_null() {
			return Ok(());
		}

		match (&schema.kind, node) {
			(SchemaKind::Scalar, ContentNode::Scalar(scalar)) => {
				if !scalar_matches(schema.value_type, scalar) {
					return Err(self.mismatch(path, schema.value_type, node));
				}

				if schema.content_type == ContentType::Uid {
					self.define(node, path)?;
				}
			}
			(SchemaKind::Object, ContentNode::Object(map)) => {
				for (name, value) in map.iter() {
					if let Some(child) = schema.property(name) {
						self.walk(value, child, &path.property(name))?;
					}
				}
			}
			(SchemaKind::Array, ContentNode::Array(items)) => {
				let any = Schema::scalar();
				let item_schema = schema.items.as_deref().unwrap_or(&any);
				let merge_key = schema.merge_key();

				for (index, item) in items.iter().enumerate() {
					let item_path = element_path(path, merge_key, item, index);
					self.walk(item, item_schema, &item_path)?;
				}
			}
			(kind, _) => return Err(self.mismatch(path, kind, node)),
		}

		Ok(())
	}

	fn define(&mut self, node: &ContentNode, path: &OPath) -> OverdocResult<()> {
		let Some(uid) = node.as_str() else {
			return Err(self.mismatch(path, "string", node));
		};

		if self.definitions.iter().any(|definition| definition.uid == uid) {
			return Err(OverdocError::DuplicateUid {
				uid: uid.to_string(),
				file: self.file.to_string(),
			});
		}

		self.definitions.push(UidDefinition {
			uid: uid.to_string(),
			address: path.clone(),
			file: self.file.to_string(),
			line: None,
			column: None,
		});

		Ok(())
	}
}

/// The address of one array element: a `[key="value"]` filter when the array
/// is keyed and the element carries the key, otherwise its index.
pub(crate) fn element_path(
	path: &OPath,
	merge_key: Option<&str>,
	item: &ContentNode,
	index: usize,
) -> OPath {
	let keyed = merge_key.and_then(|key| {
		item.get(key)
			.and_then(ContentNode::key_text)
			.map(|value| (key, value))
	});

	match keyed {
		Some((key, value)) => path.filter(key, value),
		None => path.index(index),
	}
}

fn scalar_matches(value_type: ValueType, scalar: &Scalar) -> bool {
	match value_type {
		// Unquoted YAML such as `version: 1.0` reads as a number.
		ValueType::Any | ValueType::String => true,
		ValueType::Integer => matches!(scalar, Scalar::Integer(_)),
		ValueType::Number => matches!(scalar, Scalar::Integer(_) | Scalar::Float(_)),
		ValueType::Boolean => matches!(scalar, Scalar::Bool(_)),
		ValueType::Null => matches!(scalar, Scalar::Null),
	}
}
