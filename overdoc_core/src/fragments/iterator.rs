use crate::ContentNode;
use crate::ContentType;
use crate::OPath;
use crate::Schema;
use crate::SchemaKind;

/// Callbacks driven by [`iterate_fragments`].
pub trait FragmentVisitor {
	/// An object declaring `uid` was reached. `path` is its address in the
	/// document.
	fn on_uid(&mut self, schema: &Schema, content: &ContentNode, path: &OPath, uid: &str);

	/// A property of the current uid. `parent_path` is the address of the
	/// object holding the property, relative to the object declaring `uid`.
	/// `value` is `None` when the content does not set the property.
	fn on_property(
		&mut self,
		name: &str,
		schema: &Schema,
		value: Option<&ContentNode>,
		parent_path: &OPath,
		uid: &str,
	);
}

/// Walk `content` and `schema` together, reporting every uid and every
/// schema property that belongs to a uid.
///
/// Uid fields themselves are not reported as properties. Objects are entered
/// when present. Arrays are entered only when they have a merge key, one
/// element at a time with a `[key="value"]` segment. Properties before the
/// first uid are not reported.
pub fn iterate_fragments(content: &ContentNode, schema: &Schema, visitor: &mut impl FragmentVisitor) {
	walk(content, schema, &OPath::root(), &OPath::root(), None, visitor);
}

fn walk(
	node: &ContentNode,
	schema: &Schema,
	path: &OPath,
	relative: &OPath,
	uid: Option<&str>,
	visitor: &mut impl FragmentVisitor,
) {
	if schema.kind != SchemaKind::Object {
		return;
	}
	let ContentNode::Object(map) = node else {
		return;
	};

	let declared = schema
		.uid_property()
		.and_then(|property| map.get(property))
		.and_then(ContentNode::as_str);

	let (uid, relative) = match declared {
		Some(declared) => {
			visitor.on_uid(schema, node, path, declared);
			(Some(declared), OPath::root())
		}
		None => (uid, relative.clone()),
	};

	for (name, property_schema) in &schema.properties {
		if property_schema.content_type == ContentType::Uid {
			continue;
		}

		let value = map.get(name);
		if let Some(uid) = uid {
			visitor.on_property(name, property_schema, value, &relative, uid);
		}

		let Some(value) = value else {
			continue;
		};

		match (property_schema.kind, value) {
			(SchemaKind::Object, ContentNode::Object(_)) => {
				walk(
					value,
					property_schema,
					&path.property(name.clone()),
					&relative.property(name.clone()),
					uid,
					visitor,
				);
			}
			(SchemaKind::Array, ContentNode::Array(items)) => {
				let (Some(key), Some(item_schema)) =
					(property_schema.merge_key(), property_schema.items.as_deref())
				else {
					continue;
				};

				for item in items {
					let Some(value) = item.get(key).and_then(ContentNode::key_text) else {
						continue;
					};
					walk(
						item,
						item_schema,
						&path.property(name.clone()).filter(key, value.clone()),
						&relative.property(name.clone()).filter(key, value),
						uid,
						visitor,
					);
				}
			}
			_ => {}
		}
	}
}
