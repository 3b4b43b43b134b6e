use crate::ContentNode;
use crate::MergeType;
use crate::OPath;
use crate::OverdocError;
use crate::OverdocResult;
use crate::Schema;
use crate::SchemaKind;

/// Layer `overwrite` onto `source` in place.
///
/// The rule is chosen by the schema's merge type, then by its kind:
///
/// - scalars are replaced whenever an overwrite is present, including an
///   explicit null
/// - objects merge property by property; properties missing from the
///   overwrite are kept and properties unknown to the schema are replaced
///   wholesale
/// - arrays with a merge key match elements on the key, recurse into matches
///   and append the rest after the existing elements
/// - arrays without a merge key are replaced wholesale
///
/// `uid` and `path` only label errors. A shape mismatch fails with
/// [`OverdocError::MergeShape`] and may leave `source` partially merged, so
/// callers merge into a copy they can discard.
pub fn merge(
	source: &mut ContentNode,
	overwrite: Option<&ContentNode>,
	uid: &str,
	path: &OPath,
	schema: &Schema,
) -> OverdocResult<()> {
	let Some(overwrite) = overwrite else {
		return Ok(());
	};

	match schema.merge_type {
		MergeType::Ignore => return Ok(()),
		MergeType::Replace => {
			*source = overwrite.clone();
			return Ok(());
		}
		MergeType::Merge | MergeType::Key => {}
	}

	// An explicit null deletes the value whatever its kind.
	if overwrite.is_null() {
		*source = ContentNode::null();
		return Ok(());
	}

	match schema.kind {
		SchemaKind::Scalar => {
			if !matches!(overwrite, ContentNode::Scalar(_)) {
				return Err(shape_error(uid, path, schema, overwrite));
			}
			*source = overwrite.clone();
		}
		SchemaKind::Object => merge_object(source, overwrite, uid, path, schema)?,
		SchemaKind::Array => merge_array(source, overwrite, uid, path, schema)?,
	}

	Ok(())
}

fn merge_object(
	source: &mut ContentNode,
	overwrite: &ContentNode,
	uid: &str,
	path: &OPath,
	schema: &Schema,
) -> OverdocResult<()> {
	let ContentNode::Object(overwrite_map) = overwrite else {
		return Err(shape_error(uid, path, schema, overwrite));
	};

	let ContentNode::Object(source_map) = source else {
		*source = overwrite.clone();
		return Ok(());
	};

	for (name, value) in overwrite_map.iter() {
		let Some(child_schema) = schema.property(name) else {
			source_map.insert(name.clone(), value.clone());
			continue;
		};

		if let Some(existing) = source_map.get_mut(name) {
			merge(existing, Some(value), uid, &path.property(name), child_schema)?;
		} else if child_schema.merge_type != MergeType::Ignore {
			source_map.insert(name.clone(), value.clone());
		}
	}

	Ok(())
}

fn merge_array(
	source: &mut ContentNode,
	overwrite: &ContentNode,
	uid: &str,
	path: &OPath,
	schema: &Schema,
) -> OverdocResult<()> {
	let ContentNode::Array(overwrite_items) = overwrite else {
		return Err(shape_error(uid, path, schema, overwrite));
	};

	let Some(key) = schema.merge_key() else {
		*source = overwrite.clone();
		return Ok(());
	};

	let ContentNode::Array(source_items) = source else {
		*source = overwrite.clone();
		return Ok(());
	};

	let any = Schema::scalar();
	let item_schema = schema.items.as_deref().unwrap_or(&any);

	for item in overwrite_items {
		let Some(value) = item.get(key).and_then(ContentNode::key_text) else {
			source_items.push(item.clone());
			continue;
		};

		match source_items
			.iter_mut()
			.find(|existing| existing.has_key_value(key, &value))
		{
			Some(existing) => {
				merge(existing, Some(item), uid, &path.filter(key, value.clone()), item_schema)?;
			}
			None => source_items.push(item.clone()),
		}
	}

	Ok(())
}

fn shape_error(uid: &str, path: &OPath, schema: &Schema, overwrite: &ContentNode) -> OverdocError {
	OverdocError::MergeShape {
		uid: uid.to_string(),
		path: path.to_string(),
		expected: schema.kind.to_string(),
		found: overwrite.kind_name().to_string(),
	}
}
