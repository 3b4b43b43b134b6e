use crate::ContentNode;

/// Replace every scalar leaf of `metadata` equal to `placeholder` with
/// `body`.
///
/// Returns the rewritten tree and whether any leaf used the placeholder. The
/// caller falls back to storing the body in the canonical body property when
/// none did, see [`apply_body`].
pub fn substitute(metadata: &ContentNode, body: &str, placeholder: &str) -> (ContentNode, bool) {
	let mut normalized = metadata.clone();
	let used = replace_placeholder(&mut normalized, body, placeholder);

	(normalized, used)
}

fn replace_placeholder(node: &mut ContentNode, body: &str, placeholder: &str) -> bool {
	match node {
		ContentNode::Scalar(_) => {
			if node.as_str() == Some(placeholder) {
				*node = ContentNode::string(body);
				true
			} else {
				false
			}
		}
		ContentNode::Object(map) => {
			let mut used = false;
			for (_, value) in map.iter_mut() {
				used |= replace_placeholder(value, body, placeholder);
			}
			used
		}
		ContentNode::Array(items) => {
			let mut used = false;
			for item in items.iter_mut() {
				used |= replace_placeholder(item, body, placeholder);
			}
			used
		}
	}
}

/// Substitute the placeholder and, when no field used it, store a non-blank
/// body in `body_property` so it is never dropped.
pub fn apply_body(
	metadata: &ContentNode,
	body: &str,
	placeholder: &str,
	body_property: &str,
) -> (ContentNode, bool) {
	let (mut normalized, used) = substitute(metadata, body, placeholder);

	if !used && !body.trim().is_empty() {
		if !matches!(normalized, ContentNode::Object(_)) {
			normalized = ContentNode::object();
		}
		if let Some(map) = normalized.as_object_mut() {
			map.insert(body_property, ContentNode::string(body));
		}
	}

	(normalized, used)
}
