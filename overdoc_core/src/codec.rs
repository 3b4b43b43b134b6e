use crate::ContentNode;
use crate::OverdocError;
use crate::OverdocResult;

/// The comment line that names the document type of a YAML base document.
pub const YAML_MIME_PREFIX: &str = "### YamlMime:";

/// Converts between structured text and [`ContentNode`] trees.
pub trait ContentCodec: Send + Sync {
	/// Parse `text`. `file` is only used in error messages.
	fn deserialize(&self, text: &str, file: &str) -> OverdocResult<ContentNode>;

	fn serialize(&self, node: &ContentNode) -> OverdocResult<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl ContentCodec for YamlCodec {
	fn deserialize(&self, text: &str, file: &str) -> OverdocResult<ContentNode> {
		if text.trim().is_empty() {
			return Ok(ContentNode::null());
		}

		let value: serde_yaml_ng::Value =
			serde_yaml_ng::from_str(text).map_err(|e| OverdocError::Yaml {
				file: file.to_string(),
				reason: e.to_string(),
			})?;

		Ok(value.into())
	}

	fn serialize(&self, node: &ContentNode) -> OverdocResult<String> {
		serde_yaml_ng::to_string(node).map_err(|e| OverdocError::Yaml {
			file: String::new(),
			reason: e.to_string(),
		})
	}
}

/// Read the document type from a leading `### YamlMime:<Type>` line.
pub fn read_mime_header(text: &str) -> Option<&str> {
	let first_line = text.trim_start_matches('\u{feff}').lines().next()?;
	let document_type = first_line.trim().strip_prefix(YAML_MIME_PREFIX)?.trim();

	(!document_type.is_empty()).then_some(document_type)
}

/// Serialize a document with its YAML MIME header.
pub fn serialize_document(
	codec: &dyn ContentCodec,
	document_type: &str,
	node: &ContentNode,
) -> OverdocResult<String> {
	Ok(format!(
		"{YAML_MIME_PREFIX}{document_type}\n{}",
		codec.serialize(node)?
	))
}
