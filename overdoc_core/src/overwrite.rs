use crate::ContentNode;
use crate::OverdocError;
use crate::OverdocResult;

/// Which authoring format an overwrite came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteKind {
	/// A markdown file of `---` YAML headers, each followed by a body.
	Classic,
	/// A section of a markdown fragment file.
	Fragment,
}

/// Hand-written content that amends the document declaring `uid`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverwriteDocument {
	pub uid: String,
	/// The YAML header, including the `uid` itself.
	pub metadata: ContentNode,
	/// Raw markdown following the header.
	pub body: String,
	pub file: String,
	/// 1-indexed line of the header.
	pub line: usize,
	pub kind: OverwriteKind,
}

struct PendingSection<'a> {
	uid: String,
	metadata: ContentNode,
	line: usize,
	body: Vec<&'a str>,
}

impl PendingSection<'_> {
	fn finish(self, file: &str) -> OverwriteDocument {
		let body = self.body.join("\n");

		OverwriteDocument {
			uid: self.uid,
			metadata: self.metadata,
			body: body.trim_matches(['\n', '\r']).to_string(),
			file: file.to_string(),
			line: self.line,
			kind: OverwriteKind::Classic,
		}
	}
}

fn is_fence(line: &str) -> bool {
	line.trim_end() == "---"
}

/// Parse a classic overwrite file.
///
/// ```md
/// ---
/// uid: System.String
/// remarks: *content
/// ---
///
/// Markdown body.
/// ```
///
/// A `---` block only opens a section when it holds a YAML mapping with a
/// string `uid`; any other block is part of the current body, so thematic
/// breaks around prose are kept. A block with a top-level `uid:` line that is
/// not valid YAML is a malformed header and an error. Text before the first
/// section is ignored.
pub fn parse_overwrite_file(
	text: &str,
	file: &str,
	placeholder: &str,
) -> OverdocResult<Vec<OverwriteDocument>> {
	let lines: Vec<&str> = text.lines().collect();
	let mut documents = vec![];
	let mut current: Option<PendingSection> = None;
	let mut index = 0;

	while index < lines.len() {
		let close = if is_fence(lines[index]) {
			(index + 1..lines.len()).find(|&i| is_fence(lines[i]))
		} else {
			None
		};

		if let Some(close) = close {
			let yaml = quote_placeholder(&lines[index + 1..close], placeholder);
			if let Some((uid, metadata)) = parse_header(&yaml, file, index + 1)? {
				if let Some(section) = current.take() {
					documents.push(section.finish(file));
				}
				current = Some(PendingSection {
					uid,
					metadata,
					line: index + 1,
					body: vec![],
				});
				index = close + 1;
				continue;
			}
		}

		if let Some(section) = current.as_mut() {
			section.body.push(lines[index]);
		}
		index += 1;
	}

	if let Some(section) = current {
		documents.push(section.finish(file));
	}

	Ok(documents)
}

fn parse_header(
	yaml: &str,
	file: &str,
	line: usize,
) -> OverdocResult<Option<(String, ContentNode)>> {
	let value: serde_yaml_ng::Value = match serde_yaml_ng::from_str(yaml) {
		Ok(value) => value,
		Err(e) if declares_uid(yaml) => {
			return Err(OverdocError::Yaml {
				file: format!("{file}:{line}"),
				reason: e.to_string(),
			});
		}
		Err(e) => {
			tracing::debug!(file, line, "`---` block is not a header: {e}");
			return Ok(None);
		}
	};
	let metadata = ContentNode::from(value);

	let Some(uid) = metadata.get("uid").and_then(ContentNode::as_str) else {
		return Ok(None);
	};

	Ok(Some((uid.to_string(), metadata)))
}

fn declares_uid(yaml: &str) -> bool {
	yaml.lines().any(|line| line.starts_with("uid:"))
}

/// A bare `*content` reads as a YAML alias, so placeholder values are quoted
/// before parsing.
fn quote_placeholder(lines: &[&str], placeholder: &str) -> String {
	lines
		.iter()
		.map(|line| {
			let trimmed = line.trim_end();
			let Some(prefix) = trimmed.strip_suffix(placeholder) else {
				return (*line).to_string();
			};

			if prefix.ends_with(": ") || prefix.trim_start() == "-" || prefix.ends_with("- ") {
				format!("{prefix}\"{placeholder}\"")
			} else {
				(*line).to_string()
			}
		})
		.collect::<Vec<_>>()
		.join("\n")
}
