//! Markdown fragment files: one markdown file holding overwrite content for
//! every uid of a base document.
//!
//! ````md
//! # `System.String`
//!
//! ```yaml
//! isDeprecated: false
//! ```
//!
//! ## `remarks`
//!
//! Strings are immutable.
//!
//! ## `syntax/parameters[id="value"]/description`
//!
//! The value to wrap.
//! ````
//!
//! An H1 wrapped in backticks opens the section of a uid. A YAML code block
//! directly below it holds metadata. Every H2 names a property by its path
//! relative to the object declaring the uid, and its body runs to the next
//! H1 or H2.

use markdown::ParseOptions;
use markdown::mdast::Heading;
use markdown::mdast::Node;
use markdown::to_mdast;

use crate::BuildDiagnostic;
use crate::ContentNode;
use crate::ContentType;
use crate::DiagnosticKind;
use crate::OPath;
use crate::OverdocError;
use crate::OverdocResult;
use crate::OverwriteDocument;
use crate::OverwriteKind;
use crate::Schema;

pub use iterator::*;

mod iterator;

/// The overwrite content of one uid in a fragment file.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
	pub uid: String,
	/// 1-indexed line of the H1.
	pub line: usize,
	pub metadata: Option<ContentNode>,
	pub properties: Vec<FragmentProperty>,
}

impl Fragment {
	pub fn property(&self, path: &OPath) -> Option<&FragmentProperty> {
		self.properties.iter().find(|property| &property.path == path)
	}

	/// Whether the fragment supplies `path`, either as an H2 section or in its
	/// YAML metadata.
	pub fn provides(&self, path: &OPath) -> bool {
		self.property(path).is_some()
			|| self
				.metadata
				.as_ref()
				.is_some_and(|metadata| path.find_value(metadata).is_some())
	}
}

/// One H2 section of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentProperty {
	pub path: OPath,
	/// The raw markdown body.
	pub text: String,
	pub line: usize,
}

/// A parsed fragment file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentFile {
	pub file: String,
	pub fragments: Vec<Fragment>,
}

impl FragmentFile {
	pub fn get(&self, uid: &str) -> Option<&Fragment> {
		self.fragments.iter().find(|fragment| fragment.uid == uid)
	}
}

struct OpenProperty {
	path: OPath,
	line: usize,
	body_start: usize,
}

struct FragmentParser<'a> {
	text: &'a str,
	file: &'a str,
	fragments: Vec<Fragment>,
	property: Option<OpenProperty>,
	/// Whether anything other than a YAML block followed the current H1.
	seen_content: bool,
}

impl FragmentParser<'_> {
	fn error(&self, line: usize, reason: impl Into<String>) -> OverdocError {
		OverdocError::InvalidFragment {
			file: self.file.to_string(),
			line,
			reason: reason.into(),
		}
	}

	fn close_property(&mut self, end: usize) {
		let Some(open) = self.property.take() else {
			return;
		};
		let text = self.text[open.body_start..end]
			.trim_matches(['\n', '\r'])
			.trim_end()
			.to_string();

		if let Some(fragment) = self.fragments.last_mut() {
			fragment.properties.push(FragmentProperty {
				path: open.path,
				text,
				line: open.line,
			});
		}
	}

	fn visit(&mut self, node: &Node) -> OverdocResult<()> {
		let Some(position) = node.position() else {
			return Ok(());
		};
		let line = position.start.line;

		match node {
			Node::Heading(heading) if heading.depth == 1 => {
				self.close_property(position.start.offset);
				let uid = heading_text(heading);
				if uid.is_empty() {
					return Err(self.error(line, "uid heading is empty"));
				}
				if self.fragments.iter().any(|fragment| fragment.uid == uid) {
					return Err(self.error(line, format!("uid `{uid}` appears more than once")));
				}

				self.fragments.push(Fragment {
					uid,
					line,
					metadata: None,
					properties: vec![],
				});
				self.seen_content = false;
			}
			Node::Heading(heading) if heading.depth == 2 => {
				self.close_property(position.start.offset);
				let Some(fragment) = self.fragments.last() else {
					return Err(self.error(line, "property heading before any uid heading"));
				};

				let path_text = heading_text(heading);
				let path = OPath::parse(&path_text)
					.map_err(|e| self.error(line, e.to_string()))?;
				if path.is_root() {
					return Err(self.error(line, "property heading is empty"));
				}
				if fragment.property(&path).is_some() {
					return Err(self.error(
						line,
						format!("property `{path}` of uid `{}` appears more than once", fragment.uid),
					));
				}

				self.property = Some(OpenProperty {
					path,
					line,
					body_start: position.end.offset,
				});
				self.seen_content = true;
			}
			Node::Code(code)
				if self.property.is_none()
					&& !self.seen_content
					&& matches!(code.lang.as_deref(), Some("yaml" | "yml")) =>
			{
				let value: serde_yaml_ng::Value =
					serde_yaml_ng::from_str(&code.value).map_err(|e| OverdocError::Yaml {
						file: format!("{}:{line}", self.file),
						reason: e.to_string(),
					})?;
				if let Some(fragment) = self.fragments.last_mut() {
					fragment.metadata = Some(value.into());
				}
				self.seen_content = true;
			}
			_ => self.seen_content = true,
		}

		Ok(())
	}
}

/// Parse a markdown fragment file.
pub fn parse_fragments(text: &str, file: &str) -> OverdocResult<FragmentFile> {
	let mdast = to_mdast(text, &ParseOptions::gfm())
		.map_err(|e| OverdocError::Markdown(e.to_string()))?;

	let mut parser = FragmentParser {
		text,
		file,
		fragments: vec![],
		property: None,
		seen_content: false,
	};

	if let Some(children) = mdast.children() {
		for child in children {
			parser.visit(child)?;
		}
	}
	parser.close_property(text.len());

	Ok(FragmentFile {
		file: file.to_string(),
		fragments: parser.fragments,
	})
}

fn heading_text(heading: &Heading) -> String {
	fn collect(node: &Node, text: &mut String) {
		match node {
			Node::InlineCode(code) => text.push_str(&code.value),
			Node::Text(value) => text.push_str(&value.value),
			_ => {
				if let Some(children) = node.children() {
					for child in children {
						collect(child, text);
					}
				}
			}
		}
	}

	let mut text = String::new();
	for child in &heading.children {
		collect(child, &mut text);
	}

	text.trim().to_string()
}

struct FragmentValidator<'a> {
	fragments: &'a FragmentFile,
	editable_tag: &'a str,
	document_file: &'a str,
	seen_uids: Vec<String>,
	diagnostics: Vec<BuildDiagnostic>,
}

impl FragmentValidator<'_> {
	fn warn(&mut self, diagnostic: BuildDiagnostic) {
		diagnostic.log();
		self.diagnostics.push(diagnostic);
	}
}

impl FragmentVisitor for FragmentValidator<'_> {
	fn on_uid(&mut self, _schema: &Schema, _content: &ContentNode, _path: &OPath, uid: &str) {
		self.seen_uids.push(uid.to_string());

		if self.fragments.get(uid).is_none() {
			let diagnostic = BuildDiagnostic::warning(
				DiagnosticKind::MissingFragmentUid {
					uid: uid.to_string(),
				},
				self.fragments.file.clone(),
			)
			.with_uid(uid);
			self.warn(diagnostic);
		}
	}

	fn on_property(
		&mut self,
		name: &str,
		schema: &Schema,
		_value: Option<&ContentNode>,
		parent_path: &OPath,
		uid: &str,
	) {
		if !schema.has_tag(self.editable_tag) {
			return;
		}
		let Some(fragment) = self.fragments.get(uid) else {
			return;
		};

		let path = parent_path.property(name);
		if !fragment.provides(&path) {
			let diagnostic = BuildDiagnostic::warning(
				DiagnosticKind::MissingFragmentProperty {
					uid: uid.to_string(),
					path: path.to_string(),
				},
				self.fragments.file.clone(),
			)
			.with_uid(uid)
			.with_line(fragment.line);
			self.warn(diagnostic);
		}
	}
}

/// Check a fragment file against the document it amends. Every gap is a
/// warning that is logged and returned. Nothing here fails the build.
pub fn validate_fragments(
	content: &ContentNode,
	schema: &Schema,
	fragments: &FragmentFile,
	editable_tag: &str,
	document_file: &str,
) -> Vec<BuildDiagnostic> {
	let mut validator = FragmentValidator {
		fragments,
		editable_tag,
		document_file,
		seen_uids: vec![],
		diagnostics: vec![],
	};
	iterate_fragments(content, schema, &mut validator);

	for fragment in &fragments.fragments {
		if !validator.seen_uids.contains(&fragment.uid) {
			let diagnostic = BuildDiagnostic::warning(
				DiagnosticKind::UnknownFragmentUid {
					uid: fragment.uid.clone(),
				},
				fragments.file.clone(),
			)
			.with_uid(fragment.uid.clone())
			.with_line(fragment.line);
			validator.warn(diagnostic);
		}
	}

	tracing::debug!(
		file = validator.document_file,
		warnings = validator.diagnostics.len(),
		"validated markdown fragments"
	);

	validator.diagnostics
}

/// Build one overwrite document per fragment. Each H2 body is stored at its
/// path inside the fragment's metadata.
pub fn synthesize_fragment_overwrites(
	fragments: &FragmentFile,
) -> OverdocResult<Vec<OverwriteDocument>> {
	let mut documents = vec![];

	for fragment in &fragments.fragments {
		let mut metadata = match &fragment.metadata {
			Some(metadata @ ContentNode::Object(_)) => metadata.clone(),
			_ => ContentNode::object(),
		};

		for property in &fragment.properties {
			property
				.path
				.set_in(&mut metadata, ContentNode::string(property.text.clone()))
				.map_err(|e| {
					OverdocError::InvalidFragment {
						file: fragments.file.clone(),
						line: property.line,
						reason: e.to_string(),
					}
				})?;
		}

		documents.push(OverwriteDocument {
			uid: fragment.uid.clone(),
			metadata,
			body: String::new(),
			file: fragments.file.clone(),
			line: fragment.line,
			kind: OverwriteKind::Fragment,
		});
	}

	Ok(documents)
}

struct SkeletonSection {
	uid: String,
	/// Editable plain values, stored into a YAML block.
	values: Vec<(OPath, ContentNode)>,
	/// Editable markdown properties and their current text.
	properties: Vec<(OPath, String)>,
}

struct SkeletonBuilder<'a> {
	editable_tag: &'a str,
	sections: Vec<SkeletonSection>,
}

impl FragmentVisitor for SkeletonBuilder<'_> {
	fn on_uid(&mut self, _schema: &Schema, _content: &ContentNode, _path: &OPath, uid: &str) {
		self.sections.push(SkeletonSection {
			uid: uid.to_string(),
			values: vec![],
			properties: vec![],
		});
	}

	fn on_property(
		&mut self,
		name: &str,
		schema: &Schema,
		value: Option<&ContentNode>,
		parent_path: &OPath,
		_uid: &str,
	) {
		if !schema.has_tag(self.editable_tag) {
			return;
		}
		let Some(section) = self.sections.last_mut() else {
			return;
		};

		let path = parent_path.property(name);
		if schema.content_type == ContentType::Markdown {
			let text = value.and_then(ContentNode::as_str).unwrap_or_default();
			section.properties.push((path, text.to_string()));
		} else if let Some(value @ ContentNode::Scalar(_)) = value {
			section.values.push((path, value.clone()));
		}
	}
}

/// Render a starter fragment file for a document: a section per uid with a
/// YAML block of its editable plain values and an H2 per editable markdown
/// property holding its current text.
pub fn generate_fragment_skeleton(
	content: &ContentNode,
	schema: &Schema,
	editable_tag: &str,
) -> OverdocResult<String> {
	let mut builder = SkeletonBuilder {
		editable_tag,
		sections: vec![],
	};
	iterate_fragments(content, schema, &mut builder);

	let mut output = String::new();
	for section in builder.sections {
		output.push_str(&format!("# `{}`\n\n", section.uid));

		if !section.values.is_empty() {
			let mut metadata = ContentNode::object();
			for (path, value) in section.values {
				path.set_in(&mut metadata, value)?;
			}
			let yaml = serde_yaml_ng::to_string(&metadata).map_err(|e| {
				OverdocError::Yaml {
					file: section.uid.clone(),
					reason: e.to_string(),
				}
			})?;
			output.push_str(&format!("```yaml\n{yaml}```\n\n"));
		}

		for (path, text) in section.properties {
			let heading = path.to_string();
			output.push_str(&format!("## `{}`\n\n", heading.trim_start_matches('/')));
			if !text.is_empty() {
				output.push_str(&text);
				output.push_str("\n\n");
			}
		}
	}

	Ok(output)
}
