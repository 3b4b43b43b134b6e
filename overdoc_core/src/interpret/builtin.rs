use crate::ContentNode;
use crate::ContentType;
use crate::LinkSource;
use crate::OPath;
use crate::OverdocError;
use crate::OverdocResult;
use crate::ProcessContext;
use crate::Schema;
use crate::SchemaKind;
use crate::UidDefinition;
use crate::XrefRecord;
use crate::files::is_relative_link;
use crate::interpret::Interpreter;
use crate::xref_anchor;

fn content_type_mismatch(
	schema: &Schema,
	value: &ContentNode,
	path: &OPath,
	context: &ProcessContext,
	expected: &str,
) -> OverdocError {
	OverdocError::ContentTypeMismatch {
		file: context.source_file.clone(),
		uid: context.uid.clone(),
		path: path.to_string(),
		content_type: schema.content_type.to_string(),
		expected: expected.to_string(),
		found: value.kind_name().to_string(),
	}
}

fn expect_string<'v>(
	schema: &Schema,
	value: &'v ContentNode,
	path: &OPath,
	context: &ProcessContext,
) -> OverdocResult<&'v str> {
	value
		.as_str()
		.ok_or_else(|| content_type_mismatch(schema, value, path, context, "string"))
}

/// Replaces a `file` field with the text of the file it names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileIncludeInterpreter;

impl Interpreter for FileIncludeInterpreter {
	fn name(&self) -> &'static str {
		"file_include"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.content_type == ContentType::FileInclude
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let target = expect_string(schema, value, path, context)?;
		if !is_relative_link(target) {
			return Ok(());
		}

		let resolved = context
			.services
			.files
			.resolve_relative(&context.source_file, target);
		let text = context.services.files.read_text(&resolved)?;

		context.file_dependencies.insert(resolved);
		*value = ContentNode::string(text);

		Ok(())
	}
}

/// Renders markdown fields to HTML and registers the links they contain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownInterpreter;

impl Interpreter for MarkdownInterpreter {
	fn name(&self) -> &'static str {
		"markdown"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.content_type == ContentType::Markdown
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let markdown = expect_string(schema, value, path, context)?;
		let rendered = context
			.services
			.markdown
			.render(markdown, &context.source_file)?;

		for link in rendered.linked_files {
			context.add_linked_file(link);
		}
		for link in rendered.linked_uids {
			context.add_linked_uid(link);
		}

		*value = ContentNode::string(rendered.html);

		Ok(())
	}
}

/// Resolves relative `href` fields against the source file and registers
/// them as linked files. `xref:` hrefs are registered as linked uids.
#[derive(Debug, Clone, Copy, Default)]
pub struct HrefInterpreter;

impl Interpreter for HrefInterpreter {
	fn name(&self) -> &'static str {
		"href"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.content_type == ContentType::Href
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let href = expect_string(schema, value, path, context)?.trim();

		if let Some(uid) = href.strip_prefix("xref:") {
			let link = LinkSource {
				target: uid.to_string(),
				source_file: context.source_file.clone(),
				line: None,
			};
			context.add_linked_uid(link);
			return Ok(());
		}

		if !is_relative_link(href) {
			return Ok(());
		}

		let resolved = context
			.services
			.files
			.resolve_relative(&context.source_file, href);
		let target = resolved
			.split(['#', '?'])
			.next()
			.unwrap_or_default()
			.to_string();

		if !target.is_empty() {
			let link = LinkSource {
				target,
				source_file: context.source_file.clone(),
				line: None,
			};
			context.add_linked_file(link);
		}
		*value = ContentNode::string(resolved);

		Ok(())
	}
}

/// Registers `xref` fields as linked uids.
#[derive(Debug, Clone, Copy, Default)]
pub struct XrefInterpreter;

impl Interpreter for XrefInterpreter {
	fn name(&self) -> &'static str {
		"xref"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.content_type == ContentType::Xref
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let uid = expect_string(schema, value, path, context)?.trim();
		if uid.is_empty() {
			return Ok(());
		}

		let link = LinkSource {
			target: uid.to_string(),
			source_file: context.source_file.clone(),
			line: None,
		};
		context.add_linked_uid(link);

		Ok(())
	}
}

/// Registers `uid` fields as uid definitions of the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct UidInterpreter;

impl Interpreter for UidInterpreter {
	fn name(&self) -> &'static str {
		"uid"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.content_type == ContentType::Uid
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let uid = expect_string(schema, value, path, context)?.to_string();
		let definition = UidDefinition {
			uid,
			address: path.clone(),
			file: context.file.clone(),
			line: None,
			column: None,
		};
		context.define_uid(definition);

		Ok(())
	}
}

/// Checks that content synthesized from markdown fragments has the shape its
/// schema declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentShapeInterpreter;

impl Interpreter for FragmentShapeInterpreter {
	fn name(&self) -> &'static str {
		"fragment_shape"
	}

	fn can_interpret(&self, _schema: &Schema) -> bool {
		true
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let matches = match (schema.kind, &*value) {
			(_, node) if node.is_null() => true,
			(SchemaKind::Object, ContentNode::Object(_))
			| (SchemaKind::Array, ContentNode::Array(_))
			| (SchemaKind::Scalar, ContentNode::Scalar(_)) => true,
			_ => false,
		};

		if !matches {
			return Err(content_type_mismatch(
				schema,
				value,
				path,
				context,
				&schema.kind.to_string(),
			));
		}

		if schema.content_type == ContentType::Markdown {
			expect_string(schema, value, path, context)?;
		}

		Ok(())
	}
}

/// Builds the cross-reference record of every object that declares a uid.
#[derive(Debug, Clone, Copy, Default)]
pub struct XrefPropertiesInterpreter;

impl Interpreter for XrefPropertiesInterpreter {
	fn name(&self) -> &'static str {
		"xref_properties"
	}

	fn can_interpret(&self, schema: &Schema) -> bool {
		schema.kind == SchemaKind::Object && schema.uid_property().is_some()
	}

	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		let Some(uid_property) = schema.uid_property() else {
			return Ok(());
		};
		let Some(uid) = value.get(uid_property).and_then(ContentNode::as_str) else {
			return Ok(());
		};

		let href = if path.is_root() {
			context.file.clone()
		} else {
			format!("{}#{}", context.file, xref_anchor(uid))
		};
		let mut record = XrefRecord::new(uid, href);

		for property in &schema.xref_properties {
			if let Some(property_value) = value.get(property) {
				record.set_property(property, property_value);
			}
		}

		context.xrefs.push(record);

		Ok(())
	}
}
