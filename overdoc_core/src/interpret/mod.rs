//! The schema processor and its pluggable interpreters.
//!
//! A [`SchemaProcessor`] walks a content tree alongside its schema. At every
//! node it first walks the children, then runs each registered
//! [`Interpreter`] that can handle the node's schema, in registration order.
//! Different ordered subsets of interpreters form the preset pipelines in
//! [`Pipelines`].

use std::sync::Arc;

use crate::ContentNode;
use crate::OPath;
use crate::OverdocResult;
use crate::ProcessContext;
use crate::Schema;
use crate::validate::element_path;

pub use builtin::*;

mod builtin;

/// Gives meaning to schema-tagged content.
///
/// Interpreters are stateless between calls. Everything they discover goes
/// into the [`ProcessContext`].
pub trait Interpreter: Send + Sync {
	fn name(&self) -> &'static str;

	fn can_interpret(&self, schema: &Schema) -> bool;

	/// Rewrite `value` in place and/or record findings in `context`. `path`
	/// is the address of `value` inside the document.
	fn interpret(
		&self,
		schema: &Schema,
		value: &mut ContentNode,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()>;
}

/// An ordered list of interpreters applied by walking content with its
/// schema.
#[derive(Clone, Default)]
pub struct SchemaProcessor {
	interpreters: Vec<Arc<dyn Interpreter>>,
}

impl std::fmt::Debug for SchemaProcessor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

impl SchemaProcessor {
	pub fn new(interpreters: Vec<Arc<dyn Interpreter>>) -> Self {
		Self { interpreters }
	}

	/// Append an interpreter. It runs after every interpreter already
	/// registered.
	pub fn with(mut self, interpreter: impl Interpreter + 'static) -> Self {
		self.interpreters.push(Arc::new(interpreter));
		self
	}

	pub fn names(&self) -> Vec<&'static str> {
		self.interpreters
			.iter()
			.map(|interpreter| interpreter.name())
			.collect()
	}

	/// Include files, render markdown, resolve hrefs and register links.
	pub fn render() -> Self {
		Self::default()
			.with(FileIncludeInterpreter)
			.with(MarkdownInterpreter)
			.with(HrefInterpreter)
			.with(XrefInterpreter)
	}

	/// Normalize classic overwrite content before merging. Also registers
	/// uids declared inside the overwrite.
	pub fn overwrite() -> Self {
		Self::render().with(UidInterpreter)
	}

	/// Normalize overwrite content synthesized from markdown fragments.
	pub fn fragments() -> Self {
		Self::default()
			.with(FragmentShapeInterpreter)
			.with(FileIncludeInterpreter)
			.with(MarkdownInterpreter)
			.with(HrefInterpreter)
			.with(XrefInterpreter)
			.with(UidInterpreter)
	}

	/// Only recompute cross-reference records.
	pub fn xref_export() -> Self {
		Self::default().with(XrefPropertiesInterpreter)
	}

	/// Process a copy of `content` found at `base_path` and return it. The
	/// input is never modified, so a failure leaves nothing half-processed.
	pub fn process(
		&self,
		content: &ContentNode,
		schema: &Schema,
		context: &mut ProcessContext,
		base_path: &OPath,
	) -> OverdocResult<ContentNode> {
		let mut processed = content.clone();
		self.walk(&mut processed, schema, base_path, context)?;

		Ok(processed)
	}

	fn walk(
		&self,
		value: &mut ContentNode,
		schema: &Schema,
		path: &OPath,
		context: &mut ProcessContext,
	) -> OverdocResult<()> {
		if value.is_null() {
			return Ok(());
		}

		match value {
			ContentNode::Object(map) => {
				for (name, child) in map.iter_mut() {
					if let Some(child_schema) = schema.property(name) {
						self.walk(child, child_schema, &path.property(name.clone()), context)?;
					}
				}
			}
			ContentNode::Array(items) => {
				if let Some(item_schema) = schema.items.as_deref() {
					let merge_key = schema.merge_key();
					for (index, item) in items.iter_mut().enumerate() {
						let item_path = element_path(path, merge_key, item, index);
						self.walk(item, item_schema, &item_path, context)?;
					}
				}
			}
			ContentNode::Scalar(_) => {}
		}

		for interpreter in &self.interpreters {
			if interpreter.can_interpret(schema) {
				interpreter.interpret(schema, value, path, context)?;
			}
		}

		Ok(())
	}
}

/// The preset pipelines, created once and injected into the
/// [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct Pipelines {
	/// Run over base documents when they are loaded.
	pub render: SchemaProcessor,
	/// Normalize classic overwrite documents.
	pub overwrite: SchemaProcessor,
	/// Normalize overwrites synthesized from markdown fragments.
	pub fragments: SchemaProcessor,
	/// Recompute cross-reference records.
	pub xref_export: SchemaProcessor,
}

impl Default for Pipelines {
	fn default() -> Self {
		Self {
			render: SchemaProcessor::render(),
			overwrite: SchemaProcessor::overwrite(),
			fragments: SchemaProcessor::fragments(),
			xref_export: SchemaProcessor::xref_export(),
		}
	}
}
