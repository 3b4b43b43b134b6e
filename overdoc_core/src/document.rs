use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::BuildDiagnostic;
use crate::ContentNode;
use crate::DocumentSchema;
use crate::LinkSource;
use crate::ProcessContext;
use crate::UidDefinition;
use crate::XrefRecord;

/// A loaded base document. It exclusively owns its content tree.
#[derive(Debug, Clone)]
pub struct Document {
	pub file: String,
	pub schema: Arc<DocumentSchema>,
	pub content: ContentNode,
	/// Everything discovered while loading and amending the document.
	pub state: ProcessContext,
}

impl Document {
	pub fn document_type(&self) -> &str {
		&self.schema.title
	}

	pub fn uids(&self) -> &[UidDefinition] {
		&self.state.uid_definitions
	}

	pub fn uid(&self, uid: &str) -> Option<&UidDefinition> {
		self.uids().iter().find(|definition| definition.uid == uid)
	}

	pub fn xrefs(&self) -> &[XrefRecord] {
		&self.state.xrefs
	}

	pub fn linked_files(&self) -> &BTreeSet<String> {
		&self.state.linked_files
	}

	pub fn linked_uids(&self) -> &BTreeSet<String> {
		&self.state.linked_uids
	}

	pub fn link_sources(&self) -> &BTreeMap<String, Vec<LinkSource>> {
		&self.state.link_sources
	}

	pub fn file_dependencies(&self) -> &BTreeSet<String> {
		&self.state.file_dependencies
	}

	pub fn diagnostics(&self) -> &[BuildDiagnostic] {
		&self.state.diagnostics
	}
}
