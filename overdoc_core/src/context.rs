use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::BuildDiagnostic;
use crate::ContentCodec;
use crate::DiagnosticKind;
use crate::FileLayer;
use crate::GfmMarkdownService;
use crate::LinkSource;
use crate::MarkdownService;
use crate::UidDefinition;
use crate::XrefRecord;
use crate::YamlCodec;
use crate::merge_xref_records;

/// The external collaborators used while processing content.
#[derive(Clone)]
pub struct Services {
	pub markdown: Arc<dyn MarkdownService>,
	pub files: Arc<dyn FileLayer>,
	pub codec: Arc<dyn ContentCodec>,
}

impl Services {
	/// GFM markdown and the YAML codec over the given file layer.
	pub fn new(files: impl FileLayer + 'static) -> Self {
		Self {
			markdown: Arc::new(GfmMarkdownService),
			files: Arc::new(files),
			codec: Arc::new(YamlCodec),
		}
	}

	pub fn with_markdown(mut self, markdown: impl MarkdownService + 'static) -> Self {
		self.markdown = Arc::new(markdown);
		self
	}

	pub fn with_codec(mut self, codec: impl ContentCodec + 'static) -> Self {
		self.codec = Arc::new(codec);
		self
	}
}

impl std::fmt::Debug for Services {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Services").finish_non_exhaustive()
	}
}

/// What one processing pass over a document discovered. Merged into the
/// owning document when the pass succeeds and dropped otherwise.
#[derive(Debug, Clone)]
pub struct ProcessContext {
	pub services: Services,
	/// The document being built. Cross-reference hrefs point here.
	pub file: String,
	/// The file the processed text came from. Relative links resolve against
	/// it. Differs from `file` when processing overwrite content.
	pub source_file: String,
	/// The uid being processed, for diagnostics.
	pub uid: Option<String>,
	pub linked_files: BTreeSet<String>,
	pub linked_uids: BTreeSet<String>,
	/// Where each linked uid was referenced.
	pub link_sources: BTreeMap<String, Vec<LinkSource>>,
	pub uid_definitions: Vec<UidDefinition>,
	pub xrefs: Vec<XrefRecord>,
	/// Files whose content was inlined.
	pub file_dependencies: BTreeSet<String>,
	pub diagnostics: Vec<BuildDiagnostic>,
}

impl ProcessContext {
	pub fn new(services: Services, file: impl Into<String>) -> Self {
		let file = file.into();

		Self {
			services,
			source_file: file.clone(),
			file,
			uid: None,
			linked_files: BTreeSet::new(),
			linked_uids: BTreeSet::new(),
			link_sources: BTreeMap::new(),
			uid_definitions: vec![],
			xrefs: vec![],
			file_dependencies: BTreeSet::new(),
			diagnostics: vec![],
		}
	}

	pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
		self.source_file = source_file.into();
		self
	}

	pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
		self.uid = Some(uid.into());
		self
	}

	pub fn add_linked_file(&mut self, link: LinkSource) {
		if !self.services.files.exists(&link.target) {
			let mut diagnostic = BuildDiagnostic::warning(
				DiagnosticKind::MissingLinkedFile {
					target: link.target.clone(),
				},
				link.source_file.clone(),
			);
			if let Some(uid) = &self.uid {
				diagnostic = diagnostic.with_uid(uid.clone());
			}
			if let Some(line) = link.line {
				diagnostic = diagnostic.with_line(line);
			}
			self.report(diagnostic);
		}

		self.linked_files.insert(link.target);
	}

	pub fn add_linked_uid(&mut self, link: LinkSource) {
		self.linked_uids.insert(link.target.clone());
		self.link_sources
			.entry(link.target.clone())
			.or_default()
			.push(link);
	}

	/// Record a uid definition unless the uid is already known.
	pub fn define_uid(&mut self, definition: UidDefinition) {
		if self
			.uid_definitions
			.iter()
			.all(|existing| existing.uid != definition.uid)
		{
			self.uid_definitions.push(definition);
		}
	}

	/// Record and log a diagnostic.
	pub fn report(&mut self, diagnostic: BuildDiagnostic) {
		diagnostic.log();
		self.diagnostics.push(diagnostic);
	}

	/// Move the links, definitions and diagnostics of `other` into this
	/// context.
	pub fn absorb(&mut self, other: ProcessContext) {
		self.linked_files.extend(other.linked_files);
		self.linked_uids.extend(other.linked_uids);
		for (uid, sources) in other.link_sources {
			self.link_sources.entry(uid).or_default().extend(sources);
		}
		for definition in other.uid_definitions {
			self.define_uid(definition);
		}
		merge_xref_records(&mut self.xrefs, other.xrefs);
		self.file_dependencies.extend(other.file_dependencies);
		self.diagnostics.extend(other.diagnostics);
	}
}
