use std::collections::BTreeMap;
use std::sync::Arc;

use crate::BatchFailure;
use crate::BuildDiagnostic;
use crate::CancellationToken;
use crate::ContentNode;
use crate::Document;
use crate::DocumentSchema;
use crate::OPath;
use crate::OverdocError;
use crate::OverdocResult;
use crate::OverwriteDocument;
use crate::OverwriteKind;
use crate::OverwriteOptions;
use crate::Pipelines;
use crate::ProcessContext;
use crate::Schema;
use crate::SchemaRegistry;
use crate::Services;
use crate::UidDefinition;
use crate::XrefRecord;
use crate::codec::read_mime_header;
use crate::fragments::generate_fragment_skeleton;
use crate::fragments::parse_fragments;
use crate::fragments::synthesize_fragment_overwrites;
use crate::fragments::validate_fragments;
use crate::merge;
use crate::merge_xref_records;
use crate::overwrite::parse_overwrite_file;
use crate::placeholder::apply_body;
use crate::validate;
use crate::worker::run_in_parallel;

/// What an overwrite pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverwriteReport {
	/// Uids whose overwrites were merged, in processing order.
	pub applied: Vec<String>,
	/// Warnings raised along the way. Each was also logged.
	pub diagnostics: Vec<BuildDiagnostic>,
}

/// The overwrites targeting one uid of one document.
struct UidWork<'a> {
	definition: UidDefinition,
	/// In discovery order.
	overwrites: Vec<&'a OverwriteDocument>,
}

/// Loads base documents and layers overwrites onto them.
///
/// Options, collaborators and pipelines are injected at construction. The
/// engine holds no other state, so one instance can serve a whole build.
#[derive(Debug, Clone)]
pub struct Engine {
	options: OverwriteOptions,
	services: Services,
	pipelines: Pipelines,
}

impl Engine {
	pub fn new(options: OverwriteOptions, services: Services) -> Self {
		Self {
			options,
			services,
			pipelines: Pipelines::default(),
		}
	}

	pub fn with_pipelines(mut self, pipelines: Pipelines) -> Self {
		self.pipelines = pipelines;
		self
	}

	pub fn options(&self) -> &OverwriteOptions {
		&self.options
	}

	pub fn services(&self) -> &Services {
		&self.services
	}

	fn context(&self, file: &str) -> ProcessContext {
		ProcessContext::new(self.services.clone(), file)
	}

	/// Read a base document's text and content tree along with its schema.
	fn read_base(
		&self,
		path: &str,
		registry: &SchemaRegistry,
	) -> OverdocResult<(ContentNode, Arc<DocumentSchema>)> {
		let text = self.services.files.read_text(path)?;
		let document_type = read_mime_header(&text).ok_or_else(|| {
			OverdocError::Yaml {
				file: path.to_string(),
				reason: "missing `### YamlMime:<DocumentType>` header".to_string(),
			}
		})?;
		let schema = registry.get(document_type)?;
		let content = self.services.codec.deserialize(&text, path)?;

		Ok((content, schema))
	}

	/// Load, validate and render one base document, and export its
	/// cross-reference records.
	pub fn load_base_document(
		&self,
		path: &str,
		registry: &SchemaRegistry,
	) -> OverdocResult<Document> {
		let (raw, schema) = self.read_base(path, registry)?;
		let definitions = validate(&raw, &schema.root, path)?;

		let mut state = self.context(path);
		let content = self
			.pipelines
			.render
			.process(&raw, &schema.root, &mut state, &OPath::root())?;
		for definition in definitions {
			state.define_uid(definition);
		}

		let xrefs = self.export_content_xrefs(path, &content, &schema.root)?;
		merge_xref_records(&mut state.xrefs, xrefs);

		tracing::debug!(
			file = path,
			uids = state.uid_definitions.len(),
			"loaded base document"
		);

		Ok(Document {
			file: path.to_string(),
			schema,
			content,
			state,
		})
	}

	/// Load many base documents in parallel. The result keeps the order of
	/// `paths`. Every path is attempted before failures are reported together.
	pub fn load_base_documents(
		&self,
		paths: &[String],
		registry: &SchemaRegistry,
		cancel: &CancellationToken,
	) -> OverdocResult<Vec<Document>> {
		let results = run_in_parallel(
			paths.to_vec(),
			self.options.parallelism,
			cancel,
			|path| self.load_base_document(&path, registry),
		);

		let mut documents = vec![];
		let mut failures = vec![];
		for (path, result) in paths.iter().zip(results) {
			match result {
				Ok(document) => documents.push(document),
				Err(error) => {
					tracing::error!(file = %path, "{error}");
					failures.push(BatchFailure {
						file: Some(path.clone()),
						uid: None,
						error,
					});
				}
			}
		}

		if failures.is_empty() {
			Ok(documents)
		} else {
			Err(OverdocError::Aggregate { failures })
		}
	}

	/// Parse a classic overwrite file.
	pub fn load_overwrite_documents(&self, path: &str) -> OverdocResult<Vec<OverwriteDocument>> {
		let text = self.services.files.read_text(path)?;
		parse_overwrite_file(&text, path, &self.options.placeholder)
	}

	/// Recompute the cross-reference records of a document from its current
	/// content.
	pub fn export_xrefs(&self, document: &Document) -> OverdocResult<Vec<XrefRecord>> {
		self.export_content_xrefs(&document.file, &document.content, &document.schema.root)
	}

	fn export_content_xrefs(
		&self,
		file: &str,
		content: &ContentNode,
		schema: &Schema,
	) -> OverdocResult<Vec<XrefRecord>> {
		let mut context = self.context(file);
		self.pipelines
			.xref_export
			.process(content, schema, &mut context, &OPath::root())?;

		Ok(context.xrefs)
	}

	/// Merge `overwrites` into the documents that own their uids.
	///
	/// Documents are processed in parallel, but all uids of one document are
	/// applied by a single worker in the order the overwrites were given.
	/// Each document is amended on a copy that is committed only when every
	/// uid merged and the result re-validated. A failing document never stops
	/// the others; all failures are returned together as
	/// [`OverdocError::Aggregate`] after the whole batch ran.
	///
	/// A uid declared by no document, or by more than one, is a failure of its
	/// own and touches no document.
	pub fn apply_overwrites(
		&self,
		documents: &mut [Document],
		overwrites: &[OverwriteDocument],
		cancel: &CancellationToken,
	) -> OverdocResult<OverwriteReport> {
		let mut report = OverwriteReport::default();
		let mut failures = vec![];

		// Owners are looked up before any document is borrowed mutably.
		let mut owners: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
		for (index, document) in documents.iter().enumerate() {
			for definition in document.uids() {
				owners.entry(definition.uid.as_str()).or_default().push(index);
			}
		}

		let mut grouped: Vec<(&str, Vec<&OverwriteDocument>)> = vec![];
		for overwrite in overwrites {
			match grouped.iter_mut().find(|(uid, _)| *uid == overwrite.uid) {
				Some((_, group)) => group.push(overwrite),
				None => grouped.push((overwrite.uid.as_str(), vec![overwrite])),
			}
		}

		let mut work: BTreeMap<usize, Vec<UidWork>> = BTreeMap::new();
		for (uid, group) in grouped {
			match owners.get(uid).map(Vec::as_slice) {
				None | Some([]) => {
					let first = group[0];
					let error = OverdocError::UidNotFound(uid.to_string());
					tracing::error!(file = %first.file, line = first.line, "{error}");
					failures.push(BatchFailure {
						file: Some(first.file.clone()),
						uid: Some(uid.to_string()),
						error,
					});
				}
				Some([index]) => {
					let Some(definition) = documents[*index].uid(uid).cloned() else {
						continue;
					};
					work.entry(*index).or_default().push(UidWork {
						definition,
						overwrites: group,
					});
				}
				Some(indices) => {
					let error = OverdocError::MultipleOwners {
						uid: uid.to_string(),
						files: indices
							.iter()
							.map(|index| documents[*index].file.clone())
							.collect(),
					};
					tracing::error!(uid, "{error}");
					failures.push(BatchFailure {
						file: None,
						uid: Some(uid.to_string()),
						error,
					});
				}
			}
		}

		let mut tasks = vec![];
		for (index, document) in documents.iter_mut().enumerate() {
			if let Some(items) = work.remove(&index) {
				tasks.push((document, items));
			}
		}
		let files: Vec<String> = tasks
			.iter()
			.map(|(document, _)| document.file.clone())
			.collect();

		let results = run_in_parallel(tasks, self.options.parallelism, cancel, |(document, items)| {
			Ok(self.apply_to_document(document, &items))
		});

		for (file, result) in files.into_iter().zip(results) {
			match result {
				Ok(Ok(applied)) => report.applied.extend(applied),
				Ok(Err(failure)) => failures.push(failure),
				Err(error) => {
					failures.push(BatchFailure {
						file: Some(file),
						uid: None,
						error,
					});
				}
			}
		}

		if failures.is_empty() {
			Ok(report)
		} else {
			Err(OverdocError::Aggregate { failures })
		}
	}

	/// Parse a markdown fragment file for `document`, warn about gaps and
	/// merge its sections into the document.
	pub fn apply_fragments(
		&self,
		document: &mut Document,
		fragment_text: &str,
		fragment_file: &str,
	) -> OverdocResult<OverwriteReport> {
		let fragments = parse_fragments(fragment_text, fragment_file)?;

		let diagnostics = if self.options.validate_fragments {
			validate_fragments(
				&document.content,
				&document.schema.root,
				&fragments,
				&self.options.editable_tag,
				&document.file,
			)
		} else {
			vec![]
		};

		let overwrites = synthesize_fragment_overwrites(&fragments)?;
		let mut items: Vec<UidWork> = vec![];
		for overwrite in &overwrites {
			if let Some(definition) = document.uid(&overwrite.uid).cloned() {
				items.push(UidWork {
					definition,
					overwrites: vec![overwrite],
				});
			}
		}

		let applied = self
			.apply_to_document(document, &items)
			.map_err(|failure| failure.error)?;
		document.state.diagnostics.extend(diagnostics.iter().cloned());

		Ok(OverwriteReport {
			applied,
			diagnostics,
		})
	}

	/// Render a starter fragment file for the base document at `path`.
	pub fn generate_fragment_skeleton(
		&self,
		path: &str,
		registry: &SchemaRegistry,
	) -> OverdocResult<String> {
		let (raw, schema) = self.read_base(path, registry)?;
		validate(&raw, &schema.root, path)?;

		generate_fragment_skeleton(&raw, &schema.root, &self.options.editable_tag)
	}

	/// Apply every uid of one document on a copy, then re-validate, re-export
	/// and commit.
	fn apply_to_document(
		&self,
		document: &mut Document,
		items: &[UidWork],
	) -> Result<Vec<String>, BatchFailure> {
		let file = document.file.clone();
		let mut content = document.content.clone();
		let mut state = self.context(&file);
		let mut applied = vec![];

		for item in items {
			let uid = &item.definition.uid;
			self.apply_uid(&mut content, document, item, &mut state)
				.map_err(|error| {
					tracing::error!(file = %file, uid = %uid, "{error}");
					BatchFailure {
						file: Some(file.clone()),
						uid: Some(uid.clone()),
						error,
					}
				})?;
			applied.push(uid.clone());
		}

		let revalidate = || -> OverdocResult<(Vec<UidDefinition>, Vec<XrefRecord>)> {
			let definitions = validate(&content, &document.schema.root, &file).map_err(|e| {
				OverdocError::Validation {
					file: file.clone(),
					source: Box::new(e),
				}
			})?;
			let xrefs = self.export_content_xrefs(&file, &content, &document.schema.root)?;
			Ok((definitions, xrefs))
		};

		let (definitions, xrefs) = revalidate().map_err(|error| {
			tracing::error!(file = %file, "{error}");
			BatchFailure {
				file: Some(file.clone()),
				uid: None,
				error,
			}
		})?;

		document.content = content;
		document.state.absorb(state);
		// Merges can move or drop nested uids. Re-validation sees the whole
		// document, so its definitions replace the previous ones.
		document.state.uid_definitions = definitions;
		merge_xref_records(&mut document.state.xrefs, xrefs);

		tracing::debug!(file = %file, uids = applied.len(), "applied overwrites");

		Ok(applied)
	}

	/// Normalize the overwrites of one uid, fold them left to right and merge
	/// the result at the uid's address.
	fn apply_uid(
		&self,
		content: &mut ContentNode,
		document: &Document,
		item: &UidWork,
		state: &mut ProcessContext,
	) -> OverdocResult<()> {
		let uid = &item.definition.uid;
		let target = item.definition.target();
		let schema = target.resolve_schema(&document.schema.root)?;

		let mut combined: Option<ContentNode> = None;
		for overwrite in &item.overwrites {
			let (metadata, pipeline) = match overwrite.kind {
				OverwriteKind::Classic => {
					let (metadata, _) = apply_body(
						&overwrite.metadata,
						&overwrite.body,
						&self.options.placeholder,
						&self.options.body_property,
					);
					(metadata, &self.pipelines.overwrite)
				}
				OverwriteKind::Fragment => (overwrite.metadata.clone(), &self.pipelines.fragments),
			};

			let mut context = self
				.context(&document.file)
				.with_source_file(overwrite.file.clone())
				.with_uid(uid.clone());
			let normalized = pipeline.process(&metadata, schema, &mut context, &target)?;
			state.absorb(context);

			combined = Some(match combined.take() {
				None => normalized,
				Some(mut folded) => {
					merge(&mut folded, Some(&normalized), uid, &target, schema)?;
					folded
				}
			});
		}

		let source = target.resolve_value_mut(content)?;
		merge(source, combined.as_ref(), uid, &target, schema)
	}
}
