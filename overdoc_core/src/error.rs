use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum OverdocError {
	#[error(transparent)]
	#[diagnostic(code(overdoc::io_error))]
	Io(#[from] std::io::Error),

	#[error("failure to load markdown: {0}")]
	#[diagnostic(code(overdoc::markdown))]
	Markdown(String),

	#[error("failed to parse yaml in `{file}`: {reason}")]
	#[diagnostic(code(overdoc::yaml))]
	Yaml { file: String, reason: String },

	#[error("failed to parse json in `{file}`: {reason}")]
	#[diagnostic(code(overdoc::json))]
	Json { file: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(overdoc::config_parse),
		help("check that overdoc.toml is valid TOML with [overwrite], [fragments], [build] and/or [schemas] sections")
	)]
	ConfigParse(String),

	#[error("invalid schema `{name}`: {reason}")]
	#[diagnostic(code(overdoc::schema_parse))]
	SchemaParse { name: String, reason: String },

	#[error("invalid object path `{path}`: {reason}")]
	#[diagnostic(
		code(overdoc::invalid_path),
		help("paths look like `/items[uid=\"A\"]/name` or `/items/0/name`")
	)]
	InvalidPath { path: String, reason: String },

	#[error("`{path}` does not resolve: no match for segment `{segment}`")]
	#[diagnostic(code(overdoc::address_not_found))]
	AddressNotFound { path: String, segment: String },

	#[error("schema mismatch at `{path}` in `{file}`: expected {expected}, found {found}")]
	#[diagnostic(code(overdoc::schema_mismatch))]
	SchemaMismatch {
		file: String,
		path: String,
		expected: String,
		found: String,
	},

	#[error(
		"content type mismatch at `{path}` in `{file}`{}: `{content_type}` expects {expected}, found {found}",
		.uid.as_ref().map(|uid| format!(" (uid `{uid}`)")).unwrap_or_default()
	)]
	#[diagnostic(code(overdoc::content_type_mismatch))]
	ContentTypeMismatch {
		file: String,
		uid: Option<String>,
		path: String,
		content_type: String,
		expected: String,
		found: String,
	},

	#[error("cannot merge overwrite for uid `{uid}` at `{path}`: expected {expected}, found {found}")]
	#[diagnostic(
		code(overdoc::merge_shape),
		help("the overwrite value must have the same shape as the schema declares for this property")
	)]
	MergeShape {
		uid: String,
		path: String,
		expected: String,
		found: String,
	},

	#[error("uid `{uid}` is defined in more than one document: {}", .files.join(", "))]
	#[diagnostic(
		code(overdoc::multiple_owners),
		help("a uid may only be declared by one base document; use an overwrite file to amend it")
	)]
	MultipleOwners { uid: String, files: Vec<String> },

	#[error("uid `{uid}` is defined more than once in `{file}`")]
	#[diagnostic(code(overdoc::duplicate_uid))]
	DuplicateUid { uid: String, file: String },

	#[error("no base document defines uid `{0}`")]
	#[diagnostic(code(overdoc::uid_not_found))]
	UidNotFound(String),

	#[error("`{file}` failed validation after merging overwrites: {source}")]
	#[diagnostic(code(overdoc::validation))]
	Validation {
		file: String,
		#[source]
		source: Box<OverdocError>,
	},

	#[error("unknown document type: `{0}`")]
	#[diagnostic(
		code(overdoc::unknown_document_type),
		help("register a schema for this document type in the [schemas] section of overdoc.toml")
	)]
	UnknownDocumentType(String),

	#[error("file not found: `{0}`")]
	#[diagnostic(code(overdoc::file_not_found))]
	FileNotFound(String),

	#[error("invalid markdown fragment in `{file}` at line {line}: {reason}")]
	#[diagnostic(
		code(overdoc::invalid_fragment),
		help("fragment files use `# `uid`` headings for each uid and `## `path`` headings for each property")
	)]
	InvalidFragment {
		file: String,
		line: usize,
		reason: String,
	},

	#[error("the build was cancelled before all documents were processed")]
	#[diagnostic(code(overdoc::cancelled))]
	Cancelled,

	#[error("{} document(s) failed to build", .failures.len())]
	#[diagnostic(code(overdoc::aggregate))]
	Aggregate { failures: Vec<BatchFailure> },
}

impl OverdocError {
	/// Returns true when this error names an unresolved address. Callers doing
	/// speculative lookups use this to treat the address as optional.
	pub fn is_address_not_found(&self) -> bool {
		matches!(self, Self::AddressNotFound { .. })
	}
}

/// The first error raised while processing one document (or one uid when no
/// owning document could be determined).
#[derive(Debug)]
pub struct BatchFailure {
	/// The owning document, when known.
	pub file: Option<String>,
	/// The uid being processed when the error occurred, when known.
	pub uid: Option<String>,
	pub error: OverdocError,
}

impl std::fmt::Display for BatchFailure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match (&self.file, &self.uid) {
			(Some(file), Some(uid)) => write!(f, "{file} (uid `{uid}`): {}", self.error),
			(Some(file), None) => write!(f, "{file}: {}", self.error),
			(None, Some(uid)) => write!(f, "uid `{uid}`: {}", self.error),
			(None, None) => write!(f, "{}", self.error),
		}
	}
}

pub type OverdocResult<T> = Result<T, OverdocError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
