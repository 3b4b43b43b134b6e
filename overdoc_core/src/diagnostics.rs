use std::fmt::Display;

/// How serious a [`BuildDiagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	Info,
	Warning,
	Error,
}

impl Display for Severity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
		}
	}
}

/// The kind of non-fatal condition found while building.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticKind {
	/// A uid of the document has no section in its fragment file.
	MissingFragmentUid { uid: String },
	/// An editable property of a uid has no entry in the uid's fragment.
	MissingFragmentProperty { uid: String, path: String },
	/// A fragment section names a uid the document does not define.
	UnknownFragmentUid { uid: String },
	/// Markdown links to a file the file layer cannot find.
	MissingLinkedFile { target: String },
}

/// A non-fatal condition reported by the engine. Every warning is also logged
/// with `tracing::warn!` when it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDiagnostic {
	pub severity: Severity,
	pub kind: DiagnosticKind,
	/// The file the diagnostic belongs to.
	pub file: String,
	pub uid: Option<String>,
	/// 1-indexed line number, when known.
	pub line: Option<usize>,
}

impl BuildDiagnostic {
	pub fn warning(kind: DiagnosticKind, file: impl Into<String>) -> Self {
		Self {
			severity: Severity::Warning,
			kind,
			file: file.into(),
			uid: None,
			line: None,
		}
	}

	pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
		self.uid = Some(uid.into());
		self
	}

	pub fn with_line(mut self, line: usize) -> Self {
		self.line = Some(line);
		self
	}

	/// Return a human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::MissingFragmentUid { uid } => {
				format!("uid `{uid}` has no section in the markdown fragment file")
			}
			DiagnosticKind::MissingFragmentProperty { uid, path } => {
				format!("editable property `{path}` of uid `{uid}` is missing from the markdown fragment file")
			}
			DiagnosticKind::UnknownFragmentUid { uid } => {
				format!("fragment section `{uid}` does not match any uid of the document")
			}
			DiagnosticKind::MissingLinkedFile { target } => {
				format!("linked file `{target}` does not exist")
			}
		}
	}

	/// Log this diagnostic through `tracing`.
	pub fn log(&self) {
		let location = match self.line {
			Some(line) => format!("{}:{line}", self.file),
			None => self.file.clone(),
		};

		match self.severity {
			Severity::Error => tracing::error!(file = %location, "{}", self.message()),
			Severity::Warning => tracing::warn!(file = %location, "{}", self.message()),
			Severity::Info => tracing::debug!(file = %location, "{}", self.message()),
		}
	}
}

impl Display for BuildDiagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.severity, self.file)?;
		if let Some(line) = self.line {
			write!(f, ":{line}")?;
		}
		write!(f, ": {}", self.message())
	}
}
