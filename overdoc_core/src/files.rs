use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::OverdocError;
use crate::OverdocResult;

/// Read access to the files of a build.
///
/// Paths are `/`-separated and relative to the build root.
pub trait FileLayer: Send + Sync {
	fn exists(&self, path: &str) -> bool;

	fn read_text(&self, path: &str) -> OverdocResult<String>;

	/// Resolve `to` relative to the file `from`.
	fn resolve_relative(&self, from: &str, to: &str) -> String {
		resolve_relative(from, to)
	}
}

/// Resolve `to` against the directory of `from`. A leading `/` makes `to`
/// root-relative. Any `#fragment` or `?query` suffix is kept.
pub fn resolve_relative(from: &str, to: &str) -> String {
	let split = to.find(['#', '?']).unwrap_or(to.len());
	let (target, suffix) = to.split_at(split);

	if target.is_empty() {
		return to.to_string();
	}

	let joined = if let Some(rooted) = target.strip_prefix('/') {
		rooted.to_string()
	} else {
		let from = from.replace('\\', "/");
		match from.rsplit_once('/') {
			Some((directory, _)) => format!("{directory}/{target}"),
			None => target.to_string(),
		}
	};

	format!("{}{suffix}", normalize_path(&joined))
}

/// Collapse `.` and `..` segments and convert separators to `/`. `..` never
/// climbs above the root.
pub fn normalize_path(path: &str) -> String {
	let mut segments: Vec<&str> = vec![];

	for segment in path.split(['/', '\\']) {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			segment => segments.push(segment),
		}
	}

	segments.join("/")
}

/// Whether a link target addresses a file inside the build rather than an
/// external resource.
pub fn is_relative_link(target: &str) -> bool {
	let target = target.trim();
	!(target.is_empty()
		|| target.starts_with('#')
		|| target.starts_with("//")
		|| target.starts_with("xref:")
		|| target.contains("://")
		|| target.starts_with("mailto:")
		|| target.starts_with("data:"))
}

/// Files read from a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskFileLayer {
	root: PathBuf,
}

impl DiskFileLayer {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn full_path(&self, path: &str) -> PathBuf {
		self.root.join(normalize_path(path))
	}
}

impl FileLayer for DiskFileLayer {
	fn exists(&self, path: &str) -> bool {
		self.full_path(path).is_file()
	}

	fn read_text(&self, path: &str) -> OverdocResult<String> {
		let full_path = self.full_path(path);
		if !full_path.is_file() {
			return Err(OverdocError::FileNotFound(path.to_string()));
		}

		Ok(std::fs::read_to_string(full_path)?)
	}
}

/// Files held in memory, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileLayer {
	files: HashMap<String, String>,
}

impl MemoryFileLayer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, path: &str, content: impl Into<String>) {
		self.files.insert(normalize_path(path), content.into());
	}

	pub fn with_file(mut self, path: &str, content: impl Into<String>) -> Self {
		self.insert(path, content);
		self
	}
}

impl FileLayer for MemoryFileLayer {
	fn exists(&self, path: &str) -> bool {
		self.files.contains_key(&normalize_path(path))
	}

	fn read_text(&self, path: &str) -> OverdocResult<String> {
		self.files
			.get(&normalize_path(path))
			.cloned()
			.ok_or_else(|| OverdocError::FileNotFound(path.to_string()))
	}
}
