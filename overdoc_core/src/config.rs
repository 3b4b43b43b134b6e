use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::OverdocError;
use crate::OverdocResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["overdoc.toml", ".overdoc.toml", ".config/overdoc.toml"];

/// The sentinel that redirects an overwrite body into a specific field.
pub const DEFAULT_PLACEHOLDER: &str = "*content";

/// The field that receives the overwrite body when no placeholder is used.
pub const DEFAULT_BODY_PROPERTY: &str = "conceptual";

/// The schema tag marking properties that fragment files are expected to
/// provide.
pub const DEFAULT_EDITABLE_TAG: &str = "editable";

/// Configuration loaded from an `overdoc.toml` file.
///
/// ```toml
/// [overwrite]
/// placeholder = "*content"
/// body_property = "conceptual"
///
/// [fragments]
/// editable_tag = "editable"
/// validate = true
///
/// [build]
/// parallelism = 4
///
/// [schemas]
/// ManagedReference = "schemas/ManagedReference.schema.json"
/// RestApi = "schemas/RestApi.schema.yml"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct OverdocConfig {
	#[serde(default)]
	pub overwrite: OverwriteConfig,
	#[serde(default)]
	pub fragments: FragmentsConfig,
	#[serde(default)]
	pub build: BuildConfig,
	/// Map of document type to schema file, relative to the project root.
	#[serde(default)]
	pub schemas: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverwriteConfig {
	/// The reserved sentinel recognized verbatim as a scalar value in
	/// overwrite metadata. Defaults to `*content`.
	#[serde(default = "default_placeholder")]
	pub placeholder: String,
	/// Receives the overwrite body when no field uses the placeholder.
	#[serde(default = "default_body_property")]
	pub body_property: String,
}

impl Default for OverwriteConfig {
	fn default() -> Self {
		Self {
			placeholder: default_placeholder(),
			body_property: default_body_property(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct FragmentsConfig {
	#[serde(default = "default_editable_tag")]
	pub editable_tag: String,
	/// Emit warnings for uids and editable properties missing from fragment
	/// files.
	#[serde(default = "default_true")]
	pub validate: bool,
}

impl Default for FragmentsConfig {
	fn default() -> Self {
		Self {
			editable_tag: default_editable_tag(),
			validate: true,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
	/// Number of worker threads. Defaults to the available parallelism.
	#[serde(default)]
	pub parallelism: Option<usize>,
}

fn default_placeholder() -> String {
	DEFAULT_PLACEHOLDER.to_string()
}

fn default_body_property() -> String {
	DEFAULT_BODY_PROPERTY.to_string()
}

fn default_editable_tag() -> String {
	DEFAULT_EDITABLE_TAG.to_string()
}

fn default_true() -> bool {
	true
}

impl OverdocConfig {
	/// Resolve the first supported config file path in `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> OverdocResult<Option<OverdocConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> OverdocResult<Self> {
		toml::from_str(content).map_err(|e| OverdocError::ConfigParse(e.to_string()))
	}

	/// The runtime options consumed by the engine.
	pub fn options(&self) -> OverwriteOptions {
		let parallelism = self
			.build
			.parallelism
			.filter(|count| *count > 0)
			.unwrap_or_else(default_parallelism);

		OverwriteOptions {
			placeholder: self.overwrite.placeholder.clone(),
			body_property: self.overwrite.body_property.clone(),
			editable_tag: self.fragments.editable_tag.clone(),
			validate_fragments: self.fragments.validate,
			parallelism,
		}
	}
}

fn default_parallelism() -> usize {
	std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Options passed explicitly to the [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteOptions {
	pub placeholder: String,
	pub body_property: String,
	pub editable_tag: String,
	pub validate_fragments: bool,
	/// Worker count, always at least one.
	pub parallelism: usize,
}

impl Default for OverwriteOptions {
	fn default() -> Self {
		OverdocConfig::default().options()
	}
}
