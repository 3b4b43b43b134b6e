//! Object paths (`OPath`), a JSON-Pointer-like address for values inside a
//! schema tree and a content tree.
//!
//! ```text
//! /items[uid="A"]/name
//! ```
//!
//! `/name` selects an object property, `/0` selects an array index and
//! `[key="value"]` selects the element of the nearest enclosing array whose
//! merge-key property equals the literal. Names escape `~` as `~0` and `/` as
//! `~1`.

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::ContentMap;
use crate::ContentNode;
use crate::OverdocError;
use crate::OverdocResult;
use crate::Schema;
use crate::SchemaKind;

mod lexer;

/// One step of an [`OPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
	/// `/name`
	Property(String),
	/// `/0`
	Index(usize),
	/// `[key="value"]`
	Filter { key: String, value: String },
}

impl Display for Segment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Property(name) => write!(f, "/{}", lexer::escape_name(name)),
			Self::Index(index) => write!(f, "/{index}"),
			Self::Filter { key, value } => {
				let value = value.replace('\\', "\\\\").replace('"', "\\\"");
				write!(f, "[{}=\"{value}\"]", lexer::escape_name(key))
			}
		}
	}
}

/// A parsed object path. The empty path addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OPath {
	segments: Vec<Segment>,
}

impl OPath {
	/// The empty path, addressing the root node.
	pub fn root() -> Self {
		Self::default()
	}

	/// Parse a path string. A missing leading `/` is tolerated so fragment
	/// headings such as `summary` parse the same as `/summary`.
	pub fn parse(path: impl AsRef<str>) -> OverdocResult<Self> {
		let path = path.as_ref().trim();
		if path.is_empty() || path == "/" {
			return Ok(Self::root());
		}

		let segments = if path.starts_with('/') {
			lexer::tokenize(path)?
		} else {
			lexer::tokenize(&format!("/{path}"))?
		};

		Ok(Self { segments })
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn last(&self) -> Option<&Segment> {
		self.segments.last()
	}

	/// The path with its last segment removed. The parent of the root is the
	/// root.
	pub fn parent(&self) -> Self {
		let mut segments = self.segments.clone();
		segments.pop();
		Self { segments }
	}

	/// A new path with `segment` appended.
	pub fn child(&self, segment: Segment) -> Self {
		let mut segments = self.segments.clone();
		segments.push(segment);
		Self { segments }
	}

	pub fn property(&self, name: impl Into<String>) -> Self {
		self.child(Segment::Property(name.into()))
	}

	pub fn index(&self, index: usize) -> Self {
		self.child(Segment::Index(index))
	}

	pub fn filter(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.child(Segment::Filter {
			key: key.into(),
			value: value.into(),
		})
	}

	/// Concatenate `other` onto this path.
	pub fn join(&self, other: &OPath) -> Self {
		let mut segments = self.segments.clone();
		segments.extend(other.segments.iter().cloned());
		Self { segments }
	}

	fn prefix_display(&self, end: usize) -> String {
		self.segments[..end].iter().map(ToString::to_string).collect()
	}

	fn not_found(&self, position: usize) -> OverdocError {
		OverdocError::AddressNotFound {
			path: self.to_string(),
			segment: self.segments[position].to_string(),
		}
	}

	/// Walk `root` along this path, following object properties and array
	/// item schemas.
	pub fn resolve_schema<'s>(&self, root: &'s Schema) -> OverdocResult<&'s Schema> {
		let mut current = root;

		for (position, segment) in self.segments.iter().enumerate() {
			current = match (segment, &current.kind) {
				(Segment::Property(name), SchemaKind::Object) => {
					current.property(name).ok_or_else(|| self.not_found(position))?
				}
				(Segment::Index(_) | Segment::Filter { .. }, SchemaKind::Array) => {
					current.items.as_deref().ok_or_else(|| self.not_found(position))?
				}
				(_, kind) => {
					return Err(OverdocError::SchemaMismatch {
						file: String::new(),
						path: self.prefix_display(position + 1),
						expected: match segment {
							Segment::Property(_) => "object".to_string(),
							_ => "array".to_string(),
						},
						found: kind.to_string(),
					});
				}
			};
		}

		Ok(current)
	}

	/// Resolve this path against a content tree, returning an alias into it.
	pub fn resolve_value<'c>(&self, root: &'c ContentNode) -> OverdocResult<&'c ContentNode> {
		let mut current = root;

		for (position, segment) in self.segments.iter().enumerate() {
			let next = match (segment, current) {
				(Segment::Property(name), ContentNode::Object(map)) => map.get(name),
				(Segment::Index(index), ContentNode::Array(items)) => items.get(*index),
				(Segment::Filter { key, value }, ContentNode::Array(items)) => {
					items.iter().find(|item| item.has_key_value(key, value))
				}
				_ => None,
			};
			current = next.ok_or_else(|| self.not_found(position))?;
		}

		Ok(current)
	}

	/// Resolve this path against a content tree, returning a mutable alias
	/// so in-place edits are visible to the owner of the tree.
	pub fn resolve_value_mut<'c>(
		&self,
		root: &'c mut ContentNode,
	) -> OverdocResult<&'c mut ContentNode> {
		let mut current = root;

		for (position, segment) in self.segments.iter().enumerate() {
			let next = match (segment, current) {
				(Segment::Property(name), ContentNode::Object(map)) => map.get_mut(name),
				(Segment::Index(index), ContentNode::Array(items)) => items.get_mut(*index),
				(Segment::Filter { key, value }, ContentNode::Array(items)) => {
					items.iter_mut().find(|item| item.has_key_value(key, value))
				}
				_ => None,
			};
			current = next.ok_or_else(|| self.not_found(position))?;
		}

		Ok(current)
	}

	/// Like [`OPath::resolve_value`] but treats an unresolved address as
	/// absent.
	pub fn find_value<'c>(&self, root: &'c ContentNode) -> Option<&'c ContentNode> {
		self.resolve_value(root).ok()
	}

	/// Store `value` at this path, creating intermediate objects and keyed
	/// array elements as needed. Index segments must already exist.
	pub fn set_in(&self, root: &mut ContentNode, value: ContentNode) -> OverdocResult<()> {
		let Some((last, init)) = self.segments.split_last() else {
			*root = value;
			return Ok(());
		};

		let mut current = root;
		for (position, segment) in init.iter().enumerate() {
			let next_is_array = matches!(
				self.segments.get(position + 1),
				Some(Segment::Index(_) | Segment::Filter { .. })
			);
			current = self.step_or_create(current, segment, position, next_is_array)?;
		}

		let position = init.len();
		match last {
			Segment::Property(name) => {
				ensure_object(current).insert(name.clone(), value);
			}
			Segment::Index(_) | Segment::Filter { .. } => {
				let slot = self.step_or_create(current, last, position, false)?;
				*slot = value;
			}
		}

		Ok(())
	}

	fn step_or_create<'c>(
		&self,
		current: &'c mut ContentNode,
		segment: &Segment,
		position: usize,
		next_is_array: bool,
	) -> OverdocResult<&'c mut ContentNode> {
		match segment {
			Segment::Property(name) => {
				let map = ensure_object(current);
				Ok(map.get_or_insert_with(name, || {
					if next_is_array {
						ContentNode::Array(vec![])
					} else {
						ContentNode::object()
					}
				}))
			}
			Segment::Index(index) => {
				match current {
					ContentNode::Array(items) => {
						items.get_mut(*index).ok_or_else(|| self.not_found(position))
					}
					_ => Err(self.not_found(position)),
				}
			}
			Segment::Filter { key, value } => {
				if !matches!(current, ContentNode::Array(_)) {
					*current = ContentNode::Array(vec![]);
				}
				let ContentNode::Array(items) = current else {
					return Err(self.not_found(position));
				};

				let index = match items.iter().position(|item| item.has_key_value(key, value)) {
					Some(index) => index,
					None => {
						let mut element = ContentMap::new();
						element.insert(key.clone(), ContentNode::string(value.clone()));
						items.push(ContentNode::Object(element));
						items.len() - 1
					}
				};

				Ok(&mut items[index])
			}
		}
	}
}

fn ensure_object(node: &mut ContentNode) -> &mut ContentMap {
	if !matches!(node, ContentNode::Object(_)) {
		*node = ContentNode::object();
	}

	match node {
		ContentNode::Object(map) => map,
		_ => unreachable!("node was just replaced with an object"),
	}
}

impl Display for OPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.segments.is_empty() {
			return write!(f, "/");
		}

		for segment in &self.segments {
			write!(f, "{segment}")?;
		}

		Ok(())
	}
}

impl FromStr for OPath {
	type Err = OverdocError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for OPath {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for OPath {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Self::parse(&text).map_err(serde::de::Error::custom)
	}
}
