use std::collections::BTreeMap;

use serde::Serialize;

use crate::ContentNode;
use crate::OverdocError;
use crate::OverdocResult;

/// The cross-reference record of one uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XrefRecord {
	pub uid: String,
	/// The owning file, with `#anchor` for uids nested inside a document.
	pub href: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name_with_type: Option<String>,
	/// Per-language variants of a property, keyed by property then language.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub variants: BTreeMap<String, BTreeMap<String, String>>,
	#[serde(flatten)]
	pub properties: BTreeMap<String, String>,
}

impl XrefRecord {
	pub fn new(uid: impl Into<String>, href: impl Into<String>) -> Self {
		Self {
			uid: uid.into(),
			href: href.into(),
			..Self::default()
		}
	}

	/// Copy one property value into the record. Scalars fill the dedicated
	/// name fields or `properties`. Maps of `language: text` and lists of
	/// `{ lang, value }` fill `variants`.
	pub fn set_property(&mut self, name: &str, value: &ContentNode) {
		if let Some(text) = value.key_text() {
			match name {
				"name" => self.name = Some(text),
				"fullName" => self.full_name = Some(text),
				"nameWithType" => self.name_with_type = Some(text),
				"uid" | "href" => {}
				_ => {
					self.properties.insert(name.to_string(), text);
				}
			}
			return;
		}

		let variants: BTreeMap<String, String> = match value {
			ContentNode::Object(map) => {
				map.iter()
					.filter_map(|(lang, text)| text.key_text().map(|text| (lang.clone(), text)))
					.collect()
			}
			ContentNode::Array(items) => {
				items
					.iter()
					.filter_map(|item| {
						let lang = item.get("lang").and_then(ContentNode::key_text)?;
						let text = item.get("value").and_then(ContentNode::key_text)?;
						Some((lang, text))
					})
					.collect()
			}
			ContentNode::Scalar(_) => BTreeMap::new(),
		};

		if !variants.is_empty() {
			self.variants.insert(name.to_string(), variants);
		}
	}
}

/// The anchor of a uid nested inside a document: lowercased, with every
/// character that is not alphanumeric replaced by `_`.
pub fn xref_anchor(uid: &str) -> String {
	uid.chars()
		.map(|c| {
			if c.is_alphanumeric() {
				c.to_lowercase().next().unwrap_or(c)
			} else {
				'_'
			}
		})
		.collect()
}

/// Merge freshly exported records into `existing`: records are matched by uid
/// and replaced in place, new uids are appended, nothing is removed.
pub fn merge_xref_records(existing: &mut Vec<XrefRecord>, fresh: Vec<XrefRecord>) {
	for record in fresh {
		match existing.iter_mut().find(|current| current.uid == record.uid) {
			Some(current) => *current = record,
			None => existing.push(record),
		}
	}
}

#[derive(Serialize)]
struct XrefMap<'a> {
	references: &'a [XrefRecord],
}

/// Render records as a YAML xref map.
pub fn render_xref_map(records: &[XrefRecord]) -> OverdocResult<String> {
	let yaml = serde_yaml_ng::to_string(&XrefMap {
		references: records,
	})
	.map_err(|e| OverdocError::Yaml {
		file: "xrefmap.yml".to_string(),
		reason: e.to_string(),
	})?;

	Ok(format!("### YamlMime:XRefMap\n{yaml}"))
}
