use crate::ContentNode;
use crate::ContentType;
use crate::DEFAULT_EDITABLE_TAG;
use crate::DocumentSchema;
use crate::Engine;
use crate::MemoryFileLayer;
use crate::MergeType;
use crate::OverwriteOptions;
use crate::Schema;
use crate::SchemaRegistry;
use crate::Services;
use crate::ValueType;

pub const STRING_DOCUMENT_PATH: &str = "api/System.String.yml";
pub const OBJECT_DOCUMENT_PATH: &str = "api/System.Object.yml";

pub const STRING_DOCUMENT: &str = r#"### YamlMime:ManagedReference
uid: System.String
name: String
fullName: System.String
summary: Represents text.
seealso:
- System.Object
source:
  path: src/String.cs
  line: 10
children:
- uid: System.String.Length
  name: Length
  fullName: System.String.Length
  summary: Gets the length.
  isDeprecated: false
  syntax:
    content: "public int Length { get; }"
- uid: System.String.Concat
  name: Concat
  fullName: System.String.Concat
  summary: Concatenates strings.
  syntax:
    content: "public static string Concat(string a, string b)"
    parameters:
    - id: a
      description: The first string.
    - id: b
      description: The second string.
"#;

pub const OBJECT_DOCUMENT: &str = r"### YamlMime:ManagedReference
uid: System.Object
name: Object
fullName: System.Object
summary: The root of the type hierarchy.
seealso:
- System.String
";

pub const STRING_OVERWRITE: &str = r"---
uid: System.String
remarks: *content
---

Strings are **immutable**.

---
uid: System.String.Concat
syntax:
  parameters:
  - id: c
    description: The third string.
  - id: a
    description: Left.
---
---
uid: System.String.Length
---

Length body.
";

pub const STRING_FRAGMENTS: &str = r#"# `System.String`

## `summary`

Represents **text**.

## `remarks`

Strings are immutable.

# `System.String.Length`

```yaml
isDeprecated: true
```

## `summary`

Gets the number of characters.

# `System.String.Concat`

## `summary`

Concatenates.

## `syntax/parameters[id="a"]/description`

Left.

## `syntax/parameters[id="b"]/description`

Right.
"#;

pub fn markdown() -> Schema {
	Schema::string().with_content_type(ContentType::Markdown)
}

pub fn editable_markdown() -> Schema {
	markdown().with_tag(DEFAULT_EDITABLE_TAG)
}

pub fn uid() -> Schema {
	Schema::string().with_content_type(ContentType::Uid)
}

pub fn parameter_schema() -> Schema {
	Schema::object([
		("id", Schema::string().with_merge_type(MergeType::Key)),
		("type", Schema::string()),
		("description", editable_markdown()),
	])
}

pub fn member_schema() -> Schema {
	Schema::object([
		("uid", uid()),
		("name", Schema::string()),
		("fullName", Schema::string()),
		("summary", editable_markdown()),
		("conceptual", markdown()),
		(
			"syntax",
			Schema::object([
				("content", Schema::string()),
				("parameters", Schema::array(parameter_schema())),
			]),
		),
		(
			"isDeprecated",
			Schema::scalar()
				.with_value_type(ValueType::Boolean)
				.with_tag(DEFAULT_EDITABLE_TAG),
		),
	])
	.with_xref_properties(["name", "fullName"])
}

/// A reduced `ManagedReference` schema: a root uid with members in a keyed
/// `children` array.
pub fn managed_reference_schema() -> Schema {
	Schema::object([
		("uid", uid()),
		("name", Schema::string()),
		("fullName", Schema::string()),
		("summary", editable_markdown()),
		("conceptual", markdown()),
		("remarks", editable_markdown()),
		("href", Schema::string().with_content_type(ContentType::Href)),
		("seealso", Schema::array(Schema::string())),
		(
			"source",
			Schema::object([
				("path", Schema::string()),
				("line", Schema::scalar().with_value_type(ValueType::Integer)),
			])
			.with_merge_type(MergeType::Ignore),
		),
		("children", Schema::array(member_schema()).with_merge_key("uid")),
	])
	.with_xref_properties(["name", "fullName"])
}

pub fn registry() -> SchemaRegistry {
	let mut registry = SchemaRegistry::new();
	registry.insert(DocumentSchema::new(
		"ManagedReference",
		managed_reference_schema(),
	));
	registry
}

pub fn files() -> MemoryFileLayer {
	MemoryFileLayer::new()
		.with_file(STRING_DOCUMENT_PATH, STRING_DOCUMENT)
		.with_file(OBJECT_DOCUMENT_PATH, OBJECT_DOCUMENT)
		.with_file("overwrites/string.md", STRING_OVERWRITE)
}

pub fn options() -> OverwriteOptions {
	OverwriteOptions {
		parallelism: 2,
		..OverwriteOptions::default()
	}
}

pub fn engine(files: MemoryFileLayer) -> Engine {
	Engine::new(options(), Services::new(files))
}

/// Parse YAML test content.
pub fn yaml(text: &str) -> ContentNode {
	let value: serde_yaml_ng::Value =
		serde_yaml_ng::from_str(text).unwrap_or_else(|e| panic!("invalid yaml fixture: {e}"));
	value.into()
}
