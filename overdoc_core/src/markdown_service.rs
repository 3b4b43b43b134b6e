use markdown::CompileOptions;
use markdown::Constructs;
use markdown::Options;
use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_html_with_options;
use markdown::to_mdast;

use crate::ContentNode;
use crate::OverdocError;
use crate::OverdocResult;
use crate::files::is_relative_link;
use crate::files::resolve_relative;

/// A link found in rendered content, with where it was found.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkSource {
	/// The linked file path or uid.
	pub target: String,
	/// The file containing the link.
	pub source_file: String,
	/// 1-indexed line within the rendered text, when known.
	pub line: Option<usize>,
}

/// The output of [`MarkdownService::render`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedMarkdown {
	pub html: String,
	/// Relative file links, resolved against the source path.
	pub linked_files: Vec<LinkSource>,
	/// Uids linked with `xref:` urls.
	pub linked_uids: Vec<LinkSource>,
	pub front_matter: Option<ContentNode>,
}

/// Renders markdown and extracts the links it contains. Implementations must
/// be pure: the same input always yields the same output.
pub trait MarkdownService: Send + Sync {
	fn render(&self, markdown: &str, source_path: &str) -> OverdocResult<RenderedMarkdown>;
}

/// GitHub-flavored markdown rendered by the `markdown` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GfmMarkdownService;

impl GfmMarkdownService {
	fn parse_options() -> ParseOptions {
		ParseOptions {
			constructs: Constructs {
				frontmatter: true,
				..Constructs::gfm()
			},
			..ParseOptions::gfm()
		}
	}
}

impl MarkdownService for GfmMarkdownService {
	fn render(&self, markdown: &str, source_path: &str) -> OverdocResult<RenderedMarkdown> {
		let options = Options {
			parse: Self::parse_options(),
			compile: CompileOptions {
				allow_dangerous_html: true,
				..CompileOptions::gfm()
			},
		};

		let html = to_html_with_options(markdown, &options)
			.map_err(|e| OverdocError::Markdown(e.to_string()))?;
		let mdast = to_mdast(markdown, &options.parse)
			.map_err(|e| OverdocError::Markdown(e.to_string()))?;

		let mut rendered = RenderedMarkdown {
			html,
			..RenderedMarkdown::default()
		};
		collect_links(&mdast, source_path, &mut rendered)?;

		Ok(rendered)
	}
}

fn collect_links(
	node: &Node,
	source_path: &str,
	rendered: &mut RenderedMarkdown,
) -> OverdocResult<()> {
	let url = match node {
		Node::Link(link) => Some(link.url.as_str()),
		Node::Definition(definition) => Some(definition.url.as_str()),
		Node::Image(image) => Some(image.url.as_str()),
		Node::Yaml(yaml) => {
			let value: serde_yaml_ng::Value =
				serde_yaml_ng::from_str(&yaml.value).map_err(|e| OverdocError::Yaml {
					file: source_path.to_string(),
					reason: e.to_string(),
				})?;
			rendered.front_matter = Some(value.into());
			None
		}
		_ => None,
	};

	if let Some(url) = url {
		let line = node.position().map(|position| position.start.line);
		let source_file = source_path.to_string();

		if let Some(uid) = url.strip_prefix("xref:") {
			let uid = uid.split(['?', '#']).next().unwrap_or_default();
			if !uid.is_empty() {
				rendered.linked_uids.push(LinkSource {
					target: uid.to_string(),
					source_file,
					line,
				});
			}
		} else if is_relative_link(url) {
			let resolved = resolve_relative(source_path, url);
			let target = resolved.split(['?', '#']).next().unwrap_or_default();
			if !target.is_empty() {
				rendered.linked_files.push(LinkSource {
					target: target.to_string(),
					source_file,
					line,
				});
			}
		}
	}

	if let Some(children) = node.children() {
		for child in children {
			collect_links(child, source_path, rendered)?;
		}
	}

	Ok(())
}
