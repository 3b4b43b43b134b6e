use logos::Logos;
use snailquote::unescape;

use crate::OverdocError;
use crate::OverdocResult;
use crate::opath::Segment;

/// Raw tokens produced by logos for an object path.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
	#[token("/")]
	Slash,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	#[token("=")]
	Equals,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r#"([^/\[\]="'~]|~[01])+"#)]
	Name,
}

/// Where the walker currently is inside a path.
enum PathContext {
	/// Expecting `/` or `[`.
	Separator,
	/// Just consumed `/`, expecting a property name or index.
	Segment,
	/// Inside `[`, expecting the filter key.
	FilterKey,
	/// After the filter key, expecting `=`.
	FilterEquals { key: String },
	/// After `=`, expecting a quoted value.
	FilterValue { key: String },
	/// After the quoted value, expecting `]`.
	FilterClose { key: String, value: String },
}

/// Walks the logos token stream and builds path segments.
struct SegmentWalker<'a> {
	/// The full path being parsed, used in error messages.
	source: &'a str,
	/// The collected raw tokens and their byte spans.
	raw_tokens: Vec<(Result<RawToken, ()>, std::ops::Range<usize>)>,
	/// Current index into `raw_tokens`.
	cursor: usize,
	context: PathContext,
	segments: Vec<Segment>,
}

impl<'a> SegmentWalker<'a> {
	fn new(source: &'a str) -> Self {
		let raw_tokens: Vec<_> = RawToken::lexer(source).spanned().collect();

		Self {
			source,
			raw_tokens,
			cursor: 0,
			context: PathContext::Separator,
			segments: vec![],
		}
	}

	fn current_slice(&self) -> &'a str {
		let (_, span) = &self.raw_tokens[self.cursor];
		&self.source[span.clone()]
	}

	fn error(&self, reason: impl Into<String>) -> OverdocError {
		OverdocError::InvalidPath {
			path: self.source.to_string(),
			reason: reason.into(),
		}
	}

	fn unquote(&self) -> OverdocResult<String> {
		unescape(self.current_slice()).map_err(|e| self.error(e.to_string()))
	}

	fn process(mut self) -> OverdocResult<Vec<Segment>> {
		while self.cursor < self.raw_tokens.len() {
			let (result, span) = self.raw_tokens[self.cursor].clone();
			let Ok(raw) = result else {
				return Err(self.error(format!("unexpected character at offset {}", span.start)));
			};
			let slice = self.current_slice();

			let context = std::mem::replace(&mut self.context, PathContext::Separator);
			self.context = match (context, raw) {
				(PathContext::Separator, RawToken::Slash) => PathContext::Segment,
				(PathContext::Separator, RawToken::BracketOpen) => {
					if self.segments.is_empty() {
						return Err(self.error("a filter must follow a property"));
					}
					PathContext::FilterKey
				}
				(PathContext::Segment, RawToken::Name) => {
					self.segments.push(parse_name_segment(slice));
					PathContext::Separator
				}
				(PathContext::FilterKey, RawToken::Name) => {
					PathContext::FilterEquals {
						key: unescape_name(slice.trim()),
					}
				}
				// Whitespace around `=` and the quoted value.
				(
					context @ (PathContext::FilterEquals { .. }
					| PathContext::FilterValue { .. }
					| PathContext::FilterClose { .. }),
					RawToken::Name,
				) if slice.trim().is_empty() => context,
				(PathContext::FilterEquals { key }, RawToken::Equals) => {
					PathContext::FilterValue { key }
				}
				(
					PathContext::FilterValue { key },
					RawToken::DoubleQuotedString | RawToken::SingleQuotedString,
				) => {
					PathContext::FilterClose {
						key,
						value: self.unquote()?,
					}
				}
				(PathContext::FilterClose { key, value }, RawToken::BracketClose) => {
					self.segments.push(Segment::Filter { key, value });
					PathContext::Separator
				}
				(PathContext::Segment, _) => {
					return Err(self.error("expected a property name after `/`"));
				}
				(_, _) => {
					return Err(
						self.error(format!("unexpected `{slice}` at offset {}", span.start))
					);
				}
			};
			self.cursor += 1;
		}

		match self.context {
			PathContext::Separator => Ok(self.segments),
			PathContext::Segment => Err(self.error("path ends with `/`")),
			_ => Err(self.error("unterminated filter")),
		}
	}
}

/// Names that are all digits address an array index.
fn parse_name_segment(slice: &str) -> Segment {
	if !slice.is_empty() && slice.bytes().all(|byte| byte.is_ascii_digit()) {
		if let Ok(index) = slice.parse::<usize>() {
			return Segment::Index(index);
		}
	}

	Segment::Property(unescape_name(slice))
}

fn unescape_name(slice: &str) -> String {
	if slice.contains('~') {
		slice.replace("~1", "/").replace("~0", "~")
	} else {
		slice.to_string()
	}
}

pub(crate) fn escape_name(name: &str) -> String {
	if name.contains(['~', '/']) {
		name.replace('~', "~0").replace('/', "~1")
	} else {
		name.to_string()
	}
}

pub(crate) fn tokenize(source: &str) -> OverdocResult<Vec<Segment>> {
	SegmentWalker::new(source).process()
}
