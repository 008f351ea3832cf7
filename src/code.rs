//! Renderable code blocks built from annotated declarations.

use crate::annotate::{FormattedDecl, Label, Region};
use crate::error::Error;
use crate::lexer::{self, TokenKind};
use crate::link::{DocLink, LinkResolver};

/// Message shown in place of a declaration that could not be formatted.
pub const FORMAT_FAILED: &str = "Could not format declaration";

/// A code block: spans in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    /// Spans in order. Their texts concatenate to the block's source.
    pub spans: Vec<Span>,
}

/// Part of a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// Addressable declaration site.
    Anchor {
        /// Fragment identifier: `Name` or `Parent.Name`.
        id: String,
        /// Displayed text.
        text: String,
    },
    /// Comment, rendered muted.
    Comment(String),
    /// Something went wrong producing this block. Rendered visibly.
    Error {
        /// Underlying error.
        cause: String,
        /// What failed.
        message: String,
    },
    /// Clickable reference.
    Link {
        /// Link target.
        dest: String,
        /// Displayed text.
        text: String,
    },
    /// Plain text.
    Text(String),
}

/// Builds [`Code`] from a formatted declaration and its regions.
pub struct CodeBuilder<'a, R: LinkResolver> {
    /// Import path of the package whose page the code appears on.
    from: &'a str,
    /// Link destinations.
    resolver: &'a R,
}

impl Code {
    /// A block that only reports a failure.
    pub fn error(message: &str, cause: &Error) -> Self {
        return Self {
            spans: vec![Span::Error {
                cause: cause.to_string(),
                message: message.to_owned(),
            }],
        };
    }

    /// Code shown as written, with only its comments marked.
    pub fn highlight(source: &str) -> Self {
        let mut spans = Vec::new();
        let mut last = 0;
        for token in lexer::tokenize(source) {
            if token.kind != TokenKind::Comment {
                continue;
            }
            let gap = source.get(last..token.range.start);
            let comment = source.get(token.range.clone());
            let (Some(gap), Some(comment)) = (gap, comment) else {
                continue;
            };
            push_text(&mut spans, gap);
            spans.push(Span::Comment(comment.to_owned()));
            last = token.range.end;
        }
        push_text(&mut spans, source.get(last..).unwrap_or(""));
        return Self { spans };
    }

    /// Source text of the block, without markup.
    pub fn plain(&self) -> String {
        return self.spans.iter().filter_map(Span::text).collect();
    }
}

impl Span {
    /// Displayed text, if this span has any.
    pub fn text(&self) -> Option<&str> {
        return match self {
            Self::Anchor { text, .. } | Self::Link { text, .. } => Some(text.as_str()),
            Self::Comment(text) | Self::Text(text) => Some(text.as_str()),
            Self::Error { .. } => None,
        };
    }
}

impl<'a, R: LinkResolver> CodeBuilder<'a, R> {
    /// Turn a declaration into spans. Text between regions becomes
    /// [`Span::Text`], with adjacent text merged.
    pub fn build(&self, decl: &FormattedDecl) -> Code {
        let source = decl.source.as_str();
        let mut spans = Vec::new();
        let mut last = 0;

        for region in &decl.regions {
            let start = region.offset;
            let end = start.saturating_add(region.length);
            let (Some(gap), Some(text)) = (source.get(last..start), source.get(start..end)) else {
                tracing::debug!(
                    offset = start,
                    length = region.length,
                    "Skipping region outside declaration"
                );
                continue;
            };
            push_text(&mut spans, gap);
            spans.push(self.span(region, text));
            last = end;
        }
        push_text(&mut spans, source.get(last..).unwrap_or(""));

        return Code { spans };
    }

    /// Create a builder for code on the page of package `from`.
    pub fn new(from: &'a str, resolver: &'a R) -> Self {
        return Self { from, resolver };
    }

    /// The span for one region.
    fn span(&self, region: &Region, text: &str) -> Span {
        let text = text.to_owned();
        return match &region.label {
            Label::Comment => Span::Comment(text),
            Label::Decl { name, parent } => Span::Anchor {
                id: parent
                    .as_ref()
                    .map_or_else(|| return name.clone(), |p| return format!("{p}.{name}")),
                text,
            },
            Label::EntityRef { import_path, name } => {
                let link = DocLink {
                    import_path: import_path.clone().unwrap_or_default(),
                    name: name.clone(),
                    recv: None,
                };
                Span::Link {
                    dest: self.resolver.doc_link_url(self.from, &link),
                    text,
                }
            },
            Label::PackageRef { import_path } => Span::Link {
                dest: self.resolver.package_url(self.from, import_path),
                text,
            },
        };
    }
}

/// Append plain text, merging it into a preceding text span.
fn push_text(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Text(prev)) = spans.last_mut() {
        prev.push_str(text);
        return;
    }
    spans.push(Span::Text(text.to_owned()));
}
