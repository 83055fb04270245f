//! Structured rich text
//!
//! Post bodies arrive as a list of blocks with styling spans. This module is
//! the only place that turns them into HTML: every text run and attribute is
//! escaped here, and link targets go through [`is_safe_url`]. Templates insert
//! the result without further escaping.

use serde::{Deserialize, Serialize};

use crate::helpers::{html_escape, is_safe_url, text_to_html};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image alternative text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Preformatted,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Styling over `text[start..end]`, offsets in UTF-16 code units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl BlockKind {
    fn list_tag(self) -> Option<&'static str> {
        match self {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OrderedListItem => Some("ol"),
            _ => None,
        }
    }

    fn carries_text(self) -> bool {
        !matches!(self, BlockKind::Image | BlockKind::Embed | BlockKind::Unknown)
    }
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten to plain text, blocks separated by a space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter(|b| b.kind.carries_text())
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to escaped HTML
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in &self.0 {
            let list = block.kind.list_tag();
            if list != open_list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }
            render_block(block, &mut html);
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

fn render_block(block: &Block, html: &mut String) {
    let tag = match block.kind {
        BlockKind::Paragraph => "p",
        BlockKind::Preformatted => "pre",
        BlockKind::Heading1 => "h1",
        BlockKind::Heading2 => "h2",
        BlockKind::Heading3 => "h3",
        BlockKind::Heading4 => "h4",
        BlockKind::Heading5 => "h5",
        BlockKind::Heading6 => "h6",
        BlockKind::ListItem | BlockKind::OrderedListItem => "li",
        BlockKind::Image => {
            match block.url.as_deref().filter(|u| is_safe_url(u)) {
                Some(url) => html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(url),
                    html_escape(block.alt.as_deref().unwrap_or_default())
                )),
                None => tracing::debug!("Dropping image block without a usable url"),
            }
            return;
        }
        BlockKind::Embed => {
            let embed = block.oembed.as_ref();
            match embed
                .and_then(|e| e.embed_url.as_deref())
                .filter(|u| is_safe_url(u))
            {
                Some(url) => {
                    let title = embed.and_then(|e| e.title.as_deref()).unwrap_or(url);
                    html.push_str(&format!(
                        r#"<div class="block-embed"><a href="{}">{}</a></div>"#,
                        html_escape(url),
                        html_escape(title)
                    ))
                }
                None => tracing::debug!("Dropping embed block without a usable url"),
            }
            return;
        }
        BlockKind::Unknown => {
            tracing::debug!("Skipping unknown rich text block");
            return;
        }
    };

    html.push_str(&format!("<{}>", tag));
    html.push_str(&render_spans(&block.text, &block.spans));
    html.push_str(&format!("</{}>", tag));
}

/// A span resolved to byte offsets with its tags prepared
struct Resolved {
    start: usize,
    end: usize,
    open: String,
    close: &'static str,
}

fn resolve(text: &str, span: &Span) -> Option<Resolved> {
    let start = byte_offset(text, span.start);
    let end = byte_offset(text, span.end);
    if start >= end {
        return None;
    }

    let (open, close) = match span.kind {
        SpanKind::Strong => ("<strong>".to_string(), "</strong>"),
        SpanKind::Em => ("<em>".to_string(), "</em>"),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref()?;
            let url = data.url.as_deref().filter(|u| is_safe_url(u))?;
            let target = match data.target.as_deref() {
                Some(t) => format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t)),
                None => String::new(),
            };
            (format!(r#"<a href="{}"{}>"#, html_escape(url), target), "</a>")
        }
        SpanKind::Label => {
            let label = span.data.as_ref()?.label.as_deref()?;
            (format!(r#"<span class="{}">"#, html_escape(label)), "</span>")
        }
        SpanKind::Unknown => return None,
    };

    Some(Resolved {
        start,
        end,
        open,
        close,
    })
}

/// Render text with its spans. The text is cut at every span boundary and
/// each piece is wrapped in the spans covering it, outermost first, so the
/// output is always well nested.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut resolved: Vec<Resolved> = spans.iter().filter_map(|s| resolve(text, s)).collect();
    if resolved.is_empty() {
        return text_to_html(text);
    }
    resolved.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut cuts: Vec<usize> = vec![0, text.len()];
    for span in &resolved {
        cuts.push(span.start);
        cuts.push(span.end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut html = String::new();
    for pair in cuts.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let covering: Vec<&Resolved> = resolved
            .iter()
            .filter(|s| s.start <= from && s.end >= to)
            .collect();

        for span in &covering {
            html.push_str(&span.open);
        }
        html.push_str(&text_to_html(&text[from..to]));
        for span in covering.iter().rev() {
            html.push_str(span.close);
        }
    }

    html
}

/// Convert a UTF-16 offset into a byte offset on a char boundary
fn byte_offset(text: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (index, c) in text.char_indices() {
        if units >= utf16 {
            return index;
        }
        units += c.len_utf16();
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RichText {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_as_text_joins_text_blocks() {
        let rich = parse(json!([
            {"type": "paragraph", "text": "Hello world", "spans": []},
            {"type": "image", "url": "https://img.example/a.png"},
            {"type": "list-item", "text": "one", "spans": []}
        ]));
        assert_eq!(rich.as_text(), "Hello world one");
    }

    #[test]
    fn test_as_html_escapes_text() {
        let rich = parse(json!([
            {"type": "paragraph", "text": "<script>alert('x')</script>", "spans": []}
        ]));
        assert_eq!(
            rich.as_html(),
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_lists_are_grouped() {
        let rich = parse(json!([
            {"type": "list-item", "text": "a", "spans": []},
            {"type": "list-item", "text": "b", "spans": []},
            {"type": "o-list-item", "text": "c", "spans": []},
            {"type": "paragraph", "text": "d", "spans": []}
        ]));
        assert_eq!(
            rich.as_html(),
            "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol><p>d</p>"
        );
    }

    #[test]
    fn test_spans_nest() {
        let rich = parse(json!([{
            "type": "paragraph",
            "text": "bold and italic",
            "spans": [
                {"start": 0, "end": 15, "type": "strong"},
                {"start": 9, "end": 15, "type": "em"}
            ]
        }]));
        assert_eq!(
            rich.as_html(),
            "<p><strong>bold and </strong><strong><em>italic</em></strong></p>"
        );
    }

    #[test]
    fn test_unsafe_link_rendered_as_text() {
        let rich = parse(json!([{
            "type": "paragraph",
            "text": "click me",
            "spans": [
                {"start": 0, "end": 5, "type": "hyperlink", "data": {"url": "javascript:alert(1)"}}
            ]
        }]));
        assert_eq!(rich.as_html(), "<p>click me</p>");
    }

    #[test]
    fn test_safe_link_with_target() {
        let rich = parse(json!([{
            "type": "paragraph",
            "text": "see docs",
            "spans": [
                {"start": 4, "end": 8, "type": "hyperlink",
                 "data": {"url": "https://docs.example/?a=1&b=2", "target": "_blank"}}
            ]
        }]));
        assert_eq!(
            rich.as_html(),
            r#"<p>see <a href="https://docs.example/?a=1&amp;b=2" target="_blank" rel="noopener noreferrer">docs</a></p>"#
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // "é" is one UTF-16 unit but two bytes; the emoji is two units
        let rich = parse(json!([{
            "type": "paragraph",
            "text": "é😀ok",
            "spans": [{"start": 3, "end": 5, "type": "strong"}]
        }]));
        assert_eq!(rich.as_html(), "<p>é😀<strong>ok</strong></p>");
    }

    #[test]
    fn test_unknown_types_are_tolerated() {
        let rich = parse(json!([
            {"type": "table", "text": "ignored"},
            {"type": "heading2", "text": "Title", "spans": [{"start": 0, "end": 5, "type": "glow"}]}
        ]));
        assert_eq!(rich.as_html(), "<h2>Title</h2>");
        assert_eq!(rich.as_text(), "Title");
    }

    #[test]
    fn test_newlines_become_breaks() {
        let rich = parse(json!([{"type": "preformatted", "text": "a\nb", "spans": []}]));
        assert_eq!(rich.as_html(), "<pre>a<br />b</pre>");
    }
}
