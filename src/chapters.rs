use pulldown_cmark::{Event, Parser, TagEnd};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;

use crate::ebook::{Ebook, ItemKind};

/// Characters of body text used as a title when the document has none.
pub const DERIVED_TITLE_CHARS: usize = 60;

const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
}

impl BookMetadata {
    pub fn from_book(book: &Ebook) -> Self {
        let first = |key: &str, fallback: &str| {
            book.metadata(key)
                .iter()
                .find(|value| !value.trim().is_empty())
                .map_or_else(|| fallback.to_owned(), |value| value.trim().to_owned())
        };
        Self {
            title: first("title", UNTITLED),
            author: first("creator", UNKNOWN_AUTHOR),
        }
    }
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            title: UNTITLED.to_owned(),
            author: UNKNOWN_AUTHOR.to_owned(),
        }
    }
}

/// One chapter per content document, in spine order.
///
/// Text is whitespace-collapsed: every run of whitespace (including line
/// breaks between paragraphs) becomes a single space. Blank chapters are
/// kept here and dropped by the job builder. Only one document's bytes are
/// held at a time.
pub fn extract_chapters(book: &mut Ebook) -> anyhow::Result<Vec<Chapter>> {
    let mut chapters = Vec::new();
    for item in book.items() {
        let item = item?;
        if item.kind != ItemKind::Document {
            tracing::debug!(id = %item.id, kind = ?item.kind, "skipping non-content item");
            continue;
        }
        let href = item.path.display();

        let html = String::from_utf8_lossy(&item.bytes);
        let raw = html_to_text(&html);
        tracing::debug!(%href, "raw text: <{raw}>");

        let text = collapse_whitespace(&raw);
        tracing::info!(%href, "cleaned text: <{}>", preview(&text, 100));

        let title = match document_title(&html) {
            Some(title) if !title.trim().is_empty() => title,
            _ => preview(&text, DERIVED_TITLE_CHARS).to_owned(),
        };
        tracing::debug!("raw title: <{title}>");
        let title = sanitize_title(&title);
        tracing::info!("sanitized title: <{title}>");

        chapters.push(Chapter { title, text });
    }
    Ok(chapters)
}

/// Keeps word characters and whitespace, then joins the remaining words with `_`.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn html_to_text(html: &str) -> String {
    let markdown = html2md::parse_html(html);
    markdown_to_text(&markdown)
}

fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableCell
                | TagEnd::BlockQuote(_),
            ) => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Text of the first `<title>` element, if the document is well formed up to it.
fn document_title(html: &str) -> Option<String> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(true);

    let mut in_title = false;
    let mut title = String::new();
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if e.local_name().as_ref() == b"title" => in_title = true,
            Ok(XmlEvent::Text(text)) if in_title => match text.unescape() {
                Ok(value) => title.push_str(&value),
                Err(_) => title.push_str(&String::from_utf8_lossy(&text)),
            },
            Ok(XmlEvent::End(e)) if e.local_name().as_ref() == b"title" => {
                return Some(title.trim().to_owned());
            }
            Ok(XmlEvent::End(e)) if e.local_name().as_ref() == b"head" => return None,
            Ok(XmlEvent::Eof) => return None,
            Err(err) => {
                tracing::debug!(?err, "title scan stopped");
                return None;
            }
            _ => {}
        }
    }
}
