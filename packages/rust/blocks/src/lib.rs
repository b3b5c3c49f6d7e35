//! Markdown → Notion block conversion.
//!
//! Generated section content is Markdown; the document store only accepts its
//! own block objects. [`markdown_to_blocks`] is a line-oriented converter
//! covering what the writing prompts actually produce: headings, paragraphs,
//! lists, to-dos, quotes, fenced code and dividers, with inline emphasis,
//! code spans and links.

mod inline;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

pub use inline::{MAX_TEXT_LEN, RichText, parse_inline};

// ---------------------------------------------------------------------------
// Block model
// ---------------------------------------------------------------------------

/// One document-store block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading level 1–3 (deeper Markdown levels clamp to 3).
    Heading { level: u8, text: Vec<RichText> },
    Paragraph(Vec<RichText>),
    BulletedItem(Vec<RichText>),
    NumberedItem(Vec<RichText>),
    ToDo { checked: bool, text: Vec<RichText> },
    Quote(Vec<RichText>),
    Code { language: String, text: String },
    Divider,
    TableOfContents,
}

impl Block {
    /// Notion block type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heading { level: 1, .. } => "heading_1",
            Self::Heading { level: 2, .. } => "heading_2",
            Self::Heading { .. } => "heading_3",
            Self::Paragraph(_) => "paragraph",
            Self::BulletedItem(_) => "bulleted_list_item",
            Self::NumberedItem(_) => "numbered_list_item",
            Self::ToDo { .. } => "to_do",
            Self::Quote(_) => "quote",
            Self::Code { .. } => "code",
            Self::Divider => "divider",
            Self::TableOfContents => "table_of_contents",
        }
    }

    /// Serialize to the Notion block JSON shape.
    pub fn to_json(&self) -> serde_json::Value {
        let kind = self.kind();
        let body = match self {
            Self::Heading { text, .. }
            | Self::Paragraph(text)
            | Self::BulletedItem(text)
            | Self::NumberedItem(text)
            | Self::Quote(text) => serde_json::json!({ "rich_text": rich_text_json(text) }),
            Self::ToDo { checked, text } => serde_json::json!({
                "rich_text": rich_text_json(text),
                "checked": checked,
            }),
            Self::Code { language, text } => serde_json::json!({
                "rich_text": rich_text_json(&split_plain(text)),
                "language": language,
            }),
            Self::Divider => serde_json::json!({}),
            Self::TableOfContents => serde_json::json!({ "color": "default" }),
        };
        serde_json::json!({ "object": "block", "type": kind, kind: body })
    }
}

fn rich_text_json(runs: &[RichText]) -> Vec<serde_json::Value> {
    runs.iter().map(RichText::to_json).collect()
}

/// Unannotated runs for verbatim text (code blocks).
fn split_plain(text: &str) -> Vec<RichText> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_TEXT_LEN)
        .map(|c| RichText::plain(c.iter().collect::<String>()))
        .collect()
}

/// Table-of-contents block placed at the top of a root page.
pub fn table_of_contents() -> Block {
    Block::TableOfContents
}

/// Horizontal divider block.
pub fn divider() -> Block {
    Block::Divider
}

/// Serialize a slice of blocks for an API payload.
pub fn to_json_array(blocks: &[Block]) -> Vec<serde_json::Value> {
    blocks.iter().map(Block::to_json).collect()
}

// ---------------------------------------------------------------------------
// Line patterns (compiled once)
// ---------------------------------------------------------------------------

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").expect("heading regex"));

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```\s*([\w+#-]*)\s*$").expect("fence regex"));

static DIVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-*_])(\s*[-*_]){2,}\s*$").expect("divider regex"));

static TODO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+\[([ xX])\]\s+(.*)$").expect("todo regex"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("bullet regex"));

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").expect("numbered regex"));

static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s?(.*)$").expect("quote regex"));

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert Markdown text into document-store blocks.
///
/// Consecutive plain lines join into one paragraph; a blank line ends it.
/// An unterminated code fence runs to the end of the input.
#[instrument(skip_all, fields(len = markdown.len()))]
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut lines = markdown.lines();

    while let Some(line) = lines.next() {
        if let Some(caps) = FENCE_RE.captures(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let language = code_language(&caps[1]);
            let mut body: Vec<&str> = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                body.push(inner);
            }
            blocks.push(Block::Code {
                language,
                text: body.join("\n"),
            });
            continue;
        }

        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        let block = if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len().min(3) as u8;
            Some(Block::Heading {
                level,
                text: parse_inline(&caps[2]),
            })
        } else if DIVIDER_RE.is_match(line) {
            Some(Block::Divider)
        } else if let Some(caps) = TODO_RE.captures(line) {
            Some(Block::ToDo {
                checked: !caps[1].trim().is_empty(),
                text: parse_inline(&caps[2]),
            })
        } else if let Some(caps) = BULLET_RE.captures(line) {
            Some(Block::BulletedItem(parse_inline(&caps[1])))
        } else if let Some(caps) = NUMBERED_RE.captures(line) {
            Some(Block::NumberedItem(parse_inline(&caps[1])))
        } else if let Some(caps) = QUOTE_RE.captures(line) {
            Some(Block::Quote(parse_inline(&caps[1])))
        } else {
            None
        };

        match block {
            Some(b) => {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(b);
            }
            None => paragraph.push(line.trim()),
        }
    }
    flush_paragraph(&mut paragraph, &mut blocks);

    debug!(blocks = blocks.len(), "markdown converted");
    blocks
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if paragraph.is_empty() {
        return;
    }
    blocks.push(Block::Paragraph(parse_inline(&paragraph.join(" "))));
    paragraph.clear();
}

/// Map a fence info string to a language name the API accepts.
fn code_language(info: &str) -> String {
    let lang = match info.to_ascii_lowercase().as_str() {
        "rust" | "rs" => "rust",
        "python" | "py" => "python",
        "javascript" | "js" => "javascript",
        "typescript" | "ts" => "typescript",
        "bash" | "sh" | "shell" | "zsh" => "shell",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "go" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "c++" => "c++",
        "c#" | "csharp" => "c#",
        "markdown" | "md" => "markdown",
        _ => "plain text",
    };
    lang.to_string()
}
