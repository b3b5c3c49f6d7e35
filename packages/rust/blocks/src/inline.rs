//! Inline Markdown → rich-text runs.
//!
//! Recognised spans: `**bold**`, `*italic*`, `` `code` ``, `[text](url)`.
//! Nested emphasis is not interpreted; the inner text is kept verbatim.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum characters the Notion API accepts in one rich-text object.
pub const MAX_TEXT_LEN: usize = 2000;

static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(?P<bold>[^*]+?)\*\*|`(?P<code>[^`]+)`|\[(?P<text>[^\]]+)\]\((?P<url>[^)\s]+)\)|\*(?P<italic>[^*\s][^*]*?)\*")
        .expect("inline regex")
});

/// A run of text with uniform annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub content: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: Option<String>,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Notion `rich_text` object.
    pub fn to_json(&self) -> serde_json::Value {
        let link = match &self.link {
            Some(url) => serde_json::json!({ "url": url }),
            None => serde_json::Value::Null,
        };
        serde_json::json!({
            "type": "text",
            "text": { "content": self.content, "link": link },
            "annotations": {
                "bold": self.bold,
                "italic": self.italic,
                "strikethrough": false,
                "underline": false,
                "code": self.code,
                "color": "default",
            },
        })
    }
}

/// Split a line of Markdown into annotated runs.
pub fn parse_inline(text: &str) -> Vec<RichText> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for caps in INLINE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            runs.push(RichText::plain(&text[cursor..whole.start()]));
        }

        let run = if let Some(m) = caps.name("bold") {
            RichText {
                bold: true,
                ..RichText::plain(m.as_str())
            }
        } else if let Some(m) = caps.name("code") {
            RichText {
                code: true,
                ..RichText::plain(m.as_str())
            }
        } else if let (Some(t), Some(u)) = (caps.name("text"), caps.name("url")) {
            RichText {
                link: Some(u.as_str().to_string()),
                ..RichText::plain(t.as_str())
            }
        } else if let Some(m) = caps.name("italic") {
            RichText {
                italic: true,
                ..RichText::plain(m.as_str())
            }
        } else {
            RichText::plain(whole.as_str())
        };
        runs.push(run);
        cursor = whole.end();
    }

    if cursor < text.len() {
        runs.push(RichText::plain(&text[cursor..]));
    }

    split_long_runs(runs)
}

/// Break runs longer than [`MAX_TEXT_LEN`] characters, keeping annotations.
fn split_long_runs(runs: Vec<RichText>) -> Vec<RichText> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if run.content.chars().count() <= MAX_TEXT_LEN {
            out.push(run);
            continue;
        }
        let chars: Vec<char> = run.content.chars().collect();
        for chunk in chars.chunks(MAX_TEXT_LEN) {
            out.push(RichText {
                content: chunk.iter().collect(),
                ..run.clone()
            });
        }
    }
    out
}
