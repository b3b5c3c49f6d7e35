//! In-memory collaborators for scheduler, materializer and pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use wikiforge_blocks::Block;
use wikiforge_generation::{Generator, Prompt, prompts};
use wikiforge_notion::DocumentStore;
use wikiforge_shared::{Model, ModelConfig, Result, WikiForgeError};

pub(crate) fn models() -> ModelConfig {
    ModelConfig::new("test-key")
}

/// Text of every paragraph/heading run in `blocks`, joined.
pub(crate) fn block_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| match b {
            Block::Heading { text, .. } | Block::Paragraph(text) => {
                text.iter().map(|r| r.content.as_str()).collect::<String>()
            }
            _ => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// FakeGenerator
// ---------------------------------------------------------------------------

/// Answers each phase by its system prompt.
///
/// Section replies echo the heading label so results can be matched back to
/// headings. Writing fails for any subject containing `fail_on`.
pub(crate) struct FakeGenerator {
    pub outline: String,
    pub category: String,
    pub fail_on: Option<String>,
    /// Per-call delay for writing requests, keyed by heading label.
    pub delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(outline: &str) -> Self {
        Self {
            outline: outline.to_string(),
            category: "Science".into(),
            fail_on: None,
            delays: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// The quoted `index: title` objective embedded in a writer subject.
    fn objective(subject: &str) -> &str {
        subject
            .split("on the topic '")
            .nth(1)
            .and_then(|rest| rest.split("'.").next())
            .unwrap_or(subject)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &Prompt, _model: &Model) -> Result<String> {
        match prompt.instructions.as_str() {
            prompts::OUTLINE => Ok(self.outline.clone()),
            prompts::CATEGORISER => Ok(self.category.clone()),
            prompts::ICONS => Ok("🔥".into()),
            _ => {
                let label = Self::objective(&prompt.subject).to_string();
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                let delay = self.delays.get(&label).copied().unwrap_or(Duration::from_millis(5));
                tokio::time::sleep(delay).await;

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.writes.fetch_add(1, Ordering::SeqCst);

                if let Some(needle) = &self.fail_on {
                    if label.contains(needle.as_str()) {
                        return Err(WikiForgeError::Generation(format!("refused {label}")));
                    }
                }
                Ok(format!("Content for {label}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    CreateRoot { title: String, category: String },
    Append { id: String, text: String, blocks: usize },
    CreateChild { parent: String, title: String, icon: Option<String>, text: String },
    SetStatus { id: String, status: String },
    AddCategory { name: String },
}

/// Records every call; failures are injected by title or text.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub ops: Mutex<Vec<Op>>,
    pub categories: Mutex<Vec<String>>,
    /// `create_child` fails for these titles.
    pub fail_child: Vec<String>,
    /// `append_blocks` fails when the appended text contains this, this many times.
    pub fail_append: Mutex<Option<(String, usize)>>,
    pub fail_root: bool,
    pub fail_status: bool,
}

impl FakeStore {
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn create_root(
        &self,
        _parent_id: &str,
        title: &str,
        category: &str,
        _icon: Option<&str>,
    ) -> Result<String> {
        if self.fail_root {
            return Err(WikiForgeError::document_store(500, "root refused"));
        }
        self.record(Op::CreateRoot {
            title: title.into(),
            category: category.into(),
        });
        Ok("root".into())
    }

    async fn append_blocks(&self, id: &str, blocks: &[Block]) -> Result<()> {
        let text = block_text(blocks);
        {
            let mut fail = self.fail_append.lock().unwrap();
            if let Some((needle, remaining)) = fail.as_mut() {
                if *remaining > 0 && text.contains(needle.as_str()) {
                    *remaining -= 1;
                    return Err(WikiForgeError::document_store(502, "append refused"));
                }
            }
        }
        self.record(Op::Append {
            id: id.into(),
            text,
            blocks: blocks.len(),
        });
        Ok(())
    }

    async fn create_child(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        blocks: Option<&[Block]>,
    ) -> Result<String> {
        if self.fail_child.iter().any(|t| t == title) {
            return Err(WikiForgeError::document_store(400, format!("cannot create {title}")));
        }
        self.record(Op::CreateChild {
            parent: parent_id.into(),
            title: title.into(),
            icon: icon.map(String::from),
            text: blocks.map(block_text).unwrap_or_default(),
        });
        Ok(format!("page-{title}"))
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<()> {
        if self.fail_status {
            return Err(WikiForgeError::document_store(500, "status refused"));
        }
        self.record(Op::SetStatus {
            id: id.into(),
            status: status.into(),
        });
        Ok(())
    }

    async fn list_category_options(&self, _parent_id: &str) -> Result<Vec<String>> {
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn add_category_option(&self, _parent_id: &str, name: &str) -> Result<()> {
        self.categories.lock().unwrap().push(name.to_string());
        self.record(Op::AddCategory { name: name.into() });
        Ok(())
    }
}
