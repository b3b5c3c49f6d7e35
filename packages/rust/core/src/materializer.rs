//! Publishing a section tree into the document store.

use tracing::{debug, info, instrument, warn};

use wikiforge_generation::{Generator, pick_icon};
use wikiforge_notion::DocumentStore;
use wikiforge_outline::{Heading, NodeId, SectionTree};
use wikiforge_shared::{ModelConfig, Result, WikiForgeError};

use crate::events::{Event, EventBus};

/// Attempts at appending an error marker for a failed node.
const MARKER_ATTEMPTS: usize = 2;

/// Outcome of publishing one tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub saved: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for MaterializeReport {
    fn add_assign(&mut self, rhs: Self) {
        self.saved += rhs.saved;
        self.failed += rhs.failed;
    }
}

/// Structural marker for an internal heading: `depth + 1` hashes, then the title.
///
/// Depth 0 intentionally renders as `# Title` so top-level nodes become
/// heading blocks too; do not drop the leading `#`.
pub fn heading_marker(heading: &Heading) -> String {
    format!("#{} {}", "#".repeat(heading.depth()), heading.title)
}

/// Inline marker appended in place of a node that could not be published.
pub fn error_marker(heading: &Heading, error: &WikiForgeError) -> String {
    format!("❌ ERROR: {} ❌ - {error}", heading.title)
}

pub struct Materializer<'a> {
    store: &'a dyn DocumentStore,
    generator: &'a dyn Generator,
    models: &'a ModelConfig,
    bus: &'a EventBus,
}

impl<'a> Materializer<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        generator: &'a dyn Generator,
        models: &'a ModelConfig,
        bus: &'a EventBus,
    ) -> Self {
        Self {
            store,
            generator,
            models,
            bus,
        }
    }

    /// Publish every node of `tree` under `container`, in document order.
    ///
    /// Leaves become child pages; internal nodes become heading blocks in the
    /// container. A node that fails is replaced by an inline error marker and
    /// traversal continues.
    #[instrument(skip_all, fields(tree = tree.title().unwrap_or_default(), container = %container))]
    pub async fn materialize(&self, tree: &SectionTree, container: &str) -> MaterializeReport {
        let mut report = MaterializeReport::default();

        for (id, heading) in tree.walk() {
            match self.publish(tree, id, heading, container).await {
                Ok(()) => {
                    report.saved += 1;
                    self.bus.fire(&Event::HeadingSaved { heading, container });
                    info!("saved '{}' to page", heading.label());
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(heading = %heading.label(), error = %e, "failed to publish heading");
                    self.write_error_marker(heading, container, &e).await;
                    let error = e.to_string();
                    self.bus.fire(&Event::HeadingFailed {
                        heading,
                        container,
                        error: &error,
                    });
                }
            }
        }

        report
    }

    async fn publish(
        &self,
        tree: &SectionTree,
        id: NodeId,
        heading: &Heading,
        container: &str,
    ) -> Result<()> {
        if tree.is_leaf(id) {
            let content = heading.content.as_deref().ok_or_else(|| {
                WikiForgeError::validation(format!("no content for '{}'", heading.label()))
            })?;
            let blocks = self.store.markdown_to_blocks(content);
            let icon = pick_icon(self.generator, &heading.title, self.models).await?;
            let page = self
                .store
                .create_child(container, &heading.title, icon.as_deref(), Some(&blocks))
                .await?;
            debug!(%page, blocks = blocks.len(), "section page created");
        } else {
            let blocks = self.store.markdown_to_blocks(&heading_marker(heading));
            self.store.append_blocks(container, &blocks).await?;
        }
        Ok(())
    }

    /// Append the error marker, retrying once before giving up.
    async fn write_error_marker(&self, heading: &Heading, container: &str, error: &WikiForgeError) {
        let blocks = self.store.markdown_to_blocks(&error_marker(heading, error));
        for attempt in 1..=MARKER_ATTEMPTS {
            match self.store.append_blocks(container, &blocks).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(heading = %heading.label(), attempt, error = %e, "failed to write error marker")
                }
            }
        }
    }
}
