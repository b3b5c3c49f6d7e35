//! Bounded fan-out of leaf content generation.
//!
//! One batch per section tree: every leaf heading becomes a task, at most
//! `concurrency` of them talk to the generator at once, and the caller waits
//! for the whole batch. Results are assigned back by position in
//! [`SectionTree::writable_headings`], which is stable for an unmodified tree.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use wikiforge_generation::{Generator, write_section};
use wikiforge_outline::SectionTree;
use wikiforge_shared::{ModelConfig, Result, WikiForgeError, WritingMethod};

use crate::events::{Event, EventBus};

/// Default worker-pool size.
pub const DEFAULT_CONCURRENCY: usize = 5;

pub struct Scheduler {
    generator: Arc<dyn Generator>,
    models: Arc<ModelConfig>,
    bus: Arc<EventBus>,
    concurrency: usize,
    method: WritingMethod,
}

impl Scheduler {
    pub fn new(
        generator: Arc<dyn Generator>,
        models: Arc<ModelConfig>,
        bus: Arc<EventBus>,
        concurrency: usize,
        method: WritingMethod,
    ) -> Self {
        Self {
            generator,
            models,
            bus,
            concurrency: concurrency.max(1),
            method,
        }
    }

    /// Generate content for every tree, one batch at a time.
    pub async fn generate_all(&self, trees: &mut [SectionTree], title: &str) -> Result<usize> {
        let mut written = 0;
        for tree in trees.iter_mut() {
            written += self.generate_tree(tree, title).await?;
        }
        Ok(written)
    }

    /// Generate content for every leaf of `tree` and store it on the tree.
    ///
    /// The first failing task aborts the rest of the batch and its error is
    /// returned; the tree is left without content in that case.
    #[instrument(skip_all, fields(tree = tree.title().unwrap_or_default(), concurrency = self.concurrency))]
    pub async fn generate_tree(&self, tree: &mut SectionTree, title: &str) -> Result<usize> {
        let leaves = tree.writable_headings();
        let context: Arc<str> = Arc::from(tree.render());
        let title: Arc<str> = Arc::from(title);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut handles = Vec::with_capacity(leaves.len());
        for id in &leaves {
            let heading = tree.heading(*id).clone();
            let generator = Arc::clone(&self.generator);
            let models = Arc::clone(&self.models);
            let context = Arc::clone(&context);
            let title = Arc::clone(&title);
            let sem = Arc::clone(&semaphore);
            let method = self.method;

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| WikiForgeError::Task(format!("worker pool closed: {e}")))?;
                debug!(heading = %heading.label(), "writing section");
                write_section(generator.as_ref(), &context, &heading, &title, method, &models)
                    .await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some(handle) = pending.next() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(WikiForgeError::Task(format!("section worker failed: {e}"))),
            };
            match outcome {
                Ok(content) => results.push(content),
                Err(e) => {
                    let rest: Vec<_> = pending.collect();
                    for handle in &rest {
                        handle.abort();
                    }
                    // Drain the pool before reporting the failure.
                    for handle in rest {
                        if let Err(join) = handle.await {
                            if !join.is_cancelled() {
                                warn!(error = %join, "section worker failed during shutdown");
                            }
                        }
                    }
                    return Err(e);
                }
            }
        }

        let count = results.len();
        for (id, content) in tree.writable_headings().into_iter().zip(results) {
            tree.set_content(id, content);
        }

        info!(sections = count, "section content generated");
        self.bus.fire(&Event::SectionGenerated { tree });
        Ok(count)
    }
}
