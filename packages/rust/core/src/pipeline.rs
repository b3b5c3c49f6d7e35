//! End-to-end generation pipeline: title → category → root page → outline →
//! section content → published tree.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use wikiforge_blocks::{divider, table_of_contents};
use wikiforge_generation::{Generator, classify, generate_outline, pick_icon};
use wikiforge_notion::DocumentStore;
use wikiforge_outline::parse_outline;
use wikiforge_shared::{ModelConfig, Result, RunId, WritingMethod};

use crate::events::{Event, EventBus};
use crate::materializer::{MaterializeReport, Materializer};
use crate::scheduler::{DEFAULT_CONCURRENCY, Scheduler};

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Pipeline state-machine stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    CategoryResolution,
    RootSetup,
    OutlineGeneration,
    ContentGeneration,
    Materialization,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CategoryResolution => "category_resolution",
            Self::RootSetup => "root_setup",
            Self::OutlineGeneration => "outline_generation",
            Self::ContentGeneration => "content_generation",
            Self::Materialization => "materialization",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one run. Lives only for the duration of [`Pipeline::run`].
#[derive(Debug)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub title: String,
    pub category: Option<String>,
    pub root_id: Option<String>,
    stage: Stage,
}

impl PipelineRun {
    fn new(run_id: RunId, title: &str) -> Self {
        Self {
            run_id,
            title: title.to_string(),
            category: None,
            root_id: None,
            stage: Stage::Start,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        info!(run = %self.run_id, from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub title: String,
    pub category: String,
    pub root_id: String,
    pub trees: usize,
    pub headings_saved: usize,
    pub headings_failed: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Per-run settings that are not model selection.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Database the root page is created in.
    pub database_id: String,
    /// Worker-pool size for section writing.
    pub concurrency: usize,
    pub method: WritingMethod,
    /// Status value written on success.
    pub done_label: String,
    /// Status value written on failure.
    pub failed_label: String,
}

impl PipelineSettings {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            concurrency: DEFAULT_CONCURRENCY,
            method: WritingMethod::default(),
            done_label: "Done".into(),
            failed_label: "Failed".into(),
        }
    }
}

pub struct Pipeline {
    generator: Arc<dyn Generator>,
    store: Arc<dyn DocumentStore>,
    models: Arc<ModelConfig>,
    bus: Arc<EventBus>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn DocumentStore>,
        models: ModelConfig,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            store,
            models: Arc::new(models),
            bus: Arc::new(EventBus::new()),
            settings,
        }
    }

    /// The bus this pipeline fires progress events on.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Run the pipeline for `title` under a fresh run id.
    pub async fn run(&self, title: &str) -> Result<RunReport> {
        self.run_with_id(RunId::new(), title).await
    }

    /// Run the pipeline for `title`.
    ///
    /// Any error after the start event marks the root page failed (when it
    /// exists), fires [`Event::Failed`], and is returned unchanged.
    #[instrument(skip_all, fields(run = %run_id, title = %title))]
    pub async fn run_with_id(&self, run_id: RunId, title: &str) -> Result<RunReport> {
        let started = Instant::now();
        let mut run = PipelineRun::new(run_id, title);

        info!("starting generation pipeline");
        self.bus.fire(&Event::Started { title });

        match self.execute(&mut run).await {
            Ok((trees, published)) => {
                run.advance(Stage::Complete);
                self.bus.fire(&Event::Completed { title });

                let report = RunReport {
                    run_id: run.run_id,
                    title: run.title,
                    category: run.category.unwrap_or_default(),
                    root_id: run.root_id.unwrap_or_default(),
                    trees,
                    headings_saved: published.saved,
                    headings_failed: published.failed,
                    elapsed: started.elapsed(),
                };
                info!(
                    trees = report.trees,
                    saved = report.headings_saved,
                    failed = report.headings_failed,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "generation pipeline complete"
                );
                Ok(report)
            }
            Err(err) => {
                let failed_in = run.stage();
                run.advance(Stage::Failed);
                warn!(stage = %failed_in, error = %err, "generation pipeline failed");
                self.fail(&run).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, run: &mut PipelineRun) -> Result<(usize, MaterializeReport)> {
        let generator = self.generator.as_ref();
        let store = self.store.as_ref();
        let models = self.models.as_ref();
        let database = self.settings.database_id.as_str();

        // --- Category ---
        run.advance(Stage::CategoryResolution);
        let known = store.list_category_options(database).await?;
        let category = classify(generator, &run.title, &known, models).await?;
        if !known.iter().any(|k| k == &category) {
            info!(%category, "creating new category");
            store.add_category_option(database, &category).await?;
        }
        self.bus.fire(&Event::CategoryFound {
            category: &category,
        });
        run.category = Some(category.clone());

        // --- Root page ---
        run.advance(Stage::RootSetup);
        let icon = pick_icon(generator, &run.title, models).await?;
        let root_id = store
            .create_root(database, &run.title, &category, icon.as_deref())
            .await?;
        run.root_id = Some(root_id.clone());
        store
            .append_blocks(&root_id, &[table_of_contents(), divider()])
            .await?;
        self.bus.fire(&Event::PageSetup {
            title: &run.title,
            page_id: &root_id,
        });

        // --- Outline ---
        run.advance(Stage::OutlineGeneration);
        let outline = generate_outline(generator, &run.title, models).await?;
        let mut trees = parse_outline(&outline);
        if trees.is_empty() {
            warn!("outline contained no numbered headings");
        }
        self.bus.fire(&Event::SectionsGenerated { trees: &trees });

        // --- Content ---
        run.advance(Stage::ContentGeneration);
        let scheduler = Scheduler::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.models),
            Arc::clone(&self.bus),
            self.settings.concurrency,
            self.settings.method,
        );
        scheduler.generate_all(&mut trees, &run.title).await?;

        // --- Publish ---
        run.advance(Stage::Materialization);
        let materializer = Materializer::new(store, generator, models, &self.bus);
        let total = trees.len();
        let mut published = MaterializeReport::default();
        for (i, tree) in trees.iter().enumerate() {
            published += materializer.materialize(tree, &root_id).await;
            self.bus.fire(&Event::SectionWritten {
                index: i + 1,
                total,
            });
        }
        store
            .set_status(&root_id, &self.settings.done_label)
            .await?;

        Ok((total, published))
    }

    /// Report a failed run and mark its root page, if any.
    async fn fail(&self, run: &PipelineRun) {
        self.bus.fire(&Event::Failed {
            title: &run.title,
            root_id: run.root_id.as_deref(),
        });

        if let Some(root_id) = &run.root_id {
            if let Err(e) = self
                .store
                .set_status(root_id, &self.settings.failed_label)
                .await
            {
                warn!(%root_id, error = %e, "failed to mark root page as failed");
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("models", &self.models)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use wikiforge_shared::WikiForgeError;

    use crate::events::EventKind;
    use crate::testing::{FakeGenerator, FakeStore, Op, models};

    const OUTLINE: &str = "Here is the outline:\n1: Overview\n1.1: History\n1.2: Usage\n2: Details\n2.1: Examples";

    fn pipeline(generator: FakeGenerator, store: Arc<FakeStore>) -> Pipeline {
        let mut settings = PipelineSettings::new("db1");
        settings.concurrency = 2;
        Pipeline::new(Arc::new(generator), store, models(), settings)
    }

    /// Record the kind of every event fired on `bus`.
    fn record(bus: &EventBus) -> Arc<Mutex<Vec<EventKind>>> {
        let log: Arc<Mutex<Vec<EventKind>>> = Arc::default();
        let l = Arc::clone(&log);
        bus.on_all(move |e| {
            l.lock().unwrap().push(e.kind());
            Ok(())
        });
        log
    }

    #[tokio::test]
    async fn successful_run_fires_events_in_order() {
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline(FakeGenerator::new(OUTLINE), Arc::clone(&store));
        let log = record(pipeline.events());

        let report = pipeline.run("Volcanoes").await.expect("run");
        assert_eq!(report.title, "Volcanoes");
        assert_eq!(report.category, "Science");
        assert_eq!(report.root_id, "root");
        assert_eq!(report.trees, 2);
        assert_eq!(report.headings_saved, 5);
        assert_eq!(report.headings_failed, 0);

        let milestones: Vec<EventKind> = log
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|k| !matches!(k, EventKind::HeadingSaved | EventKind::SectionWritten))
            .collect();
        assert_eq!(
            milestones,
            vec![
                EventKind::Started,
                EventKind::CategoryFound,
                EventKind::PageSetup,
                EventKind::SectionsGenerated,
                EventKind::SectionGenerated,
                EventKind::SectionGenerated,
                EventKind::Completed,
            ]
        );

        let written = log
            .lock()
            .unwrap()
            .iter()
            .filter(|k| **k == EventKind::SectionWritten)
            .count();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn root_setup_and_final_status() {
        let store = Arc::new(FakeStore::default());
        pipeline(FakeGenerator::new(OUTLINE), Arc::clone(&store))
            .run("Volcanoes")
            .await
            .expect("run");

        let ops = store.ops();
        assert_eq!(
            ops[0],
            Op::AddCategory {
                name: "Science".into()
            }
        );
        assert_eq!(
            ops[1],
            Op::CreateRoot {
                title: "Volcanoes".into(),
                category: "Science".into()
            }
        );
        // Table of contents + divider.
        assert!(matches!(&ops[2], Op::Append { id, blocks: 2, .. } if id == "root"));
        assert_eq!(
            ops.last(),
            Some(&Op::SetStatus {
                id: "root".into(),
                status: "Done".into()
            })
        );

        let children: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                Op::CreateChild { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(children, vec!["History", "Usage", "Examples"]);
    }

    #[tokio::test]
    async fn known_category_is_not_recreated() {
        let store = Arc::new(FakeStore::default());
        store.categories.lock().unwrap().push("Science".into());
        pipeline(FakeGenerator::new(OUTLINE), Arc::clone(&store))
            .run("Volcanoes")
            .await
            .expect("run");

        assert!(!store.ops().iter().any(|op| matches!(op, Op::AddCategory { .. })));
    }

    #[tokio::test]
    async fn content_failure_marks_run_failed() {
        let store = Arc::new(FakeStore::default());
        let mut generator = FakeGenerator::new(OUTLINE);
        generator.fail_on = Some("2.1".into());
        let pipeline = pipeline(generator, Arc::clone(&store));
        let log = record(pipeline.events());

        let failed_root: Arc<Mutex<Option<Option<String>>>> = Arc::default();
        let f = Arc::clone(&failed_root);
        pipeline.events().on(EventKind::Failed, move |e| {
            if let Event::Failed { root_id, .. } = e {
                *f.lock().unwrap() = Some(root_id.map(String::from));
            }
            Ok(())
        });

        let err = pipeline.run("Volcanoes").await.expect_err("should fail");
        assert!(matches!(err, WikiForgeError::Generation(_)));

        let kinds = log.lock().unwrap().clone();
        assert_eq!(kinds.last(), Some(&EventKind::Failed));
        assert!(!kinds.contains(&EventKind::Completed));
        // First tree finished before the second one failed.
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::SectionGenerated).count(),
            1
        );
        assert_eq!(*failed_root.lock().unwrap(), Some(Some("root".to_string())));

        let ops = store.ops();
        assert_eq!(
            ops.last(),
            Some(&Op::SetStatus {
                id: "root".into(),
                status: "Failed".into()
            })
        );
        assert!(!ops.iter().any(|op| matches!(op, Op::CreateChild { .. })));
    }

    #[tokio::test]
    async fn failure_before_root_skips_status_update() {
        let store = Arc::new(FakeStore {
            fail_root: true,
            ..FakeStore::default()
        });
        let pipeline = pipeline(FakeGenerator::new(OUTLINE), Arc::clone(&store));
        let log = record(pipeline.events());

        let err = pipeline.run("Volcanoes").await.expect_err("should fail");
        assert!(matches!(err, WikiForgeError::DocumentStore { status: 500, .. }));

        assert_eq!(
            *log.lock().unwrap(),
            vec![EventKind::Started, EventKind::CategoryFound, EventKind::Failed]
        );
        assert!(!store.ops().iter().any(|op| matches!(op, Op::SetStatus { .. })));
    }

    #[tokio::test]
    async fn failing_status_update_keeps_run_error() {
        let store = Arc::new(FakeStore {
            fail_status: true,
            ..FakeStore::default()
        });
        let pipeline = pipeline(FakeGenerator::new(OUTLINE), Arc::clone(&store));
        let log = record(pipeline.events());

        // Marking "Done" fails, then marking "Failed" fails too.
        let err = pipeline.run("Volcanoes").await.expect_err("should fail");
        assert!(err.to_string().contains("status refused"));
        assert_eq!(log.lock().unwrap().last(), Some(&EventKind::Failed));
    }

    #[tokio::test]
    async fn empty_outline_completes_with_nothing_published() {
        let store = Arc::new(FakeStore::default());
        let report = pipeline(FakeGenerator::new("I cannot help with that."), Arc::clone(&store))
            .run("???")
            .await
            .expect("run");
        assert_eq!(report.trees, 0);
        assert_eq!(report.headings_saved, 0);
        assert!(!store.ops().iter().any(|op| matches!(op, Op::CreateChild { .. })));
    }
}
