//! Event-bus subscriber that persists run status.
//!
//! The bus invokes subscribers synchronously, so the recorder only enqueues
//! updates; a background task applies them to the [`StatusStore`] in order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wikiforge_shared::{Result, RunId, RunStatus, WikiForgeError};
use wikiforge_storage::StatusStore;

use crate::events::{Event, EventBus};

/// Default time a run stays queryable after it starts.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Update {
    Status(RunStatus),
    Page(String),
    Expire,
    Close,
}

/// Status transitions implied by an event.
fn updates_for(event: &Event<'_>) -> Vec<Update> {
    match event {
        Event::Started { .. } => vec![Update::Status(RunStatus::PageSetup), Update::Expire],
        Event::PageSetup { page_id, .. } => vec![
            Update::Status(RunStatus::GeneratingSections),
            Update::Page(page_id.to_string()),
        ],
        Event::SectionsGenerated { .. } => vec![Update::Status(RunStatus::GeneratingContent)],
        Event::SectionWritten { index, total } => vec![Update::Status(RunStatus::Written {
            index: *index,
            total: *total,
        })],
        Event::Completed { .. } => vec![Update::Status(RunStatus::Complete)],
        Event::Failed { .. } => vec![Update::Status(RunStatus::Failed)],
        _ => Vec::new(),
    }
}

/// Records one run's progress into the status store.
pub struct StatusRecorder {
    tx: mpsc::UnboundedSender<Update>,
    writer: JoinHandle<()>,
}

impl StatusRecorder {
    /// Start the writer task and mark the run as waiting.
    pub fn spawn(store: Arc<StatusStore>, run_id: &RunId, title: &str, ttl: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_updates(
            store,
            run_id.to_string(),
            title.to_string(),
            ttl,
            rx,
        ));
        let _ = tx.send(Update::Status(RunStatus::Waiting));
        Self { tx, writer }
    }

    /// Subscribe to every event on `bus`.
    pub fn attach(&self, bus: &EventBus) {
        let tx = self.tx.clone();
        bus.on_all(move |event| {
            for update in updates_for(event) {
                tx.send(update)
                    .map_err(|_| WikiForgeError::Storage("status writer has stopped".into()))?;
            }
            Ok(())
        });
    }

    /// Flush pending updates and stop the writer.
    pub async fn finish(self) -> Result<()> {
        let _ = self.tx.send(Update::Close);
        self.writer
            .await
            .map_err(|e| WikiForgeError::Task(format!("status writer failed: {e}")))
    }
}

async fn write_updates(
    store: Arc<StatusStore>,
    run_id: String,
    title: String,
    ttl: Duration,
    mut rx: mpsc::UnboundedReceiver<Update>,
) {
    while let Some(update) = rx.recv().await {
        let outcome = match &update {
            Update::Status(status) => store.upsert_status(&run_id, &title, &status.label()).await,
            Update::Page(page_id) => store.set_page(&run_id, page_id).await,
            Update::Expire => store.touch_expiry(&run_id, ttl).await.map(|_| ()),
            Update::Close => break,
        };
        match outcome {
            Ok(()) => match &update {
                Update::Status(status) if status.is_terminal() => {
                    info!(run = %run_id, %status, "final status recorded")
                }
                _ => debug!(run = %run_id, ?update, "status recorded"),
            },
            Err(e) => warn!(run = %run_id, error = %e, "failed to record status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikiforge_outline::Heading;

    async fn temp_store() -> Arc<StatusStore> {
        let tmp = std::env::temp_dir().join(format!("wf_status_{}.db", RunId::new()));
        Arc::new(StatusStore::open(&tmp).await.expect("open status db"))
    }

    #[test]
    fn event_mapping() {
        assert_eq!(
            updates_for(&Event::Started { title: "t" }),
            vec![Update::Status(RunStatus::PageSetup), Update::Expire]
        );
        assert_eq!(
            updates_for(&Event::PageSetup {
                title: "t",
                page_id: "p1"
            }),
            vec![
                Update::Status(RunStatus::GeneratingSections),
                Update::Page("p1".into())
            ]
        );
        assert_eq!(
            updates_for(&Event::SectionWritten { index: 2, total: 3 }),
            vec![Update::Status(RunStatus::Written { index: 2, total: 3 })]
        );
        let heading = Heading::new("1", "x");
        assert!(
            updates_for(&Event::HeadingSaved {
                heading: &heading,
                container: "c"
            })
            .is_empty()
        );
    }

    #[tokio::test]
    async fn records_run_progress() {
        let store = temp_store().await;
        let run_id = RunId::new();
        let bus = EventBus::new();

        let recorder = StatusRecorder::spawn(Arc::clone(&store), &run_id, "Volcanoes", DEFAULT_STATUS_TTL);
        recorder.attach(&bus);

        bus.fire(&Event::Started { title: "Volcanoes" });
        bus.fire(&Event::PageSetup {
            title: "Volcanoes",
            page_id: "page-1",
        });
        bus.fire(&Event::SectionsGenerated { trees: &[] });
        bus.fire(&Event::SectionWritten { index: 1, total: 1 });
        bus.fire(&Event::Completed { title: "Volcanoes" });
        recorder.finish().await.expect("finish");

        let record = store
            .get(&run_id.to_string())
            .await
            .unwrap()
            .expect("record");
        assert_eq!(record.title, "Volcanoes");
        assert_eq!(record.status, "Completed");
        assert_eq!(record.page_id.as_deref(), Some("page-1"));
        assert!(record.expires_at.is_some());
    }

    #[tokio::test]
    async fn failure_is_recorded() {
        let store = temp_store().await;
        let run_id = RunId::new();
        let bus = EventBus::new();

        let recorder = StatusRecorder::spawn(Arc::clone(&store), &run_id, "Broken", DEFAULT_STATUS_TTL);
        recorder.attach(&bus);
        bus.fire(&Event::Started { title: "Broken" });
        bus.fire(&Event::Failed {
            title: "Broken",
            root_id: None,
        });
        recorder.finish().await.expect("finish");

        let record = store.get(&run_id.to_string()).await.unwrap().unwrap();
        assert_eq!(record.status, "Failed");
        assert!(record.page_id.is_none());
    }
}
