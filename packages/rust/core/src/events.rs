//! Typed publish/subscribe registry for pipeline progress.
//!
//! Publishers call [`EventBus::fire`] synchronously from whichever layer
//! reaches a milestone. Subscribers are keyed by [`EventKind`]; a failing or
//! panicking subscriber is logged and skipped, never propagated.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use wikiforge_outline::{Heading, SectionTree};
use wikiforge_shared::Result;

/// A pipeline milestone. Payloads borrow from the publisher.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Started {
        title: &'a str,
    },
    CategoryFound {
        category: &'a str,
    },
    PageSetup {
        title: &'a str,
        page_id: &'a str,
    },
    /// The outline was parsed.
    SectionsGenerated {
        trees: &'a [SectionTree],
    },
    /// Every leaf of one tree has content.
    SectionGenerated {
        tree: &'a SectionTree,
    },
    HeadingSaved {
        heading: &'a Heading,
        container: &'a str,
    },
    HeadingFailed {
        heading: &'a Heading,
        container: &'a str,
        error: &'a str,
    },
    /// Tree `index` (1-based) of `total` has been published.
    SectionWritten {
        index: usize,
        total: usize,
    },
    Completed {
        title: &'a str,
    },
    Failed {
        title: &'a str,
        root_id: Option<&'a str>,
    },
}

/// Subscription key: the tag of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    CategoryFound,
    PageSetup,
    SectionsGenerated,
    SectionGenerated,
    HeadingSaved,
    HeadingFailed,
    SectionWritten,
    Completed,
    Failed,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        Self::Started,
        Self::CategoryFound,
        Self::PageSetup,
        Self::SectionsGenerated,
        Self::SectionGenerated,
        Self::HeadingSaved,
        Self::HeadingFailed,
        Self::SectionWritten,
        Self::Completed,
        Self::Failed,
    ];
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started { .. } => EventKind::Started,
            Self::CategoryFound { .. } => EventKind::CategoryFound,
            Self::PageSetup { .. } => EventKind::PageSetup,
            Self::SectionsGenerated { .. } => EventKind::SectionsGenerated,
            Self::SectionGenerated { .. } => EventKind::SectionGenerated,
            Self::HeadingSaved { .. } => EventKind::HeadingSaved,
            Self::HeadingFailed { .. } => EventKind::HeadingFailed,
            Self::SectionWritten { .. } => EventKind::SectionWritten,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
        }
    }
}

type Callback = Arc<dyn Fn(&Event<'_>) -> Result<()> + Send + Sync>;

/// Registry of subscribers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Callback>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to one kind of event.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(&[kind], Arc::new(callback));
    }

    /// Subscribe `callback` to every kind of event.
    pub fn on_all<F>(&self, callback: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(&EventKind::ALL, Arc::new(callback));
    }

    fn subscribe(&self, kinds: &[EventKind], callback: Callback) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for kind in kinds {
            handlers.entry(*kind).or_default().push(Arc::clone(&callback));
        }
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every subscriber of the event's kind, in subscription order.
    ///
    /// The lock is released before callbacks run, so a callback may fire
    /// further events or subscribe new handlers.
    pub fn fire(&self, event: &Event<'_>) {
        let kind = event.kind();
        let callbacks: Vec<Callback> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(?kind, error = %e, "event subscriber failed"),
                Err(_) => warn!(?kind, "event subscriber panicked"),
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&EventKind, usize> =
            handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wikiforge_shared::WikiForgeError;

    type Log = Arc<Mutex<Vec<String>>>;

    #[test]
    fn delivers_only_to_matching_kind() {
        let bus = EventBus::new();
        let log: Log = Arc::default();

        let l = Arc::clone(&log);
        bus.on(EventKind::Started, move |e| {
            if let Event::Started { title } = e {
                l.lock().unwrap().push(format!("started:{title}"));
            }
            Ok(())
        });
        let l = Arc::clone(&log);
        bus.on(EventKind::CategoryFound, move |e| {
            if let Event::CategoryFound { category } = e {
                l.lock().unwrap().push(format!("category:{category}"));
            }
            Ok(())
        });

        bus.fire(&Event::Started { title: "Rust" });
        bus.fire(&Event::Completed { title: "Rust" });
        bus.fire(&Event::CategoryFound { category: "Science" });

        assert_eq!(*log.lock().unwrap(), vec!["started:Rust", "category:Science"]);
    }

    #[test]
    fn failing_and_panicking_subscribers_are_isolated() {
        let bus = EventBus::new();
        let log: Log = Arc::default();

        bus.on(EventKind::Started, |_| Err(WikiForgeError::validation("nope")));
        bus.on(EventKind::Started, |_| panic!("subscriber bug"));
        let l = Arc::clone(&log);
        bus.on(EventKind::Started, move |_| {
            l.lock().unwrap().push("after".into());
            Ok(())
        });

        bus.fire(&Event::Started { title: "x" });
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn reentrant_fire_is_allowed() {
        let bus = Arc::new(EventBus::new());
        let log: Log = Arc::default();

        let inner = Arc::clone(&bus);
        bus.on(EventKind::Started, move |_| {
            inner.fire(&Event::Completed { title: "nested" });
            Ok(())
        });
        let l = Arc::clone(&log);
        bus.on(EventKind::Completed, move |e| {
            if let Event::Completed { title } = e {
                l.lock().unwrap().push(title.to_string());
            }
            Ok(())
        });

        bus.fire(&Event::Started { title: "outer" });
        assert_eq!(*log.lock().unwrap(), vec!["nested"]);
    }

    #[test]
    fn on_all_subscribes_every_kind() {
        let bus = EventBus::new();
        bus.on_all(|_| Ok(()));
        for kind in EventKind::ALL {
            assert_eq!(bus.subscriber_count(kind), 1);
        }
        bus.on(EventKind::Failed, |_| Ok(()));
        assert_eq!(bus.subscriber_count(EventKind::Failed), 2);
    }

    #[test]
    fn kind_matches_variant() {
        let event = Event::Failed {
            title: "t",
            root_id: None,
        };
        assert_eq!(event.kind(), EventKind::Failed);
        assert_eq!(
            Event::SectionWritten { index: 1, total: 2 }.kind(),
            EventKind::SectionWritten
        );
    }
}
