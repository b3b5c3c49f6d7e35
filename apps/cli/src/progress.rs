//! Terminal progress for a running pipeline.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use wikiforge_core::{Event, EventBus};

/// Spinner driven by pipeline events.
pub(crate) struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message("Waiting");
        Self { spinner }
    }

    /// Follow every event fired on `bus`.
    pub(crate) fn attach(&self, bus: &EventBus) {
        let spinner = self.spinner.clone();
        bus.on_all(move |event| {
            if let Some(message) = describe(event) {
                spinner.set_message(message);
            }
            if let Event::HeadingFailed { heading, error, .. } = event {
                spinner.println(format!("  ✗ {}: {error}", heading.label()));
            }
            Ok(())
        });
    }

    pub(crate) fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

/// Spinner message for an event, if it changes what is shown.
pub(crate) fn describe(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Started { title } => Some(format!("Choosing a category for '{title}'")),
        Event::CategoryFound { category } => Some(format!("Category: {category}. Setting up page")),
        Event::PageSetup { .. } => Some("Generating outline".into()),
        Event::SectionsGenerated { trees } => {
            Some(format!("Writing content for {} sections", trees.len()))
        }
        Event::SectionGenerated { tree } => tree
            .title()
            .map(|title| format!("Content ready for '{title}'")),
        Event::HeadingSaved { heading, .. } => Some(format!("Saved {}", heading.label())),
        Event::SectionWritten { index, total } => {
            Some(format!("Written section {index} of {total}"))
        }
        Event::HeadingFailed { .. } | Event::Completed { .. } | Event::Failed { .. } => None,
    }
}
