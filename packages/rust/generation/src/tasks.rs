//! Per-phase generation tasks.
//!
//! Each task picks its model from the run's [`ModelConfig`], builds the
//! prompt, and post-processes the reply into the shape the pipeline expects.

use tracing::{debug, instrument};
use unicode_segmentation::UnicodeSegmentation;

use wikiforge_outline::Heading;
use wikiforge_shared::{ModelConfig, Phase, Result, WritingMethod};

use crate::{Generator, Prompt, prompts};

/// Category used when the classifier returns nothing usable.
pub const FALLBACK_CATEGORY: &str = "General";

/// Request the numbered outline for `title`.
#[instrument(skip_all, fields(title = %title))]
pub async fn generate_outline(
    generator: &dyn Generator,
    title: &str,
    models: &ModelConfig,
) -> Result<String> {
    let prompt = Prompt::new(title, prompts::OUTLINE);
    generator.generate(&prompt, &models.model(Phase::Outline)).await
}

/// Write the content of one leaf heading.
///
/// `context` is the rendered section tree the heading belongs to; every
/// heading of one batch sees the same rendering.
#[instrument(skip_all, fields(heading = %heading.label(), method = method.as_str()))]
pub async fn write_section(
    generator: &dyn Generator,
    context: &str,
    heading: &Heading,
    title: &str,
    method: WritingMethod,
    models: &ModelConfig,
) -> Result<String> {
    let model = models.model(Phase::Writing);
    let objective = format!("'{}'", heading.label());
    let brief = prompts::section_message(&objective, title, context);

    let draft = generator
        .generate(&Prompt::new(brief.clone(), prompts::WRITER), &model)
        .await?;

    match method {
        WritingMethod::Single => Ok(draft),
        WritingMethod::Reviewed => {
            let critique = generator
                .generate(
                    &Prompt::new(
                        prompts::review_message(&objective, &draft),
                        prompts::QUALITY_ASSURANCE,
                    ),
                    &model,
                )
                .await?;
            debug!(chars = critique.len(), "critique received");

            generator
                .generate(
                    &Prompt::new(
                        prompts::revision_message(&brief, &draft, &critique),
                        prompts::WRITER,
                    ),
                    &model,
                )
                .await
        }
    }
}

/// Pick a single-glyph icon for `subject`: the first grapheme cluster of the
/// reply, so flags and ZWJ sequences stay whole. An empty reply yields `None`.
pub async fn pick_icon(
    generator: &dyn Generator,
    subject: &str,
    models: &ModelConfig,
) -> Result<Option<String>> {
    let reply = generator
        .generate(&Prompt::new(subject, prompts::ICONS), &models.model(Phase::Icons))
        .await?;
    Ok(reply.trim().graphemes(true).next().map(String::from))
}

/// Classify `title` into a category, preferring one of `known`.
#[instrument(skip_all, fields(title = %title, known = known.len()))]
pub async fn classify(
    generator: &dyn Generator,
    title: &str,
    known: &[String],
    models: &ModelConfig,
) -> Result<String> {
    let prompt = Prompt::new(title, prompts::CATEGORISER).with_context(known.join(", "));
    let reply = generator
        .generate(&prompt, &models.model(Phase::Categories))
        .await?;

    let category = reply
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    if category.is_empty() {
        return Ok(FALLBACK_CATEGORY.to_string());
    }
    Ok(category.to_string())
}
