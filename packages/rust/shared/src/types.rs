//! Core domain types shared across the generation pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default model for outline and section writing.
pub const DEFAULT_WRITING_MODEL: &str = "gpt-4-1106-preview";

/// Default model for the cheap single-token phases (icons, categories).
pub const DEFAULT_FAST_MODEL: &str = "gpt-3.5-turbo";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Pipeline phase that talks to the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Outline,
    Writing,
    Icons,
    Categories,
}

/// A resolved model selector for a single generation call.
#[derive(Clone)]
pub struct Model {
    /// Credential for the generation service.
    pub key: String,
    /// Model identifier (e.g. `gpt-3.5-turbo`).
    pub name: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

/// Per-phase model selectors plus the credential.
///
/// Built once per run and never mutated afterwards; every collaborator call
/// receives it by reference.
#[derive(Clone)]
pub struct ModelConfig {
    api_key: String,
    pub outline: String,
    pub writing: String,
    pub icons: String,
    pub categories: String,
}

impl ModelConfig {
    /// Create a config using the default model for every phase.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            outline: DEFAULT_WRITING_MODEL.into(),
            writing: DEFAULT_WRITING_MODEL.into(),
            icons: DEFAULT_FAST_MODEL.into(),
            categories: DEFAULT_FAST_MODEL.into(),
        }
    }

    /// Resolve the model used for `phase`.
    ///
    /// Icons are sampled hot so repeated headings get varied glyphs; every
    /// other phase is deterministic.
    pub fn model(&self, phase: Phase) -> Model {
        let (name, temperature) = match phase {
            Phase::Outline => (&self.outline, 0.0),
            Phase::Writing => (&self.writing, 0.0),
            Phase::Icons => (&self.icons, 0.9),
            Phase::Categories => (&self.categories, 0.0),
        };
        Model {
            key: self.api_key.clone(),
            name: name.clone(),
            temperature,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("outline", &self.outline)
            .field("writing", &self.writing)
            .field("icons", &self.icons)
            .field("categories", &self.categories)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WritingMethod
// ---------------------------------------------------------------------------

/// Strategy used to generate the content of a leaf heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingMethod {
    /// One prompt per heading.
    #[default]
    Single,
    /// Draft, quality-assurance critique, then a revised draft.
    Reviewed,
}

impl WritingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Reviewed => "reviewed",
        }
    }
}

impl std::str::FromStr for WritingMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "reviewed" => Ok(Self::Reviewed),
            other => Err(format!(
                "unknown writing method '{other}': expected 'single' or 'reviewed'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Externally visible status of a run, as stored in the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Waiting,
    PageSetup,
    GeneratingSections,
    GeneratingContent,
    Written { index: usize, total: usize },
    Complete,
    Failed,
}

impl RunStatus {
    /// Human-readable label persisted for the run.
    pub fn label(&self) -> String {
        match self {
            Self::Waiting => "Waiting".into(),
            Self::PageSetup => "Setting up page".into(),
            Self::GeneratingSections => "Generating sections".into(),
            Self::GeneratingContent => "Generating content".into(),
            Self::Written { index, total } => format!("Written section {index} of {total}"),
            Self::Complete => "Completed".into(),
            Self::Failed => "Failed".into(),
        }
    }

    /// Whether no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn model_config_resolves_phases() {
        let config = ModelConfig::new("sk-test");
        let icons = config.model(Phase::Icons);
        assert_eq!(icons.name, DEFAULT_FAST_MODEL);
        assert!((icons.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(icons.key, "sk-test");

        let outline = config.model(Phase::Outline);
        assert_eq!(outline.name, DEFAULT_WRITING_MODEL);
        assert_eq!(outline.temperature, 0.0);
    }

    #[test]
    fn model_config_debug_hides_key() {
        let config = ModelConfig::new("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!format!("{:?}", config.model(Phase::Writing)).contains("sk-secret"));
    }

    #[test]
    fn writing_method_parses() {
        assert_eq!("single".parse::<WritingMethod>(), Ok(WritingMethod::Single));
        assert_eq!("Reviewed".parse::<WritingMethod>(), Ok(WritingMethod::Reviewed));
        assert!("pae".parse::<WritingMethod>().is_err());
    }

    #[test]
    fn status_labels() {
        assert_eq!(RunStatus::PageSetup.label(), "Setting up page");
        assert_eq!(
            RunStatus::Written { index: 2, total: 5 }.label(),
            "Written section 2 of 5"
        );
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::GeneratingContent.is_terminal());
    }
}
