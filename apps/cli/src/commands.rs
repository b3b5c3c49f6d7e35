//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use wikiforge_core::{Pipeline, PipelineSettings, StatusRecorder};
use wikiforge_generation::ChatClient;
use wikiforge_notion::{NotionStore, database_id_from_url};
use wikiforge_shared::{
    AppConfig, RunId, WritingMethod, config_dir, init_config, load_config, resolve_secret,
    validate_credentials,
};
use wikiforge_storage::{GenerationRecord, StatusStore};

use crate::progress::CliProgress;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// WikiForge: generate a structured article for a topic and publish it to Notion.
#[derive(Parser)]
#[command(
    name = "wikiforge",
    version,
    about = "Generate a structured, AI-written article for a topic and publish it to a Notion database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate an article for TITLE and publish it.
    Generate {
        /// Topic of the article.
        title: String,

        /// Share URL of the target Notion database.
        #[arg(long)]
        page_url: String,

        /// Model used to generate the outline.
        #[arg(long)]
        outline_model: Option<String>,

        /// Model used to write sections.
        #[arg(long)]
        writing_model: Option<String>,

        /// Model used to pick page icons.
        #[arg(long)]
        icons_model: Option<String>,

        /// Model used to classify the title.
        #[arg(long)]
        categories_model: Option<String>,

        /// Maximum sections written at once.
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Writing method: single or reviewed.
        #[arg(short, long)]
        method: Option<WritingMethod>,
    },

    /// Show the recorded status of a run.
    Status {
        /// Run identifier printed by `generate`.
        run_id: String,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recorded runs, newest first.
    List,

    /// Delete expired run records.
    Purge,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "wikiforge=info",
        1 => "wikiforge=debug",
        _ => "wikiforge=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            title,
            page_url,
            outline_model,
            writing_model,
            icons_model,
            categories_model,
            concurrency,
            method,
        } => {
            let overrides = ModelOverrides {
                outline: outline_model,
                writing: writing_model,
                icons: icons_model,
                categories: categories_model,
            };
            cmd_generate(&title, &page_url, overrides, concurrency, method).await
        }
        Command::Status { run_id, json } => cmd_status(&run_id, json).await,
        Command::List => cmd_list().await,
        Command::Purge => cmd_purge().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Per-phase model names given on the command line.
#[derive(Debug, Default)]
struct ModelOverrides {
    outline: Option<String>,
    writing: Option<String>,
    icons: Option<String>,
    categories: Option<String>,
}

impl ModelOverrides {
    fn apply(self, config: &mut AppConfig) {
        let llm = &mut config.llm;
        for (slot, value) in [
            (&mut llm.outline, self.outline),
            (&mut llm.writing, self.writing),
            (&mut llm.icons, self.icons),
            (&mut llm.categories, self.categories),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Status database location: `[defaults].status_db` or `~/.wikiforge/status.db`.
fn status_db_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.defaults.status_db {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config_dir()?.join("status.db")),
    }
}

/// How long a run stays queryable; absurd hour counts clamp instead of overflowing.
fn status_ttl(config: &AppConfig) -> Duration {
    Duration::from_secs(config.defaults.status_ttl_hours.saturating_mul(60 * 60))
}

async fn open_status_store(config: &AppConfig) -> Result<StatusStore> {
    let path = status_db_path(config)?;
    Ok(StatusStore::open(&path).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    title: &str,
    page_url: &str,
    overrides: ModelOverrides,
    concurrency: Option<usize>,
    method: Option<WritingMethod>,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(eyre!("title must not be empty"));
    }

    // Validate credentials before doing anything
    let mut config = load_config()?;
    validate_credentials(&config)?;
    let api_key = resolve_secret(&config.llm.api_key_env, "generation API key")?;
    let token = resolve_secret(&config.notion.token_env, "Notion integration token")?;

    let database_id = database_id_from_url(page_url)?;
    overrides.apply(&mut config);

    let mut settings = PipelineSettings::new(database_id);
    settings.concurrency = concurrency.unwrap_or(config.defaults.concurrency);
    settings.method = method.unwrap_or(config.defaults.writing_method);
    settings.done_label = config.notion.done_label.clone();
    settings.failed_label = config.notion.failed_label.clone();

    let generator = Arc::new(ChatClient::new(config.llm.base_url.clone())?);
    let store = Arc::new(NotionStore::new(token, &config.notion)?);
    let models = config.llm.model_config(api_key);
    let pipeline = Pipeline::new(generator, store, models, settings);

    let status = Arc::new(open_status_store(&config).await?);
    let ttl = status_ttl(&config);
    let run_id = RunId::new();
    println!("Run ID: {run_id}");

    info!(
        %run_id,
        title,
        concurrency = concurrency.unwrap_or(config.defaults.concurrency),
        "generating article"
    );

    let recorder = StatusRecorder::spawn(status, &run_id, title, ttl);
    recorder.attach(pipeline.events());
    let progress = CliProgress::new();
    progress.attach(pipeline.events());

    let outcome = pipeline.run_with_id(run_id, title).await;
    progress.finish();
    recorder.finish().await?;
    let report = outcome?;

    // Print summary
    println!();
    println!("  Article published!");
    println!("  Run ID:   {}", report.run_id);
    println!("  Title:    {}", report.title);
    println!("  Category: {}", report.category);
    println!("  Page:     {}", report.root_id);
    println!("  Sections: {}", report.trees);
    println!(
        "  Headings: {} saved, {} failed",
        report.headings_saved, report.headings_failed
    );
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_status(run_id: &str, json: bool) -> Result<()> {
    let id: RunId = run_id
        .parse()
        .map_err(|e| eyre!("invalid run id '{run_id}': {e}"))?;

    let config = load_config()?;
    let store = open_status_store(&config).await?;
    let record = store
        .get(&id.to_string())
        .await?
        .ok_or_else(|| eyre!("no run found with id '{run_id}' (it may have expired)"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

fn print_record(record: &GenerationRecord) {
    println!("  Run ID:  {}", record.id);
    println!("  Title:   {}", record.title);
    println!("  Status:  {}", record.status);
    if let Some(page) = &record.page_id {
        println!("  Page:    {page}");
    }
    println!("  Started: {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(expires) = record.expires_at {
        println!("  Expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

async fn cmd_list() -> Result<()> {
    let config = load_config()?;
    let store = open_status_store(&config).await?;
    let records = store.list().await?;

    if records.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<28}  {}",
            record.id,
            record.status,
            record.title
        );
    }
    Ok(())
}

async fn cmd_purge() -> Result<()> {
    let config = load_config()?;
    let store = open_status_store(&config).await?;
    let removed = store.purge_expired().await?;
    info!(removed, "purged expired runs");
    println!("Removed {removed} expired run(s).");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
