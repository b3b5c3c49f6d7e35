//! Document-store contract and the Notion implementation.
//!
//! The pipeline publishes into a hierarchy of pages: one root page per run
//! inside a database, child pages for written sections, and blocks appended
//! to either. [`DocumentStore`] is the seam; [`NotionStore`] talks to the
//! Notion REST API.

mod client;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use wikiforge_blocks::Block;
use wikiforge_shared::{Result, WikiForgeError};

pub use client::{MAX_BLOCKS_PER_REQUEST, NotionStore};

/// Hierarchical document store the pipeline publishes into.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the root page for a run inside `parent_id`, returning its id.
    async fn create_root(
        &self,
        parent_id: &str,
        title: &str,
        category: &str,
        icon: Option<&str>,
    ) -> Result<String>;

    /// Append blocks to the end of a page.
    async fn append_blocks(&self, id: &str, blocks: &[Block]) -> Result<()>;

    /// Create a child page under `parent_id`, returning its id.
    async fn create_child(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        blocks: Option<&[Block]>,
    ) -> Result<String>;

    /// Set the status field of a root page.
    async fn set_status(&self, id: &str, status: &str) -> Result<()>;

    /// Names of the category options defined on `parent_id`.
    async fn list_category_options(&self, parent_id: &str) -> Result<Vec<String>>;

    /// Add a category option to `parent_id`, keeping the existing ones.
    async fn add_category_option(&self, parent_id: &str, name: &str) -> Result<()>;

    /// Convert Markdown into this store's blocks.
    fn markdown_to_blocks(&self, text: &str) -> Vec<Block> {
        wikiforge_blocks::markdown_to_blocks(text)
    }
}

static HEX_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9a-fA-F]{32}|[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})$")
        .expect("database id regex")
});

/// Extract the database id from a Notion share URL.
///
/// Accepts `https://www.notion.so/<workspace>/<Name->id?v=<view>` and the bare
/// `…/<id>` form. The id is returned without dashes.
pub fn database_id_from_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| WikiForgeError::validation(format!("invalid page URL '{raw}': {e}")))?;

    let segment = url
        .path_segments()
        .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
        .ok_or_else(|| WikiForgeError::validation(format!("no database id in URL: {raw}")))?;

    let caps = HEX_ID_RE
        .captures(segment)
        .ok_or_else(|| WikiForgeError::validation(format!("no database id in URL: {raw}")))?;
    Ok(caps[1].replace('-', "").to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_share_url() {
        let id = database_id_from_url(
            "https://www.notion.so/archief/93992d8440fa4111b06e7cc5748fac5e?v=6429bb958ce6452497c5089c15e9e6f2",
        )
        .unwrap();
        assert_eq!(id, "93992d8440fa4111b06e7cc5748fac5e");
    }

    #[test]
    fn extracts_id_after_page_name() {
        let id = database_id_from_url(
            "https://www.notion.so/team/Knowledge-Base-93992D8440FA4111B06E7CC5748FAC5E",
        )
        .unwrap();
        assert_eq!(id, "93992d8440fa4111b06e7cc5748fac5e");
    }

    #[test]
    fn accepts_dashed_uuid() {
        let id =
            database_id_from_url("https://notion.so/93992d84-40fa-4111-b06e-7cc5748fac5e/").unwrap();
        assert_eq!(id, "93992d8440fa4111b06e7cc5748fac5e");
    }

    #[test]
    fn rejects_urls_without_id() {
        assert!(database_id_from_url("https://www.notion.so/archief/my-page").is_err());
        assert!(database_id_from_url("not a url").is_err());
        let err = database_id_from_url("https://www.notion.so/").unwrap_err();
        assert!(matches!(err, WikiForgeError::Validation { .. }));
    }
}
