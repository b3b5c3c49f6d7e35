//! Notion REST API client.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use wikiforge_blocks::{Block, to_json_array};
use wikiforge_shared::{NotionConfig, Result, WikiForgeError};

use crate::DocumentStore;

/// Most blocks the API accepts in one request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// User-Agent string for Notion requests.
const USER_AGENT: &str = concat!("WikiForge/", env!("CARGO_PKG_VERSION"));

/// Notion-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct NotionStore {
    client: Client,
    token: String,
    base_url: String,
    version: String,
    title_property: String,
    category_property: String,
    status_property: String,
}

impl NotionStore {
    /// Build a store from the integration token and the `[notion]` config.
    pub fn new(token: impl Into<String>, config: &NotionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WikiForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            version: config.version.clone(),
            title_property: config.title_property.clone(),
            category_property: config.category_property.clone(),
            status_property: config.status_property.clone(),
        })
    }

    /// Send one request and decode the JSON reply.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| WikiForgeError::Network(format!("{method} {url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WikiForgeError::Network(format!("{url}: failed to read body: {e}")))?;

        if !status.is_success() {
            // Notion error bodies look like {"object":"error","code":..,"message":..}
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .unwrap_or(text);
            return Err(WikiForgeError::document_store(status.as_u16(), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| WikiForgeError::parse(format!("{url}: invalid JSON: {e}")))
    }

    /// Create a page and return its id.
    async fn create_page(&self, body: Value) -> Result<String> {
        let reply = self.request(Method::POST, "/pages", Some(body)).await?;
        reply["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| WikiForgeError::parse("create page response has no id"))
    }

    /// Fetch the database object of `database_id`.
    async fn database(&self, database_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/databases/{database_id}"), None)
            .await
    }
}

/// Notion `title` property value.
fn title_value(text: &str) -> Value {
    json!({ "title": [{ "type": "text", "text": { "content": text } }] })
}

/// Notion emoji icon, or JSON null.
fn icon_value(icon: Option<&str>) -> Value {
    match icon {
        Some(emoji) => json!({ "type": "emoji", "emoji": emoji }),
        None => Value::Null,
    }
}

fn option_names(database: &Value, property: &str) -> Vec<String> {
    database["properties"][property]["select"]["options"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for NotionStore {
    #[instrument(skip_all, fields(title = %title, category = %category))]
    async fn create_root(
        &self,
        parent_id: &str,
        title: &str,
        category: &str,
        icon: Option<&str>,
    ) -> Result<String> {
        let mut properties = serde_json::Map::new();
        properties.insert(self.title_property.clone(), title_value(title));
        properties.insert(
            self.category_property.clone(),
            json!({ "select": { "name": category } }),
        );

        let mut body = json!({
            "parent": { "type": "database_id", "database_id": parent_id },
            "properties": properties,
        });
        if icon.is_some() {
            body["icon"] = icon_value(icon);
        }

        let id = self.create_page(body).await?;
        debug!(%id, "root page created");
        Ok(id)
    }

    #[instrument(skip_all, fields(id = %id, blocks = blocks.len()))]
    async fn append_blocks(&self, id: &str, blocks: &[Block]) -> Result<()> {
        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let body = json!({ "children": to_json_array(chunk) });
            self.request(Method::PATCH, &format!("/blocks/{id}/children"), Some(body))
                .await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(parent = %parent_id, title = %title))]
    async fn create_child(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        blocks: Option<&[Block]>,
    ) -> Result<String> {
        let blocks = blocks.unwrap_or_default();
        let split = blocks.len().min(MAX_BLOCKS_PER_REQUEST);
        let (first, rest) = blocks.split_at(split);

        let mut body = json!({
            "parent": { "type": "page_id", "page_id": parent_id },
            "properties": { "title": title_value(title) },
        });
        if icon.is_some() {
            body["icon"] = icon_value(icon);
        }
        if !first.is_empty() {
            body["children"] = Value::Array(to_json_array(first));
        }

        let id = self.create_page(body).await?;
        if !rest.is_empty() {
            self.append_blocks(&id, rest).await?;
        }
        debug!(%id, blocks = blocks.len(), "child page created");
        Ok(id)
    }

    #[instrument(skip_all, fields(id = %id, status = %status))]
    async fn set_status(&self, id: &str, status: &str) -> Result<()> {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.status_property.clone(),
            json!({ "select": { "name": status } }),
        );
        self.request(
            Method::PATCH,
            &format!("/pages/{id}"),
            Some(json!({ "properties": properties })),
        )
        .await?;
        Ok(())
    }

    async fn list_category_options(&self, parent_id: &str) -> Result<Vec<String>> {
        let database = self.database(parent_id).await?;
        Ok(option_names(&database, &self.category_property))
    }

    #[instrument(skip_all, fields(name = %name))]
    async fn add_category_option(&self, parent_id: &str, name: &str) -> Result<()> {
        let mut names = self.list_category_options(parent_id).await?;
        if names.iter().any(|n| n == name) {
            return Ok(());
        }
        names.push(name.to_string());

        let options: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.category_property.clone(),
            json!({ "select": { "options": options } }),
        );
        self.request(
            Method::PATCH,
            &format!("/databases/{parent_id}"),
            Some(json!({ "properties": properties })),
        )
        .await?;
        Ok(())
    }
}
