//! Notion REST client and the `PostSource` implementation built on it.

mod mapping;
mod markdown;
pub mod model;

use std::{future::Future, pin::Pin};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    application::source::{PostSource, SourceError},
    config::{NotionSettings, PublicationFilter},
    domain::posts::{Post, PostSummary},
};

pub use mapping::{page_to_post, resolve_title};
pub use markdown::render_blocks;
use model::{Block, BlockList, Database, ErrorBody, Page, QueryResponse, plain_text};

const PAGE_SIZE: u32 = 100;
const NOTION_VERSION_HEADER: &str = "Notion-Version";

/// Property names and types of the configured database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub title: String,
    pub properties: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct NotionClient {
    client: Client,
    api_base: Url,
    token: String,
    version: String,
    database_id: String,
    filter: PublicationFilter,
}

type BoxedBlocks<'a> = Pin<Box<dyn Future<Output = Result<Vec<Block>, SourceError>> + Send + 'a>>;

impl NotionClient {
    pub fn new(settings: &NotionSettings) -> Result<Self, SourceError> {
        let credentials = settings
            .credentials()
            .map_err(|err| SourceError::Configuration(err.to_string()))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(SourceError::from_http)?;

        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            token: credentials.token,
            version: settings.version.clone(),
            database_id: credentials.database_id,
            filter: settings.filter.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("canopy/", env!("CARGO_PKG_VERSION"))
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn url(&self, path: &str) -> Result<Url, SourceError> {
        self.api_base
            .join(path)
            .map_err(|err| SourceError::Configuration(format!("invalid api url: {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(NOTION_VERSION_HEADER, &self.version)
            .header(header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SourceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(SourceError::from_http)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(SourceError::from_http)?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_else(|_| ErrorBody {
                code: String::new(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
            return Err(SourceError::Status {
                status: status.as_u16(),
                code: body.code,
                message: body.message,
            });
        }

        serde_json::from_slice(&bytes).map_err(SourceError::from_decode)
    }

    /// Request body for the publication filter, newest first.
    pub fn query_body(&self, start_cursor: Option<&str>) -> Value {
        let mut body = json!({
            "filter": {
                "and": [
                    {"property": "Status", "status": {"equals": self.filter.done_status}},
                    {"property": "Work Tags", "multi_select": {"contains": self.filter.published_tag}},
                    {"property": "Work Tags", "multi_select": {"contains": self.filter.site_tag}},
                ]
            },
            "sorts": [{"property": "createdAt", "direction": "descending"}],
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = start_cursor {
            body["start_cursor"] = Value::String(cursor.to_string());
        }
        body
    }

    /// Every page passing the publication filter, following pagination.
    pub async fn query_database(&self) -> Result<Vec<Page>, SourceError> {
        let url = self.url(&format!("v1/databases/{}/query", self.database_id))?;
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = self.query_body(cursor.as_deref());
            let response: QueryResponse = self.send(self.client.post(url.clone()).json(&body)).await?;
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(
            target = "canopy::notion",
            count = pages.len(),
            "queried published pages"
        );
        Ok(pages)
    }

    pub async fn retrieve_page(&self, page_id: &str) -> Result<Page, SourceError> {
        let url = self.url(&format!("v1/pages/{page_id}"))?;
        self.send(self.client.get(url)).await
    }

    /// Direct children of a block, following pagination.
    pub async fn block_children(&self, block_id: &str) -> Result<Vec<Block>, SourceError> {
        let url = self.url(&format!("v1/blocks/{block_id}/children"))?;
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut page_url = url.clone();
            {
                let mut query = page_url.query_pairs_mut();
                query.append_pair("page_size", &PAGE_SIZE.to_string());
                if let Some(cursor) = cursor.as_deref() {
                    query.append_pair("start_cursor", cursor);
                }
            }

            let response: BlockList = self.send(self.client.get(page_url)).await?;
            blocks.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }

    /// Children of a block with every nested level attached.
    pub fn block_tree<'a>(&'a self, block_id: &'a str) -> BoxedBlocks<'a> {
        Box::pin(async move {
            let mut blocks = self.block_children(block_id).await?;
            for block in &mut blocks {
                if block.has_children {
                    let children = self.block_tree(&block.id).await?;
                    block.children = children;
                }
            }
            Ok(blocks)
        })
    }

    pub async fn retrieve_database(&self) -> Result<DatabaseSchema, SourceError> {
        let url = self.url(&format!("v1/databases/{}", self.database_id))?;
        let database: Database = self.send(self.client.get(url)).await?;
        Ok(DatabaseSchema {
            title: plain_text(&database.title),
            properties: database
                .properties
                .0
                .into_iter()
                .map(|(name, schema)| (name, schema.kind))
                .collect(),
        })
    }
}

#[async_trait]
impl PostSource for NotionClient {
    async fn published_posts(&self) -> Result<Vec<PostSummary>, SourceError> {
        let pages = self.query_database().await?;
        Ok(pages
            .into_iter()
            .map(|page| PostSummary {
                id: page.id,
                created_time: page.created_time,
            })
            .collect())
    }

    async fn fetch_post(&self, document_id: &str) -> Result<Post, SourceError> {
        let page = self.retrieve_page(document_id).await?;
        let blocks = self.block_tree(document_id).await?;
        Ok(page_to_post(&page, render_blocks(&blocks)))
    }
}
