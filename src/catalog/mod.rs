pub mod graphql;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// the Record struct holds one catalog entry as returned by the admin API,
// flattened out of the nested GraphQL node shape
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub status: String,
    pub description: String,
    pub description_html: String,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
}

impl Record {
    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    pub fn has_alt_text(&self) -> bool {
        self.image_alt
            .as_deref()
            .map(|alt| !alt.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchPageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

// one upstream fetch's worth of records plus its continuation metadata
#[derive(Clone, Debug, Default)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub page_info: BatchPageInfo,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog api rejected credentials (http {status})")]
    Unauthorized { status: u16 },

    #[error("catalog api returned errors: {message}")]
    Graphql { message: String },

    #[error("unexpected catalog response shape: {reason}")]
    MalformedResponse { reason: String },
}

// the upstream boundary: one forward-only cursor fetch per call, no retries
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_batch(
        &self,
        after: Option<&str>,
        batch_size: usize,
    ) -> Result<RecordBatch, CatalogError>;
}
