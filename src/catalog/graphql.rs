use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{BatchPageInfo, CatalogError, CatalogSource, Record, RecordBatch};

const PRODUCTS_QUERY: &str = r#"
query getProducts($first: Int!, $after: String) {
    products(first: $first, after: $after, query: "status:active") {
        edges {
            node {
                id
                title
                handle
                description
                descriptionHtml
                status
                featuredMedia {
                    preview {
                        image {
                            url
                            altText
                        }
                    }
                }
            }
        }
        pageInfo {
            hasNextPage
            hasPreviousPage
            startCursor
            endCursor
        }
    }
}
"#;

#[derive(Clone, Debug)]
pub struct AdminGraphqlSource {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl AdminGraphqlSource {
    pub fn new(
        shop: &str,
        access_token: &str,
        api_version: &str,
        timeout_seconds: usize,
        http_proxy: Option<&str>,
    ) -> Result<Self, CatalogError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(timeout_seconds as u64));
        if let Some(proxy) = http_proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: format!("https://{shop}/admin/api/{api_version}/graphql.json"),
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl CatalogSource for AdminGraphqlSource {
    async fn fetch_batch(
        &self,
        after: Option<&str>,
        batch_size: usize,
    ) -> Result<RecordBatch, CatalogError> {
        let body = json!({
            "query": PRODUCTS_QUERY,
            "variables": { "first": batch_size, "after": after },
        });

        tracing::debug!(endpoint = %self.endpoint, batch_size, after = ?after, "fetching product batch");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CatalogError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let payload: GraphqlResponse = response.json().await?;

        if let Some(errors) = payload.errors {
            if !errors.is_empty() {
                let message = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(CatalogError::Graphql { message });
            }
        }

        let products = payload
            .data
            .and_then(|d| d.products)
            .ok_or(CatalogError::MalformedResponse {
                reason: "missing data.products".to_string(),
            })?;

        let records = products
            .edges
            .into_iter()
            .map(|edge| edge.node.into_record())
            .collect::<Vec<_>>();

        tracing::debug!(
            records = records.len(),
            has_next = products.page_info.has_next_page,
            "batch decoded"
        );

        Ok(RecordBatch {
            records,
            page_info: BatchPageInfo {
                has_next_page: products.page_info.has_next_page,
                has_previous_page: products.page_info.has_previous_page,
                start_cursor: products.page_info.start_cursor,
                end_cursor: products.page_info.end_cursor,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    products: Option<ProductConnection>,
}

#[derive(Debug, Deserialize)]
struct ProductConnection {
    edges: Vec<ProductEdge>,
    #[serde(rename = "pageInfo")]
    page_info: WirePageInfo,
}

#[derive(Debug, Deserialize)]
struct ProductEdge {
    node: ProductNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePageInfo {
    has_next_page: bool,
    #[serde(default)]
    has_previous_page: bool,
    #[serde(default)]
    start_cursor: Option<String>,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    title: String,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    description_html: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    featured_media: Option<FeaturedMedia>,
}

#[derive(Debug, Deserialize)]
struct FeaturedMedia {
    preview: Option<MediaPreview>,
}

#[derive(Debug, Deserialize)]
struct MediaPreview {
    image: Option<MediaImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaImage {
    url: Option<String>,
    alt_text: Option<String>,
}

impl ProductNode {
    fn into_record(self) -> Record {
        let image = self
            .featured_media
            .and_then(|m| m.preview)
            .and_then(|p| p.image);
        let (image_url, image_alt) = match image {
            Some(image) => (image.url, image.alt_text),
            None => (None, None),
        };
        Record {
            id: self.id,
            title: self.title,
            handle: self.handle,
            status: self.status,
            description: self.description,
            description_html: self.description_html,
            image_url,
            image_alt,
        }
    }
}
