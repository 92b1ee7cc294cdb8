pub mod filters;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{BatchPageInfo, CatalogError, CatalogSource, Record};
use crate::listing::filters::FilterSet;

// fixed page size for locally re-paginated (filtered) listings
pub const PAGE_SIZE: usize = 10;

#[derive(Clone, Debug)]
pub struct ListingOptions {
    // upstream batch size used by the accumulation growth loop
    pub batch_size: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self { batch_size: 25 }
    }
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] CatalogError),
}

// a resolved page, tagged by the mode that produced it. server pages carry
// the upstream page info verbatim; filtered pages carry the local page math.
#[derive(Clone, Debug)]
pub enum PageResult {
    Server {
        records: Vec<Record>,
        page: usize,
        page_info: BatchPageInfo,
    },
    Filtered {
        records: Vec<Record>,
        page: usize,
        total_pages: usize,
        has_more_upstream: bool,
    },
}

impl PageResult {
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Server { records, .. } => records,
            Self::Filtered { records, .. } => records,
        }
    }

    pub fn page(&self) -> usize {
        match self {
            Self::Server { page, .. } => *page,
            Self::Filtered { page, .. } => *page,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered { .. })
    }
}

// last-known cursors supplied by a caller resuming a listing; each hint is
// applied only when the controller has no state of its own for that mode
#[derive(Clone, Debug, Default)]
pub struct CursorHints {
    pub server_cursor: Option<String>,
    pub filtered_cursor: Option<String>,
}

// request shape used by callers that drive the controller over a wire or
// from a form post: raw identifiers, an optional resume cursor, a 1-based page
#[derive(Clone, Debug, Deserialize)]
pub struct ListingRequest {
    pub filter_identifiers: Vec<String>,
    pub continuation_cursor: Option<String>,
    pub requested_page: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ListingResponse {
    pub records: Vec<Record>,
    pub server_page_info: Option<BatchPageInfo>,
    pub filtered_continuation_cursor: Option<String>,
    pub has_more_upstream: bool,
}

// one controller per interactive session. owns the accumulation buffer and
// both cursors; never shared across sessions.
pub struct ListingController<S> {
    source: S,
    options: ListingOptions,
    active_filters: FilterSet,
    buffer: Vec<Record>,
    filtered_cursor: Option<String>,
    has_more_upstream: bool,
    page: usize,
    // cursors used for each server-mode page, in order; the upstream only
    // fetches forward, so previous-page walks this trail instead
    server_trail: Vec<Option<String>>,
    server_page: usize,
    last_server_info: Option<BatchPageInfo>,
}

impl<S: CatalogSource> ListingController<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ListingOptions::default())
    }

    pub fn with_options(source: S, options: ListingOptions) -> Self {
        Self {
            source,
            options,
            active_filters: FilterSet::default(),
            buffer: Vec::new(),
            filtered_cursor: None,
            has_more_upstream: true,
            page: 1,
            server_trail: Vec::new(),
            server_page: 1,
            last_server_info: None,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn active_filters(&self) -> &FilterSet {
        &self.active_filters
    }

    pub fn filtered_cursor(&self) -> Option<&str> {
        self.filtered_cursor.as_deref()
    }

    pub fn has_more_upstream(&self) -> bool {
        self.has_more_upstream
    }

    pub async fn request_page(
        &mut self,
        filters: &FilterSet,
        requested_page: usize,
    ) -> Result<PageResult, ListingError> {
        self.request_page_with(filters, requested_page, CursorHints::default())
            .await
    }

    pub async fn request_page_with(
        &mut self,
        filters: &FilterSet,
        requested_page: usize,
        hints: CursorHints,
    ) -> Result<PageResult, ListingError> {
        let mut requested_page = requested_page.max(1);

        if *filters != self.active_filters {
            tracing::debug!(
                filters = %filters.identifiers().collect::<Vec<_>>().join(","),
                "filter set changed, resetting accumulation state"
            );
            self.buffer.clear();
            self.filtered_cursor = None;
            self.has_more_upstream = true;
            self.server_trail.clear();
            self.server_page = 1;
            self.last_server_info = None;
            self.active_filters = filters.clone();
            requested_page = 1;
        }

        if self.active_filters.is_empty() {
            if self.server_trail.is_empty() {
                if let Some(cursor) = hints.server_cursor {
                    self.server_trail.push(Some(cursor));
                }
            }
            return self.request_server_page().await;
        }

        if self.buffer.is_empty() && self.filtered_cursor.is_none() {
            if let Some(cursor) = hints.filtered_cursor {
                self.filtered_cursor = Some(cursor);
            }
        }

        self.page = requested_page;
        self.grow_buffer(requested_page * PAGE_SIZE).await?;
        Ok(self.filtered_page(requested_page))
    }

    // drive the controller from a wire-shaped request
    pub async fn handle(
        &mut self,
        request: &ListingRequest,
    ) -> Result<ListingResponse, ListingError> {
        let filters = FilterSet::from_values(&request.filter_identifiers);
        let hints = if filters.is_empty() {
            CursorHints {
                server_cursor: request.continuation_cursor.clone(),
                filtered_cursor: None,
            }
        } else {
            CursorHints {
                server_cursor: None,
                filtered_cursor: request.continuation_cursor.clone(),
            }
        };
        let result = self
            .request_page_with(&filters, request.requested_page, hints)
            .await?;
        Ok(self.response_view(&result))
    }

    pub fn response_view(&self, result: &PageResult) -> ListingResponse {
        match result {
            PageResult::Server { records, page_info, .. } => ListingResponse {
                records: records.clone(),
                server_page_info: Some(page_info.clone()),
                filtered_continuation_cursor: None,
                has_more_upstream: page_info.has_next_page,
            },
            PageResult::Filtered {
                records,
                has_more_upstream,
                ..
            } => ListingResponse {
                records: records.clone(),
                server_page_info: None,
                filtered_continuation_cursor: self.filtered_cursor.clone(),
                has_more_upstream: *has_more_upstream,
            },
        }
    }

    pub async fn next_page(&mut self) -> Result<PageResult, ListingError> {
        if self.active_filters.is_empty() {
            let next_cursor = self
                .last_server_info
                .as_ref()
                .filter(|info| info.has_next_page)
                .and_then(|info| info.end_cursor.clone());
            if let Some(cursor) = next_cursor {
                self.server_trail.push(Some(cursor));
                self.server_page += 1;
            }
            return self.request_server_page().await;
        }

        let mut next = self.page + 1;
        if !self.has_more_upstream {
            next = next.min(self.estimated_max_page());
        }
        let filters = self.active_filters.clone();
        self.request_page(&filters, next).await
    }

    pub async fn previous_page(&mut self) -> Result<PageResult, ListingError> {
        if self.active_filters.is_empty() {
            if self.server_trail.len() > 1 {
                self.server_trail.pop();
                self.server_page = self.server_page.saturating_sub(1).max(1);
            }
            return self.request_server_page().await;
        }

        let previous = self.page.saturating_sub(1).max(1);
        let filters = self.active_filters.clone();
        self.request_page(&filters, previous).await
    }

    fn estimated_max_page(&self) -> usize {
        let known = (self.buffer.len() + PAGE_SIZE - 1) / PAGE_SIZE;
        known.max(1)
    }

    async fn request_server_page(&mut self) -> Result<PageResult, ListingError> {
        if self.server_trail.is_empty() {
            self.server_trail.push(None);
            self.server_page = 1;
        }
        let cursor = self
            .server_trail
            .last()
            .cloned()
            .unwrap_or(None);

        let batch = self
            .source
            .fetch_batch(cursor.as_deref(), self.options.batch_size)
            .await?;
        self.last_server_info = Some(batch.page_info.clone());

        Ok(PageResult::Server {
            records: batch.records,
            page: self.server_page,
            page_info: batch.page_info,
        })
    }

    // fetch upstream batches until the buffer can serve `needed` records or
    // the upstream runs dry. each fetch depends on the cursor returned by the
    // previous one, so the loop is strictly sequential.
    async fn grow_buffer(&mut self, needed: usize) -> Result<(), ListingError> {
        while self.buffer.len() < needed && self.has_more_upstream {
            let batch = self
                .source
                .fetch_batch(self.filtered_cursor.as_deref(), self.options.batch_size)
                .await?;

            let before = self.buffer.len();
            for record in batch.records {
                if self.active_filters.keeps(&record) {
                    self.buffer.push(record);
                }
            }
            tracing::debug!(
                kept = self.buffer.len() - before,
                buffered = self.buffer.len(),
                needed,
                "filtered upstream batch into buffer"
            );

            if batch.page_info.has_next_page {
                match batch.page_info.end_cursor {
                    Some(cursor) => {
                        if self.filtered_cursor.as_deref() == Some(cursor.as_str()) {
                            // the continuation did not advance; treat it like
                            // a dead end rather than refetching forever
                            tracing::warn!(
                                cursor = %cursor,
                                "continuation cursor did not advance, serving partial buffer"
                            );
                            self.has_more_upstream = false;
                        } else {
                            self.filtered_cursor = Some(cursor);
                        }
                    }
                    None => {
                        // the batch claims more data but gives us nothing to
                        // resume from; stop growing and serve what we have
                        tracing::warn!(
                            buffered = self.buffer.len(),
                            "batch missing continuation cursor, serving partial buffer"
                        );
                        self.has_more_upstream = false;
                    }
                }
            } else {
                self.has_more_upstream = false;
            }
        }
        Ok(())
    }

    fn filtered_page(&self, page: usize) -> PageResult {
        let start = (page - 1) * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.buffer.len());
        let records = if start >= self.buffer.len() {
            Vec::new()
        } else {
            self.buffer[start..end].to_vec()
        };
        let total_pages = (self.buffer.len() + PAGE_SIZE - 1) / PAGE_SIZE;

        PageResult::Filtered {
            records,
            page,
            total_pages,
            has_more_upstream: self.has_more_upstream,
        }
    }
}
