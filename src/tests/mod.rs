use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::{BatchPageInfo, CatalogError, CatalogSource, Record, RecordBatch};
use crate::listing::filters::FilterSet;
use crate::listing::{
    ListingController, ListingOptions, ListingRequest, PageResult, PAGE_SIZE,
};

fn record(n: usize, image: bool) -> Record {
    Record {
        id: format!("gid://shopify/Product/{n}"),
        title: format!("Product {n}"),
        handle: format!("product-{n}"),
        status: "ACTIVE".to_string(),
        description: String::new(),
        description_html: String::new(),
        image_url: image.then(|| format!("https://cdn.example/{n}.jpg")),
        image_alt: None,
    }
}

// fixed catalog served in cursor order; cursors are end offsets rendered as
// strings, which is enough to exercise the forward-only contract
#[derive(Clone)]
struct ScriptedSource {
    records: Arc<Vec<Record>>,
    fetches: Arc<Mutex<usize>>,
}

impl ScriptedSource {
    fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_batch(
        &self,
        after: Option<&str>,
        batch_size: usize,
    ) -> Result<RecordBatch, CatalogError> {
        *self.fetches.lock().unwrap() += 1;
        let start = after
            .map(|cursor| cursor.parse::<usize>().unwrap())
            .unwrap_or(0);
        let end = (start + batch_size).min(self.records.len());
        Ok(RecordBatch {
            records: self.records[start..end].to_vec(),
            page_info: BatchPageInfo {
                has_next_page: end < self.records.len(),
                has_previous_page: start > 0,
                start_cursor: (start < end).then(|| start.to_string()),
                end_cursor: (start < end).then(|| end.to_string()),
            },
        })
    }
}

// claims more data is available but never hands back a cursor to resume from
struct MalformedSource;

#[async_trait]
impl CatalogSource for MalformedSource {
    async fn fetch_batch(
        &self,
        _after: Option<&str>,
        _batch_size: usize,
    ) -> Result<RecordBatch, CatalogError> {
        Ok(RecordBatch {
            records: (1..=5).map(|n| record(n, false)).collect(),
            page_info: BatchPageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: Some("0".to_string()),
                end_cursor: None,
            },
        })
    }
}

// keeps claiming more data behind a cursor that never moves
struct StalledSource {
    fetches: Arc<Mutex<usize>>,
}

#[async_trait]
impl CatalogSource for StalledSource {
    async fn fetch_batch(
        &self,
        _after: Option<&str>,
        _batch_size: usize,
    ) -> Result<RecordBatch, CatalogError> {
        *self.fetches.lock().unwrap() += 1;
        Ok(RecordBatch {
            records: (1..=3).map(|n| record(n, false)).collect(),
            page_info: BatchPageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: Some("0".to_string()),
                end_cursor: Some("3".to_string()),
            },
        })
    }
}

// 25 records; the 1-based positions in `with_images` carry a featured image
fn catalog_of_25(with_images: &[usize]) -> Vec<Record> {
    (1..=25)
        .map(|n| record(n, with_images.contains(&n)))
        .collect()
}

fn ids(records: &[Record]) -> Vec<usize> {
    records
        .iter()
        .map(|r| {
            r.id.rsplit('/')
                .next()
                .and_then(|tail| tail.parse().ok())
                .unwrap()
        })
        .collect()
}

fn controller_with_batch(
    source: ScriptedSource,
    batch_size: usize,
) -> ListingController<ScriptedSource> {
    ListingController::with_options(source, ListingOptions { batch_size })
}

#[tokio::test]
async fn server_mode_is_a_passthrough() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);
    let no_filters = FilterSet::default();

    let result = controller.request_page(&no_filters, 1).await.unwrap();
    assert_eq!(source.fetch_count(), 1);
    match &result {
        PageResult::Server { records, page, page_info } => {
            assert_eq!(*page, 1);
            assert_eq!(ids(records), (1..=10).collect::<Vec<_>>());
            assert!(page_info.has_next_page);
            assert_eq!(page_info.end_cursor.as_deref(), Some("10"));
        }
        other => panic!("expected a server page, got {other:?}"),
    }

    // each navigation costs exactly one fetch, nothing is accumulated
    let result = controller.next_page().await.unwrap();
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(ids(result.records()), (11..=20).collect::<Vec<_>>());
    assert_eq!(result.page(), 2);
    assert_eq!(controller.buffered(), 0);
}

#[tokio::test]
async fn server_mode_previous_page_walks_the_cursor_trail() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);
    let no_filters = FilterSet::default();

    controller.request_page(&no_filters, 1).await.unwrap();
    controller.next_page().await.unwrap();
    let back = controller.previous_page().await.unwrap();

    // the upstream only pages forward, so going back re-fetches page one
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(ids(back.records()), (1..=10).collect::<Vec<_>>());
    assert_eq!(back.page(), 1);
}

#[tokio::test]
async fn filtered_listing_accumulates_and_repages() {
    // positions 2, 5, 9, 14, 20 have images and are disqualified by the
    // missing-images predicate, leaving 20 survivors out of 25
    let source = ScriptedSource::new(catalog_of_25(&[2, 5, 9, 14, 20]));
    let mut controller = controller_with_batch(source.clone(), 15);
    let filters = FilterSet::from_csv("missing-images");

    let page_one = controller.request_page(&filters, 1).await.unwrap();
    // the first batch of 15 yields 11 survivors, enough for page one
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(ids(page_one.records()), vec![1, 3, 4, 6, 7, 8, 10, 11, 12, 13]);
    assert_eq!(controller.buffered(), 11);
    assert!(controller.has_more_upstream());

    let page_two = controller.request_page(&filters, 2).await.unwrap();
    // exactly one more fetch drains the catalog and fills page two
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(
        ids(page_two.records()),
        vec![15, 16, 17, 18, 19, 21, 22, 23, 24, 25]
    );
    assert_eq!(controller.buffered(), 20);
    assert!(!controller.has_more_upstream());
    match page_two {
        PageResult::Filtered { total_pages, .. } => assert_eq!(total_pages, 2),
        other => panic!("expected a filtered page, got {other:?}"),
    }
}

#[tokio::test]
async fn filtered_pages_never_exceed_the_page_size() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 100);
    let filters = FilterSet::from_csv("blank-description");

    for page in 1..=3 {
        let result = controller.request_page(&filters, page).await.unwrap();
        assert!(result.records().len() <= PAGE_SIZE);
    }
    // 25 survivors: pages of 10, 10, then the 5-record remainder
    let last = controller.request_page(&filters, 3).await.unwrap();
    assert_eq!(last.records().len(), 5);
}

#[tokio::test]
async fn buffer_grows_monotonically_and_revisits_are_free() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 5);
    let filters = FilterSet::from_csv("missing-images");

    controller.request_page(&filters, 1).await.unwrap();
    let after_page_one = controller.buffered();
    let fetches_after_page_one = source.fetch_count();

    controller.request_page(&filters, 2).await.unwrap();
    assert!(controller.buffered() >= after_page_one);
    let fetches_after_page_two = source.fetch_count();
    assert!(fetches_after_page_two > fetches_after_page_one);

    // going back to an already-buffered page costs no upstream traffic
    let revisit = controller.request_page(&filters, 1).await.unwrap();
    assert_eq!(source.fetch_count(), fetches_after_page_two);
    assert_eq!(ids(revisit.records()), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn filter_change_resets_state_and_lands_on_page_one() {
    let source = ScriptedSource::new(catalog_of_25(&[2, 5]));
    let mut controller = controller_with_batch(source.clone(), 25);

    let filters = FilterSet::from_csv("missing-images");
    controller.request_page(&filters, 2).await.unwrap();
    assert!(controller.buffered() > 0);

    // adding a predicate is a different set, so the buffer restarts and the
    // requested page is overridden back to one
    let widened = FilterSet::from_csv("missing-images,blank-description");
    let result = controller.request_page(&widened, 2).await.unwrap();
    assert_eq!(result.page(), 1);
    assert_eq!(ids(result.records())[0], 1);
    assert_eq!(controller.active_filters(), &widened);
}

#[tokio::test]
async fn reordered_identifiers_are_the_same_filter_set() {
    let source = ScriptedSource::new(catalog_of_25(&[2]));
    let mut controller = controller_with_batch(source.clone(), 25);

    let a = FilterSet::from_csv("missing-images,blank-description");
    controller.request_page(&a, 1).await.unwrap();
    let fetches = source.fetch_count();

    let b = FilterSet::from_csv("blank-description,missing-images");
    controller.request_page(&b, 1).await.unwrap();
    assert_eq!(source.fetch_count(), fetches);
}

#[tokio::test]
async fn unknown_identifier_is_inert_but_still_counts_as_a_change() {
    let source = ScriptedSource::new(catalog_of_25(&[2, 5]));
    let mut controller = controller_with_batch(source.clone(), 25);

    // unknown predicates never disqualify, so every record survives
    let unknown = FilterSet::from_csv("sparkles");
    let result = controller.request_page(&unknown, 1).await.unwrap();
    assert!(result.is_filtered());
    assert_eq!(result.records().len(), PAGE_SIZE);
    let fetches = source.fetch_count();

    // swapping to a known set is still a set change and resets the buffer
    let known = FilterSet::from_csv("missing-images");
    controller.request_page(&known, 1).await.unwrap();
    assert!(source.fetch_count() > fetches);
    assert!(!ids(
        controller
            .request_page(&known, 1)
            .await
            .unwrap()
            .records()
    )
    .contains(&2));
}

#[tokio::test]
async fn malformed_batch_serves_a_partial_buffer() {
    let mut controller =
        ListingController::with_options(MalformedSource, ListingOptions { batch_size: 25 });
    let filters = FilterSet::from_csv("missing-images");

    let result = controller.request_page(&filters, 1).await.unwrap();
    assert_eq!(result.records().len(), 5);
    assert!(!controller.has_more_upstream());

    // asking for a later page does not retry the broken continuation
    let beyond = controller.request_page(&filters, 2).await.unwrap();
    assert!(beyond.records().is_empty());
}

#[tokio::test]
async fn wire_request_resumes_from_a_continuation_cursor() {
    let source = ScriptedSource::new(catalog_of_25(&[2, 5, 9, 14, 20]));
    let mut controller = controller_with_batch(source.clone(), 15);

    // a fresh controller handed the cursor from a previous session starts
    // accumulating where that session left off
    let request = ListingRequest {
        filter_identifiers: vec!["missing-images".to_string()],
        continuation_cursor: Some("15".to_string()),
        requested_page: 1,
    };
    let response = controller.handle(&request).await.unwrap();
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(ids(&response.records), vec![16, 17, 18, 19, 21, 22, 23, 24, 25]);
    assert!(!response.has_more_upstream);
    assert!(response.server_page_info.is_none());
}

#[tokio::test]
async fn wire_request_without_filters_reports_server_page_info() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);

    let request = ListingRequest {
        filter_identifiers: Vec::new(),
        continuation_cursor: Some("10".to_string()),
        requested_page: 1,
    };
    let response = controller.handle(&request).await.unwrap();
    assert_eq!(ids(&response.records), (11..=20).collect::<Vec<_>>());
    let info = response.server_page_info.expect("server page info");
    assert_eq!(info.end_cursor.as_deref(), Some("20"));
    assert!(response.filtered_continuation_cursor.is_none());
}

#[tokio::test]
async fn non_advancing_cursor_stops_the_growth_loop() {
    let fetches = Arc::new(Mutex::new(0));
    let mut controller = ListingController::with_options(
        StalledSource {
            fetches: fetches.clone(),
        },
        ListingOptions { batch_size: 3 },
    );
    let filters = FilterSet::from_csv("missing-images");

    // the second fetch returns the same end cursor as the first; the growth
    // loop must give up instead of refetching forever
    let result = controller.request_page(&filters, 1).await.unwrap();
    assert_eq!(*fetches.lock().unwrap(), 2);
    assert!(!controller.has_more_upstream());
    assert_eq!(result.records().len(), 6);
}

#[tokio::test]
async fn multi_page_run_advances_server_pagination() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);
    let mut pages: Vec<(usize, Vec<usize>)> = Vec::new();

    crate::app::collect_pages(&mut controller, &FilterSet::default(), 1, 3, |result| {
        pages.push((result.page(), ids(result.records())));
    })
    .await
    .unwrap();

    // each run iteration moves the server cursor forward, no repeats
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(pages[0], (1, (1..=10).collect()));
    assert_eq!(pages[1], (2, (11..=20).collect()));
    assert_eq!(pages[2], (3, (21..=25).collect()));
}

#[tokio::test]
async fn multi_page_run_walks_to_the_start_page_without_filters() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);
    let mut pages: Vec<(usize, Vec<usize>)> = Vec::new();

    // the upstream cursor only moves forward, so starting at page two costs
    // a fetch for page one on the way there
    crate::app::collect_pages(&mut controller, &FilterSet::default(), 2, 2, |result| {
        pages.push((result.page(), ids(result.records())));
    })
    .await
    .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], (2, (11..=20).collect()));
    assert_eq!(pages[1], (3, (21..=25).collect()));
}

#[tokio::test]
async fn multi_page_run_stops_at_upstream_exhaustion() {
    let source = ScriptedSource::new(catalog_of_25(&[]));
    let mut controller = controller_with_batch(source.clone(), 10);
    let mut served = 0;

    crate::app::collect_pages(&mut controller, &FilterSet::default(), 1, 10, |_| served += 1)
        .await
        .unwrap();

    assert_eq!(served, 3);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn exactly_full_final_page_ends_the_run_cleanly() {
    // 20 survivors split into two exactly-full pages; the run must not issue
    // a third, empty one
    let source = ScriptedSource::new((1..=20).map(|n| record(n, false)).collect());
    let mut controller = controller_with_batch(source.clone(), 20);
    let filters = FilterSet::from_csv("missing-images");
    let mut lengths = Vec::new();

    crate::app::collect_pages(&mut controller, &filters, 1, 5, |result| {
        lengths.push(result.records().len());
    })
    .await
    .unwrap();

    assert_eq!(lengths, vec![10, 10]);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn clearing_filters_returns_to_server_pagination() {
    let source = ScriptedSource::new(catalog_of_25(&[2]));
    let mut controller = controller_with_batch(source.clone(), 10);

    let filters = FilterSet::from_csv("missing-images");
    controller.request_page(&filters, 1).await.unwrap();
    assert!(controller.buffered() > 0);

    let result = controller.request_page(&FilterSet::default(), 1).await.unwrap();
    assert!(!result.is_filtered());
    assert_eq!(result.page(), 1);
    assert_eq!(controller.buffered(), 0);
    assert_eq!(ids(result.records()), (1..=10).collect::<Vec<_>>());
}
