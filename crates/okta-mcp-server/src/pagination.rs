//! Cursor pagination for Okta list endpoints.
//!
//! Okta pages with an opaque `after` cursor carried inside the next-page URL.
//! Two strategies live here:
//!
//! - [`paginate_all_results`] follows the response handle until it reports no
//!   more data. Used by every list endpoint except logs.
//! - [`paginate_log_results`] re-issues the log query with the extracted
//!   cursor. The log endpoint under-reports continuation (especially with
//!   `since`/`until`), so it keeps going while any of three signals says so.
//!
//! Failures inside a multi-page fetch never escape: they stop the walk and are
//! recorded in [`PaginationInfo::stop_reason`] next to the partial result.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::client::{OktaApi, PagedResponse};
use crate::error::OktaError;

pub const MIN_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);
/// Page size assumed for log fetches when the caller gave no limit.
pub const DEFAULT_LOG_PAGE_SIZE: u32 = 100;

/// Clamp a requested page size into `[20, 100]`.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Clamp a caller supplied limit at the tool boundary, logging the correction.
pub fn normalize_limit(limit: Option<i64>) -> Option<u32> {
    limit.map(|requested| {
        if requested < i64::from(MIN_PAGE_SIZE) {
            warn!("Limit {requested} is below minimum ({MIN_PAGE_SIZE}), setting to {MIN_PAGE_SIZE}");
            MIN_PAGE_SIZE
        } else if requested > i64::from(MAX_PAGE_SIZE) {
            warn!("Limit {requested} exceeds maximum ({MAX_PAGE_SIZE}), setting to {MAX_PAGE_SIZE}");
            MAX_PAGE_SIZE
        } else {
            requested as u32
        }
    })
}

/// Ordered query string parameters holding only non-empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value. Empty values are ignored.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn insert_opt(&mut self, key: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.insert(key, value.to_string());
        }
    }

    pub fn with(mut self, key: &str, value: Option<impl ToString>) -> Self {
        self.insert_opt(key, value);
        self
    }

    /// Copy of these parameters positioned at `cursor`.
    pub fn with_after(&self, cursor: &str) -> Self {
        let mut next = self.clone();
        next.insert("after", cursor);
        next
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

/// Build the common list parameters. `limit` must already be clamped.
pub fn build_query_params(
    search: Option<&str>,
    filter: Option<&str>,
    q: Option<&str>,
    after: Option<&str>,
    limit: Option<u32>,
) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert_opt("search", search);
    params.insert_opt("filter", filter);
    params.insert_opt("q", q);
    params.insert_opt("after", after);
    params.insert_opt("limit", limit.filter(|l| *l > 0));
    params
}

/// Read the `after` parameter out of a next-page link, ignoring any
/// continuation probe. Parse failures count as "no cursor".
pub fn cursor_from_link(link: Option<&str>) -> Option<String> {
    let link = link?;
    // Okta hands out absolute links, but relative ones show up in fakes and proxies.
    let base = Url::parse("https://okta.invalid/").ok()?;
    match base.join(link) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "after")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty()),
        Err(e) => {
            warn!("[pagination] Failed to extract after cursor from {link:?}: {e}");
            None
        }
    }
}

/// Continuation cursor of `response`, or `None` when the handle is missing,
/// cannot report continuation, or reports that nothing is left.
pub fn extract_after_cursor(response: Option<&dyn PagedResponse>) -> Option<String> {
    let response = response?;
    if response.has_next() != Some(true) {
        return None;
    }
    cursor_from_link(response.next_link())
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationOptions {
    /// Safety limit on the number of pages, the first page included.
    pub max_pages: usize,
    /// Pause before every follow-up request.
    pub delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Why a multi-page fetch ended before the data ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ApiError(String),
    Exception(String),
    /// The log endpoint signalled more data but gave us nothing to ask for it with.
    NoCursor { page_items: usize, full_page: bool },
    PageLimit(usize),
}

impl StopReason {
    fn from_error(err: &OktaError) -> Self {
        if err.is_api_error() {
            StopReason::ApiError(err.to_string())
        } else {
            StopReason::Exception(err.to_string())
        }
    }

    /// Stops that point at an inconsistency upstream rather than a fault.
    pub fn is_warning(&self) -> bool {
        matches!(self, StopReason::NoCursor { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ApiError(e) => write!(f, "API error: {e}"),
            StopReason::Exception(e) => write!(f, "Exception: {e}"),
            StopReason::NoCursor {
                page_items,
                full_page: true,
            } => write!(
                f,
                "No cursor available despite full page of {page_items} items; results may be incomplete"
            ),
            StopReason::NoCursor { .. } => write!(
                f,
                "No cursor available although more results were reported; results may be incomplete"
            ),
            StopReason::PageLimit(max) => write!(f, "Reached maximum page limit ({max})"),
        }
    }
}

impl Serialize for StopReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaginationInfo {
    pub pages_fetched: usize,
    pub total_items: usize,
    pub stopped_early: bool,
    pub stop_reason: Option<StopReason>,
}

impl PaginationInfo {
    fn first_page(items: usize) -> Self {
        Self {
            pages_fetched: 1,
            total_items: items,
            stopped_early: false,
            stop_reason: None,
        }
    }

    fn stop(&mut self, reason: StopReason) {
        self.stopped_early = true;
        self.stop_reason = Some(reason);
    }
}

/// Uniform envelope returned by every paginating tool.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub total_fetched: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub fetch_all_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_info: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Follow `response` until it runs dry, errors, or hits the page limit.
pub async fn paginate_all_results(
    response: &mut dyn PagedResponse,
    initial_items: Vec<Value>,
    options: PaginationOptions,
) -> (Vec<Value>, PaginationInfo) {
    let mut all_items = initial_items;
    let mut info = PaginationInfo::first_page(all_items.len());

    if response.has_next().is_none() {
        debug!("[pagination] Response cannot report continuation, returning first page");
        return (all_items, info);
    }

    while response.has_next() == Some(true) && info.pages_fetched < options.max_pages {
        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        match response.fetch_next().await {
            Ok(items) if items.is_empty() => break,
            Ok(items) => {
                all_items.extend(items);
                info.pages_fetched += 1;
                debug!(
                    "[pagination] Fetched page {}, total items: {}",
                    info.pages_fetched,
                    all_items.len()
                );
            }
            Err(e) => {
                if e.is_api_error() {
                    warn!(
                        "[pagination] Error fetching page {}: {}",
                        info.pages_fetched + 1,
                        e
                    );
                } else {
                    error!(
                        "[pagination] Exception during pagination on page {}: {}",
                        info.pages_fetched + 1,
                        e
                    );
                }
                info.stop(StopReason::from_error(&e));
                break;
            }
        }
    }

    if !info.stopped_early
        && info.pages_fetched >= options.max_pages
        && response.has_next() == Some(true)
    {
        warn!(
            "[pagination] Stopped pagination at {} pages limit",
            options.max_pages
        );
        info.stop(StopReason::PageLimit(options.max_pages));
    }

    info.total_items = all_items.len();
    (all_items, info)
}

/// Walk the system log by re-issuing `query` with each extracted cursor.
///
/// Continues while a cursor is extractable, the last page was exactly
/// `page_size` items, or the handle says more data exists. When the walk
/// needs to continue but no cursor is available it stops with a warning-level
/// [`StopReason::NoCursor`].
pub async fn paginate_log_results(
    api: &dyn OktaApi,
    path: &str,
    query: &QueryParams,
    initial_items: Vec<Value>,
    initial_response: Box<dyn PagedResponse>,
    page_size: u32,
    options: PaginationOptions,
) -> (Vec<Value>, PaginationInfo) {
    let page_size = page_size as usize;
    let mut last_page_len = initial_items.len();
    let mut all_items = initial_items;
    let mut info = PaginationInfo::first_page(all_items.len());
    let mut response = initial_response;

    loop {
        let cursor = cursor_from_link(response.next_link());
        let full_page = page_size > 0 && last_page_len == page_size;
        let probe = response.has_next() == Some(true);

        if cursor.is_none() && !full_page && !probe {
            debug!(
                "[pagination] Log pagination finished after {} pages",
                info.pages_fetched
            );
            break;
        }

        if info.pages_fetched >= options.max_pages {
            warn!(
                "[pagination] Stopped log pagination at {} pages limit",
                options.max_pages
            );
            info.stop(StopReason::PageLimit(options.max_pages));
            break;
        }

        let Some(cursor) = cursor else {
            let reason = StopReason::NoCursor {
                page_items: last_page_len,
                full_page,
            };
            warn!(
                "[pagination] Page {}: {} (probe={})",
                info.pages_fetched, reason, probe
            );
            info.stop(reason);
            break;
        };

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        let next_query = query.with_after(&cursor);
        match api.list(path, &next_query).await {
            Ok((items, _)) if items.is_empty() => break,
            Ok((items, next_response)) => {
                last_page_len = items.len();
                all_items.extend(items);
                info.pages_fetched += 1;
                response = next_response;
                debug!(
                    "[pagination] Fetched log page {}, total items: {}",
                    info.pages_fetched,
                    all_items.len()
                );
            }
            Err(e) => {
                warn!(
                    "[pagination] Error fetching log page {}: {}",
                    info.pages_fetched + 1,
                    e
                );
                info.stop(StopReason::from_error(&e));
                break;
            }
        }
    }

    info.total_items = all_items.len();
    (all_items, info)
}

/// Wrap a result set in the paginated envelope.
///
/// With `fetch_all_used` the caller got everything obtainable, so `has_more`
/// is false and `next_cursor` is empty regardless of the handle; an early stop
/// is only visible through `pagination_info`.
pub fn create_paginated_response(
    items: Vec<Value>,
    response: Option<&dyn PagedResponse>,
    fetch_all_used: bool,
    pagination_info: Option<PaginationInfo>,
) -> PaginatedResult {
    let (has_more, next_cursor) = if fetch_all_used {
        (false, None)
    } else {
        (
            response.and_then(|r| r.has_next()).unwrap_or(false),
            extract_after_cursor(response),
        )
    };

    let warning = pagination_info
        .as_ref()
        .and_then(|info| info.stop_reason.as_ref())
        .filter(|reason| reason.is_warning())
        .map(ToString::to_string);

    PaginatedResult {
        total_fetched: items.len(),
        items,
        has_more,
        next_cursor,
        fetch_all_used,
        pagination_info,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticHandle {
        has_next: Option<bool>,
        link: Option<&'static str>,
    }

    #[async_trait]
    impl PagedResponse for StaticHandle {
        fn has_next(&self) -> Option<bool> {
            self.has_next
        }

        fn next_link(&self) -> Option<&str> {
            self.link
        }

        async fn fetch_next(&mut self) -> crate::error::OktaResult<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn clamp_is_idempotent() {
        for n in [0, 1, 19, 20, 21, 50, 99, 100, 101, 500, u32::MAX] {
            let once = clamp_limit(n);
            assert_eq!(once, n.clamp(20, 100));
            assert_eq!(clamp_limit(once), once);
        }
        assert_eq!(normalize_limit(Some(-3)), Some(20));
        assert_eq!(normalize_limit(Some(5)), Some(20));
        assert_eq!(normalize_limit(Some(42)), Some(42));
        assert_eq!(normalize_limit(Some(250)), Some(100));
        assert_eq!(normalize_limit(None), None);
    }

    #[test]
    fn query_builder_keeps_only_present_fields() {
        let params = build_query_params(Some(""), Some("status eq \"ACTIVE\""), None, None, Some(20));
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("filter"), Some("status eq \"ACTIVE\""));
        assert_eq!(params.get("limit"), Some("20"));
        assert_eq!(params.get("search"), None);
    }

    #[test]
    fn with_after_replaces_cursor() {
        let params = build_query_params(None, None, None, Some("old"), Some(100));
        let next = params.with_after("new");
        assert_eq!(next.get("after"), Some("new"));
        assert_eq!(next.len(), 2);
        assert_eq!(params.get("after"), Some("old"));
    }

    #[test]
    fn extracts_cursor_from_relative_link() {
        let handle = StaticHandle {
            has_next: Some(true),
            link: Some("/x?after=C123&limit=50"),
        };
        assert_eq!(extract_after_cursor(Some(&handle)).as_deref(), Some("C123"));
    }

    #[test]
    fn missing_after_or_probe_yields_none() {
        let no_after = StaticHandle {
            has_next: Some(true),
            link: Some("https://dev.okta.com/api/v1/users?limit=50"),
        };
        assert_eq!(extract_after_cursor(Some(&no_after)), None);

        let probe_false = StaticHandle {
            has_next: Some(false),
            link: Some("/x?after=C123"),
        };
        assert_eq!(extract_after_cursor(Some(&probe_false)), None);

        let unsupported = StaticHandle {
            has_next: None,
            link: Some("/x?after=C123"),
        };
        assert_eq!(extract_after_cursor(Some(&unsupported)), None);

        assert_eq!(extract_after_cursor(None), None);

        let no_link = StaticHandle {
            has_next: Some(true),
            link: None,
        };
        assert_eq!(extract_after_cursor(Some(&no_link)), None);
    }

    #[test]
    fn cursor_from_link_ignores_probe() {
        assert_eq!(
            cursor_from_link(Some("https://dev.okta.com/api/v1/logs?after=17_2&limit=100"))
                .as_deref(),
            Some("17_2")
        );
        assert_eq!(cursor_from_link(Some("/x?after=")), None);
        assert_eq!(cursor_from_link(None), None);
    }

    #[test]
    fn fetch_all_envelope_never_reports_more() {
        let handle = StaticHandle {
            has_next: Some(true),
            link: Some("/x?after=C123"),
        };
        let result = create_paginated_response(vec![json!({"id": 1})], Some(&handle), true, None);
        assert!(!result.has_more);
        assert_eq!(result.next_cursor, None);
        assert_eq!(result.total_fetched, 1);

        let result = create_paginated_response(vec![json!({"id": 1})], Some(&handle), false, None);
        assert!(result.has_more);
        assert_eq!(result.next_cursor.as_deref(), Some("C123"));
    }

    #[test]
    fn envelope_without_handle_degrades() {
        let result = create_paginated_response(Vec::new(), None, false, None);
        assert!(!result.has_more);
        assert_eq!(result.next_cursor, None);
        assert_eq!(result.total_fetched, 0);
    }

    #[test]
    fn stop_reasons_serialize_as_text() {
        let mut info = PaginationInfo::first_page(3);
        info.stop(StopReason::PageLimit(50));
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["stop_reason"], "Reached maximum page limit (50)");
        assert_eq!(value["stopped_early"], true);

        let result = create_paginated_response(Vec::new(), None, true, Some(info));
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("warning").is_none());
        assert_eq!(value["pagination_info"]["pages_fetched"], 1);
    }

    #[test]
    fn missing_cursor_surfaces_warning() {
        let mut info = PaginationInfo::first_page(100);
        info.stop(StopReason::NoCursor {
            page_items: 100,
            full_page: true,
        });
        let result = create_paginated_response(Vec::new(), None, true, Some(info));
        let warning = result.warning.expect("warning");
        assert!(warning.to_lowercase().contains("no cursor"));
    }
}
