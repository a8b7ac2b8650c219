//! System log tool.
//!
//! The log endpoint is polled with `since`/`until` windows where Okta's own
//! "more pages" signal is unreliable, so `fetch_all` always goes through the
//! log paginator instead of trusting the first response's probe.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{error_value, to_json};
use crate::client::OktaApi;
use crate::pagination::{
    build_query_params, create_paginated_response, normalize_limit, paginate_log_results,
    PaginationOptions, DEFAULT_LOG_PAGE_SIZE,
};

const LOGS: &str = "/api/v1/logs";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetLogsArgs {
    /// Fetch every page instead of a single one
    #[serde(default)]
    pub fetch_all: bool,
    /// Cursor returned as next_cursor by a previous call
    #[serde(default)]
    pub after: Option<String>,
    /// Page size (min 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Lower time bound, ISO 8601 (e.g. 2024-01-01T00:00:00.000Z)
    #[serde(default)]
    pub since: Option<String>,
    /// Upper time bound, ISO 8601
    #[serde(default)]
    pub until: Option<String>,
    /// Filter expression, e.g. eventType eq "user.session.start"
    #[serde(default)]
    pub filter: Option<String>,
    /// Keyword search across event fields
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn get_logs(api: &dyn OktaApi, options: PaginationOptions, args: GetLogsArgs) -> Value {
    info!("Retrieving system logs from Okta organization");
    debug!("{:?}", args);

    let limit = normalize_limit(args.limit);
    let query = build_query_params(
        None,
        args.filter.as_deref(),
        args.q.as_deref(),
        args.after.as_deref(),
        limit,
    )
    .with("since", args.since.as_deref())
    .with("until", args.until.as_deref());

    let (logs, response) = match api.list(LOGS, &query).await {
        Ok(page) => page,
        Err(e) => {
            error!("Okta API error while retrieving system logs: {}", e);
            return error_value(&e);
        }
    };

    if logs.is_empty() {
        info!("No system logs found");
        return to_json(&create_paginated_response(
            Vec::new(),
            Some(&*response),
            args.fetch_all,
            None,
        ));
    }

    debug!("Retrieved {} system log entries in first page", logs.len());
    if let Some(published) = logs[0].get("published").and_then(Value::as_str) {
        debug!("First log entry timestamp: {}", published);
    }

    if !args.fetch_all {
        info!("Successfully retrieved {} system log entries", logs.len());
        return to_json(&create_paginated_response(
            logs,
            Some(&*response),
            false,
            None,
        ));
    }

    info!(
        "fetch_all=true, auto-paginating from initial {} log entries",
        logs.len()
    );
    let page_size = limit.unwrap_or(DEFAULT_LOG_PAGE_SIZE);
    let (all_logs, info) =
        paginate_log_results(api, LOGS, &query, logs, response, page_size, options).await;
    if let Some(reason) = info.stop_reason.as_ref().filter(|r| r.is_warning()) {
        warn!("Log retrieval may be incomplete: {}", reason);
    }
    info!(
        "Successfully retrieved {} log entries across {} pages",
        all_logs.len(),
        info.pages_fetched
    );
    to_json(&create_paginated_response(all_logs, None, true, Some(info)))
}
