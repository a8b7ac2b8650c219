//! End-to-end pagination through the list tools against a fake Okta API.

mod common;

use common::{items, no_delay, FakeApi, FakePage};
use okta_mcp_server::error::{AuthError, OktaError};
use okta_mcp_server::pagination::PaginationOptions;
use okta_mcp_server::tools::groups::{list_groups, ListGroupsArgs};
use okta_mcp_server::tools::system_logs::{get_logs, GetLogsArgs};
use okta_mcp_server::tools::users::{list_users, ListUsersArgs};
use std::time::Duration;

#[tokio::test]
async fn test_single_page_exposes_cursor() {
    let api = FakeApi::new().with_list(
        items("00g", 20),
        FakePage::followed_by(vec![Ok(items("00h", 5))]),
    );

    let result = list_groups(&api, no_delay(), ListGroupsArgs::default()).await;

    assert_eq!(result["total_fetched"], 20);
    assert_eq!(result["has_more"], true);
    assert_eq!(result["next_cursor"], "next-page");
    assert_eq!(result["fetch_all_used"], false);
    assert!(result.get("pagination_info").is_none());
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn test_fetch_all_groups_follows_every_page() {
    let api = FakeApi::new().with_list(
        items("00g", 20),
        FakePage::followed_by(vec![Ok(items("00h", 5))]),
    );
    let args = ListGroupsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = list_groups(&api, no_delay(), args).await;

    assert_eq!(result["items"].as_array().map(Vec::len), Some(25));
    assert_eq!(result["total_fetched"], 25);
    assert_eq!(result["has_more"], false);
    assert!(result["next_cursor"].is_null());
    assert_eq!(result["fetch_all_used"], true);
    assert_eq!(result["pagination_info"]["pages_fetched"], 2);
    assert_eq!(result["pagination_info"]["stopped_early"], false);
    assert!(result.get("warning").is_none());
}

#[tokio::test]
async fn test_fetch_all_stops_at_page_limit() {
    let api = FakeApi::new().with_list(
        items("00u", 20),
        FakePage::followed_by(vec![
            Ok(items("a", 20)),
            Ok(items("b", 20)),
            Ok(items("c", 20)),
        ]),
    );
    let options = PaginationOptions {
        max_pages: 2,
        delay: Duration::ZERO,
    };
    let args = ListUsersArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = list_users(&api, options, args).await;

    assert_eq!(result["total_fetched"], 40);
    assert_eq!(result["has_more"], false);
    assert_eq!(result["pagination_info"]["pages_fetched"], 2);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    assert_eq!(
        result["pagination_info"]["stop_reason"],
        "Reached maximum page limit (2)"
    );
}

#[tokio::test]
async fn test_fetch_all_keeps_items_before_an_error() {
    let api = FakeApi::new().with_list(
        items("00u", 20),
        FakePage::followed_by(vec![
            Ok(items("a", 20)),
            Err(OktaError::api(500, "Internal Server Error")),
            Ok(items("never", 20)),
        ]),
    );
    let args = ListUsersArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = list_users(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 40);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    let reason = result["pagination_info"]["stop_reason"]
        .as_str()
        .unwrap_or_default();
    assert!(reason.starts_with("API error"), "{reason}");
}

#[tokio::test]
async fn test_list_users_projects_summary_fields() {
    let user = serde_json::json!({
        "id": "00u1",
        "status": "ACTIVE",
        "profile": { "login": "a@example.com" },
        "_links": { "self": {} },
        "credentials": {}
    });
    let api = FakeApi::new().with_list(vec![user], FakePage::last());

    let result = list_users(&api, no_delay(), ListUsersArgs::default()).await;

    let first = &result["items"][0];
    assert_eq!(first["id"], "00u1");
    assert_eq!(first["profile"]["login"], "a@example.com");
    assert!(first.get("_links").is_none());
    assert!(first.get("credentials").is_none());
}

#[tokio::test]
async fn test_limit_is_clamped_before_the_request() {
    let api = FakeApi::new();
    let args = ListUsersArgs {
        limit: Some(500),
        search: Some("profile.department eq \"Eng\"".into()),
        ..Default::default()
    };

    let result = list_users(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 0);
    let calls = api.calls();
    assert_eq!(calls[0].path, "/api/v1/users");
    assert_eq!(calls[0].param("limit"), Some("100"));
    assert_eq!(calls[0].param("search"), Some("profile.department eq \"Eng\""));
}

#[tokio::test]
async fn test_list_error_is_reported_as_payload() {
    let api = FakeApi::new().with_list_error(OktaError::api(403, "You do not have permission"));

    let result = list_groups(&api, no_delay(), ListGroupsArgs::default()).await;

    let error = result["error"].as_str().unwrap_or_default();
    assert!(error.starts_with("Error:"), "{error}");
    assert!(error.contains("You do not have permission"));
}

#[tokio::test]
async fn test_logs_continue_on_cursor_when_probe_is_false() {
    let api = FakeApi::new()
        .with_list(items("log-a", 30), FakePage::log(Some(false), Some("c1")))
        .with_list(items("log-b", 10), FakePage::log(Some(false), None));
    let args = GetLogsArgs {
        fetch_all: true,
        since: Some("2026-10-01T00:00:00Z".into()),
        ..Default::default()
    };

    let result = get_logs(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 40);
    assert_eq!(result["pagination_info"]["pages_fetched"], 2);
    assert_eq!(result["pagination_info"]["stopped_early"], false);
    assert!(result.get("warning").is_none());

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].param("after"), Some("c1"));
    assert_eq!(calls[1].param("since"), Some("2026-10-01T00:00:00Z"));
}

#[tokio::test]
async fn test_logs_full_page_without_cursor_stops_with_warning() {
    let api = FakeApi::new()
        .with_list(items("p1-", 100), FakePage::log(Some(true), Some("c1")))
        .with_list(items("p2-", 100), FakePage::log(Some(true), Some("c2")))
        .with_list(items("p3-", 100), FakePage::log(Some(false), None));
    let args = GetLogsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = get_logs(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 300);
    assert_eq!(result["has_more"], false);
    assert_eq!(result["pagination_info"]["pages_fetched"], 3);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    let warning = result["warning"].as_str().unwrap_or_default();
    assert!(warning.contains("full page of 100 items"), "{warning}");
    assert_eq!(api.calls().len(), 3);
}

#[tokio::test]
async fn test_logs_single_page_without_fetch_all() {
    let api = FakeApi::new().with_list(items("log", 100), FakePage::log(Some(true), Some("c9")));

    let result = get_logs(&api, no_delay(), GetLogsArgs::default()).await;

    assert_eq!(result["total_fetched"], 100);
    assert_eq!(result["has_more"], true);
    assert_eq!(result["next_cursor"], "c9");
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn test_item_count_never_shrinks_across_pages() {
    let pages: Vec<_> = (0..4).map(|i| Ok(items(&format!("p{i}-"), 20))).collect();
    let api = FakeApi::new().with_list(items("first-", 20), FakePage::followed_by(pages));
    let args = ListGroupsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = list_groups(&api, no_delay(), args).await;

    let ids: Vec<&str> = result["items"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids.len(), 100);
    assert_eq!(ids[0], "first-0");
    assert_eq!(ids[99], "p3-19");
}

fn stop_reason(result: &serde_json::Value) -> &str {
    result["pagination_info"]["stop_reason"]
        .as_str()
        .unwrap_or_default()
}

fn token_expired() -> OktaError {
    OktaError::Auth(AuthError::Other("token expired".into()))
}

#[tokio::test]
async fn test_fetch_all_transport_error_is_an_exception() {
    let api = FakeApi::new().with_list(
        items("00u", 20),
        FakePage::followed_by(vec![Ok(items("a", 20)), Err(token_expired())]),
    );
    let args = ListUsersArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = list_users(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 40);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    let reason = stop_reason(&result);
    assert!(reason.starts_with("Exception:"), "{reason}");
    assert!(reason.contains("token expired"), "{reason}");
}

#[tokio::test]
async fn test_logs_stop_at_page_limit() {
    let mut api = FakeApi::new().with_list(items("p0-", 100), FakePage::log(Some(true), Some("c0")));
    for page in 1..10 {
        let cursor = format!("c{page}");
        api = api.with_list(
            items(&format!("p{page}-"), 100),
            FakePage::log(Some(true), Some(&cursor)),
        );
    }
    let options = PaginationOptions {
        max_pages: 3,
        delay: Duration::ZERO,
    };
    let args = GetLogsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = get_logs(&api, options, args).await;

    assert_eq!(result["total_fetched"], 300);
    assert_eq!(result["has_more"], false);
    assert_eq!(result["pagination_info"]["pages_fetched"], 3);
    assert_eq!(result["pagination_info"]["total_items"], 300);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    assert_eq!(stop_reason(&result), "Reached maximum page limit (3)");
    assert!(result.get("warning").is_none());
    assert_eq!(api.calls().len(), 3);
}

#[tokio::test]
async fn test_logs_keep_first_page_when_next_request_fails() {
    let api = FakeApi::new()
        .with_list(items("p1-", 100), FakePage::log(Some(true), Some("c1")))
        .with_list_error(OktaError::api(429, "Too many requests"));
    let args = GetLogsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = get_logs(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 100);
    assert_eq!(result["has_more"], false);
    assert_eq!(result["pagination_info"]["pages_fetched"], 1);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    assert_eq!(stop_reason(&result), "API error: HTTP 429: Too many requests");
    assert!(result.get("warning").is_none());
    assert_eq!(api.calls()[1].param("after"), Some("c1"));
}

#[tokio::test]
async fn test_logs_transport_error_is_an_exception() {
    let api = FakeApi::new()
        .with_list(items("p1-", 100), FakePage::log(Some(true), Some("c1")))
        .with_list_error(token_expired());
    let args = GetLogsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = get_logs(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 100);
    assert_eq!(result["pagination_info"]["stopped_early"], true);
    let reason = stop_reason(&result);
    assert!(reason.starts_with("Exception:"), "{reason}");
}

#[tokio::test]
async fn test_logs_empty_next_page_ends_cleanly() {
    let api = FakeApi::new()
        .with_list(items("p1-", 100), FakePage::log(Some(true), Some("c1")))
        .with_list(Vec::new(), FakePage::log(Some(true), Some("c2")));
    let args = GetLogsArgs {
        fetch_all: true,
        ..Default::default()
    };

    let result = get_logs(&api, no_delay(), args).await;

    assert_eq!(result["total_fetched"], 100);
    assert_eq!(result["pagination_info"]["pages_fetched"], 1);
    assert_eq!(result["pagination_info"]["stopped_early"], false);
    assert!(result["pagination_info"]["stop_reason"].is_null());
    assert!(result.get("warning").is_none());
    assert_eq!(api.calls().len(), 2);
}
