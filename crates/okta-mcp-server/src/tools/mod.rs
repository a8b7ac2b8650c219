//! Okta tool bodies.
//!
//! Each handler maps its arguments onto one or more `OktaApi` calls and
//! returns the JSON handed back to the agent, keeping server.rs thin. Handlers
//! never fail: Okta errors come back as `{"error": "..."}`.

pub mod applications;
pub mod groups;
pub mod mappings;
pub mod policies;
pub mod system_logs;
pub mod users;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::client::OktaApi;
use crate::elicitation::{elicit_or_fallback, ConfirmationKind, ElicitationClient};
use crate::error::OktaError;
use crate::pagination::{
    create_paginated_response, paginate_all_results, PaginationOptions, QueryParams,
};

/// `{"error": "Error: ..."}` for Okta errors, `{"error": "Exception: ..."}` otherwise.
pub(crate) fn error_value(err: &OktaError) -> Value {
    json!({ "error": err.to_tool_message() })
}

pub(crate) fn message(text: impl Into<String>) -> Value {
    json!({ "message": text.into() })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": format!("Exception: {e}") }))
}

/// Whether a destructive call may go ahead.
pub(crate) enum Confirmation {
    Proceed,
    /// Return this instead of calling the API.
    Respond(Value),
}

/// Route a destructive operation through elicitation.
///
/// A missing confirmation yields the fallback payload when the client could
/// not be asked, and `cancelled` when the user answered anything but yes.
pub(crate) async fn confirm_destructive(
    client: &dyn ElicitationClient,
    prompt: &str,
    kind: ConfirmationKind,
    fallback_payload: Option<Value>,
    auto_confirm_on_fallback: bool,
    cancelled: String,
) -> Confirmation {
    let outcome =
        elicit_or_fallback(client, prompt, kind, fallback_payload, auto_confirm_on_fallback).await;
    if outcome.confirmed {
        return Confirmation::Proceed;
    }
    match outcome.fallback_response {
        Some(payload) => Confirmation::Respond(payload),
        None => {
            info!("{}", cancelled);
            Confirmation::Respond(message(cancelled))
        }
    }
}

/// List `path`, optionally walking every page, and wrap the result in the
/// paginated envelope. `project` reshapes each item.
pub(crate) async fn list_paginated(
    api: &dyn OktaApi,
    path: &str,
    query: &QueryParams,
    fetch_all: bool,
    options: PaginationOptions,
    what: &str,
    project: fn(Value) -> Value,
) -> Value {
    let (items, mut response) = match api.list(path, query).await {
        Ok(page) => page,
        Err(e) => {
            error!("Okta API error while listing {}: {}", what, e);
            return error_value(&e);
        }
    };

    if items.is_empty() {
        info!("No {} found", what);
        return to_json(&create_paginated_response(
            Vec::new(),
            Some(&*response),
            fetch_all,
            None,
        ));
    }

    if fetch_all && response.has_next() == Some(true) {
        info!(
            "fetch_all=true, auto-paginating from initial {} {}",
            items.len(),
            what
        );
        let (all_items, info) = paginate_all_results(&mut *response, items, options).await;
        info!(
            "Successfully retrieved {} {} across {} pages",
            all_items.len(),
            what,
            info.pages_fetched
        );
        let all_items = all_items.into_iter().map(project).collect();
        return to_json(&create_paginated_response(
            all_items,
            Some(&*response),
            true,
            Some(info),
        ));
    }

    info!("Successfully retrieved {} {}", items.len(), what);
    let items = items.into_iter().map(project).collect();
    to_json(&create_paginated_response(
        items,
        Some(&*response),
        fetch_all,
        None,
    ))
}

/// First page of `path` as a plain JSON array.
pub(crate) async fn list_first_page(
    api: &dyn OktaApi,
    path: &str,
    query: &QueryParams,
    what: &str,
) -> Value {
    match api.list(path, query).await {
        Ok((items, _)) => {
            info!("Successfully retrieved {} {}", items.len(), what);
            Value::Array(items)
        }
        Err(e) => {
            error!("Okta API error while listing {}: {}", what, e);
            error_value(&e)
        }
    }
}

/// Single call returning the resource, or the error payload.
pub(crate) fn resource_or_error(result: Result<Value, OktaError>, context: &str) -> Value {
    match result {
        Ok(value) => {
            info!("Successfully completed: {}", context);
            value
        }
        Err(e) => {
            error!("Error while {}: {}", context, e);
            error_value(&e)
        }
    }
}
