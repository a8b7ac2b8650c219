//! Group tools.
//!
//! `delete_group` is the one group operation that refuses to auto-confirm:
//! without elicitation it hands back a payload directing the agent to
//! `confirm_delete_group`, which only deletes on the literal `DELETE`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use super::{
    confirm_destructive, error_value, list_first_page, list_paginated, message, resource_or_error,
    Confirmation,
};
use crate::client::OktaApi;
use crate::elicitation::{ConfirmationKind, ElicitationClient};
use crate::messages;
use crate::pagination::{build_query_params, normalize_limit, PaginationOptions, QueryParams};
use crate::validation::validate_okta_id;

const GROUPS: &str = "/api/v1/groups";

/// Literal the legacy confirm tools expect.
pub const DELETE_CONFIRMATION: &str = "DELETE";

pub const CONFIRMATION_MISMATCH: &str =
    "Deletion cancelled. Confirmation 'DELETE' was not provided correctly.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListGroupsArgs {
    /// Search expression on group attributes, e.g. profile.name sw "Engineering"
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    /// Prefix match on the group name
    #[serde(default)]
    pub q: Option<String>,
    /// Fetch every page instead of a single one
    #[serde(default)]
    pub fetch_all: bool,
    /// Cursor returned as next_cursor by a previous call
    #[serde(default)]
    pub after: Option<String>,
    /// Page size (min 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupIdArgs {
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupProfileArgs {
    /// Group profile with name and optional description
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateGroupArgs {
    pub group_id: String,
    /// Replacement group profile
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmDeleteGroupArgs {
    pub group_id: String,
    /// Must be exactly 'DELETE', as typed by the user
    pub confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListGroupUsersArgs {
    pub group_id: String,
    #[serde(default)]
    pub fetch_all: bool,
    #[serde(default)]
    pub after: Option<String>,
    /// Page size (min 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupMembershipArgs {
    pub group_id: String,
    pub user_id: String,
}

fn group_path(group_id: &str) -> String {
    format!("{GROUPS}/{group_id}")
}

pub async fn list_groups(
    api: &dyn OktaApi,
    options: PaginationOptions,
    args: ListGroupsArgs,
) -> Value {
    info!("Listing groups from Okta organization");
    debug!("{:?}", args);
    let query = build_query_params(
        args.search.as_deref(),
        args.filter.as_deref(),
        args.q.as_deref(),
        args.after.as_deref(),
        normalize_limit(args.limit),
    );
    list_paginated(
        api,
        GROUPS,
        &query,
        args.fetch_all,
        options,
        "groups",
        std::convert::identity,
    )
    .await
}

pub async fn get_group(api: &dyn OktaApi, args: GroupIdArgs) -> Value {
    info!("Getting group with ID: {}", args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id") {
        return error_value(&e);
    }
    resource_or_error(
        api.get(&group_path(&args.group_id), &QueryParams::new()).await,
        &format!("getting group {}", args.group_id),
    )
}

pub async fn create_group(api: &dyn OktaApi, args: GroupProfileArgs) -> Value {
    info!("Creating new group in Okta organization");
    let body = json!({ "profile": args.profile });
    resource_or_error(
        api.post(GROUPS, &QueryParams::new(), Some(body)).await,
        "creating group",
    )
}

pub async fn update_group(api: &dyn OktaApi, args: UpdateGroupArgs) -> Value {
    info!("Updating group with ID: {}", args.group_id);
    debug!("Updated fields: {:?}", args.profile.keys().collect::<Vec<_>>());
    if let Err(e) = validate_okta_id(&args.group_id, "group_id") {
        return error_value(&e);
    }
    let body = json!({ "profile": args.profile });
    resource_or_error(
        api.put(&group_path(&args.group_id), Some(body)).await,
        &format!("updating group {}", args.group_id),
    )
}

async fn remove_group(api: &dyn OktaApi, group_id: &str) -> Value {
    match api.delete(&group_path(group_id)).await {
        Ok(()) => {
            info!("Successfully deleted group: {}", group_id);
            message(format!("Group {group_id} deleted successfully"))
        }
        Err(e) => {
            error!("Error while deleting group {}: {}", group_id, e);
            error_value(&e)
        }
    }
}

pub async fn delete_group(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: GroupIdArgs,
) -> Value {
    let group_id = args.group_id;
    warn!("Deletion requested for group {}", group_id);
    if let Err(e) = validate_okta_id(&group_id, "group_id") {
        return error_value(&e);
    }

    let fallback = json!({
        "confirmation_required": true,
        "message": format!(
            "To confirm deletion of group {group_id}, please call confirm_delete_group \
             with confirmation '{DELETE_CONFIRMATION}'"
        ),
        "group_id": group_id,
        "tool_to_use": "confirm_delete_group",
    });

    match confirm_destructive(
        client,
        &messages::delete_group(&group_id),
        ConfirmationKind::Delete,
        Some(fallback),
        false,
        format!("Deletion of group {group_id} cancelled by user."),
    )
    .await
    {
        Confirmation::Proceed => remove_group(api, &group_id).await,
        Confirmation::Respond(response) => response,
    }
}

pub async fn confirm_delete_group(api: &dyn OktaApi, args: ConfirmDeleteGroupArgs) -> Value {
    info!("Processing deletion confirmation for group {}", args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id") {
        return error_value(&e);
    }
    if args.confirmation != DELETE_CONFIRMATION {
        warn!(
            "Group deletion cancelled for {} - incorrect confirmation",
            args.group_id
        );
        return json!({ "error": CONFIRMATION_MISMATCH });
    }
    remove_group(api, &args.group_id).await
}

pub async fn list_group_users(
    api: &dyn OktaApi,
    options: PaginationOptions,
    args: ListGroupUsersArgs,
) -> Value {
    info!("Listing users in group: {}", args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id") {
        return error_value(&e);
    }
    let query = build_query_params(
        None,
        None,
        None,
        args.after.as_deref(),
        normalize_limit(args.limit),
    );
    let path = format!("{}/users", group_path(&args.group_id));
    list_paginated(
        api,
        &path,
        &query,
        args.fetch_all,
        options,
        "group users",
        std::convert::identity,
    )
    .await
}

pub async fn list_group_apps(api: &dyn OktaApi, args: GroupIdArgs) -> Value {
    info!("Listing applications assigned to group: {}", args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id") {
        return error_value(&e);
    }
    let path = format!("{}/apps", group_path(&args.group_id));
    list_first_page(api, &path, &QueryParams::new(), "group applications").await
}

pub async fn add_user_to_group(api: &dyn OktaApi, args: GroupMembershipArgs) -> Value {
    info!("Adding user {} to group {}", args.user_id, args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id")
        .and_then(|_| validate_okta_id(&args.user_id, "user_id"))
    {
        return error_value(&e);
    }
    let path = format!("{}/users/{}", group_path(&args.group_id), args.user_id);
    match api.put(&path, None).await {
        Ok(_) => message("User added to group successfully"),
        Err(e) => {
            error!(
                "Error while adding user {} to group {}: {}",
                args.user_id, args.group_id, e
            );
            error_value(&e)
        }
    }
}

pub async fn remove_user_from_group(api: &dyn OktaApi, args: GroupMembershipArgs) -> Value {
    info!("Removing user {} from group {}", args.user_id, args.group_id);
    if let Err(e) = validate_okta_id(&args.group_id, "group_id")
        .and_then(|_| validate_okta_id(&args.user_id, "user_id"))
    {
        return error_value(&e);
    }
    let path = format!("{}/users/{}", group_path(&args.group_id), args.user_id);
    match api.delete(&path).await {
        Ok(()) => message("User removed from group successfully"),
        Err(e) => {
            error!(
                "Error while removing user {} from group {}: {}",
                args.user_id, args.group_id, e
            );
            error_value(&e)
        }
    }
}
