//! User tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use super::{confirm_destructive, error_value, list_paginated, message, Confirmation};
use crate::client::OktaApi;
use crate::elicitation::{ConfirmationKind, ElicitationClient};
use crate::messages;
use crate::pagination::{build_query_params, normalize_limit, PaginationOptions, QueryParams};
use crate::validation::validate_okta_id;

const USERS: &str = "/api/v1/users";

/// Arguments for the list_users tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListUsersArgs {
    /// Search expression on user attributes, e.g. profile.department eq "Engineering"
    #[serde(default)]
    pub search: Option<String>,
    /// Filter expression, e.g. status eq "LOCKED_OUT"
    #[serde(default)]
    pub filter: Option<String>,
    /// Simple prefix match on first name, last name and email
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
pub struct UserIdArgs {
    /// Okta user id or login
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateUserArgs {
    /// User profile, must include firstName, lastName, email and login
    pub profile: Map<String, Value>,
    /// Activate the user immediately
    #[serde(default)]
    pub activate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateUserArgs {
    pub user_id: String,
    /// Profile attributes to change
    pub profile: Map<String, Value>,
}

fn user_path(user_id: &str) -> String {
    format!("{USERS}/{user_id}")
}

/// Users are returned as their id plus profile.
fn user_summary(user: Value) -> Value {
    json!({
        "id": user.get("id").cloned().unwrap_or(Value::Null),
        "status": user.get("status").cloned().unwrap_or(Value::Null),
        "profile": user.get("profile").cloned().unwrap_or(Value::Null),
    })
}

pub async fn list_users(
    api: &dyn OktaApi,
    options: PaginationOptions,
    args: ListUsersArgs,
) -> Value {
    info!("Listing users from Okta organization");
    debug!("{:?}", args);
    let query = build_query_params(
        args.search.as_deref(),
        args.filter.as_deref(),
        args.q.as_deref(),
        args.after.as_deref(),
        normalize_limit(args.limit),
    );
    list_paginated(api, USERS, &query, args.fetch_all, options, "users", user_summary).await
}

/// Profile attribute names present on the first user of the org.
pub async fn get_user_profile_attributes(api: &dyn OktaApi) -> Value {
    info!("Fetching user profile attributes");
    let query = QueryParams::new().with("limit", Some(1));
    match api.list(USERS, &query).await {
        Ok((users, _)) => match users.into_iter().next() {
            Some(user) => {
                let profile = user.get("profile").cloned().unwrap_or_else(|| json!({}));
                if let Some(attrs) = profile.as_object() {
                    info!("Successfully retrieved {} profile attributes", attrs.len());
                }
                profile
            }
            None => {
                info!("No users found in the organization");
                json!([])
            }
        },
        Err(e) => {
            error!("Okta API error while fetching profile attributes: {}", e);
            error_value(&e)
        }
    }
}

pub async fn get_user(api: &dyn OktaApi, args: UserIdArgs) -> Value {
    info!("Getting user with ID: {}", args.user_id);
    if let Err(e) = validate_okta_id(&args.user_id, "user_id") {
        return error_value(&e);
    }
    match api.get(&user_path(&args.user_id), &QueryParams::new()).await {
        Ok(user) => {
            info!("Successfully retrieved user: {}", args.user_id);
            user
        }
        Err(e) => {
            error!("Error while getting user {}: {}", args.user_id, e);
            error_value(&e)
        }
    }
}

pub async fn create_user(api: &dyn OktaApi, args: CreateUserArgs) -> Value {
    info!("Creating new user in Okta organization");
    debug!(
        "User profile: email={}, login={}",
        args.profile.get("email").and_then(serde_json::Value::as_str).unwrap_or("N/A"),
        args.profile.get("login").and_then(serde_json::Value::as_str).unwrap_or("N/A")
    );
    let query = QueryParams::new().with("activate", args.activate);
    let body = json!({ "profile": args.profile });
    match api.post(USERS, &query, Some(body)).await {
        Ok(user) => {
            info!(
                "Successfully created user: {}",
                user.get("id").and_then(serde_json::Value::as_str).unwrap_or("N/A")
            );
            user
        }
        Err(e) => {
            error!("Error while creating user: {}", e);
            error_value(&e)
        }
    }
}

/// Partial profile update; attributes not named keep their values.
pub async fn update_user(api: &dyn OktaApi, args: UpdateUserArgs) -> Value {
    info!("Updating user with ID: {}", args.user_id);
    if let Err(e) = validate_okta_id(&args.user_id, "user_id") {
        return error_value(&e);
    }
    let body = json!({ "profile": args.profile });
    match api
        .post(&user_path(&args.user_id), &QueryParams::new(), Some(body))
        .await
    {
        Ok(user) => {
            info!("Successfully updated user: {}", args.user_id);
            user
        }
        Err(e) => {
            error!("Error while updating user {}: {}", args.user_id, e);
            error_value(&e)
        }
    }
}

pub async fn deactivate_user(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: UserIdArgs,
) -> Value {
    let user_id = args.user_id;
    info!("Deactivation requested for user {}", user_id);
    if let Err(e) = validate_okta_id(&user_id, "user_id") {
        return error_value(&e);
    }

    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::deactivate_user(&user_id),
        ConfirmationKind::Deactivate,
        None,
        true,
        format!("Deactivation of user {user_id} cancelled by user."),
    )
    .await
    {
        return response;
    }

    let path = format!("{}/lifecycle/deactivate", user_path(&user_id));
    match api.post(&path, &QueryParams::new(), None).await {
        Ok(_) => {
            info!("Successfully deactivated user: {}", user_id);
            message(format!("User {user_id} deactivated successfully."))
        }
        Err(e) => {
            error!("Error while deactivating user {}: {}", user_id, e);
            error_value(&e)
        }
    }
}

/// Permanently delete a user that is already deactivated or deprovisioned.
pub async fn delete_deactivated_user(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: UserIdArgs,
) -> Value {
    let user_id = args.user_id;
    info!("Deletion requested for deactivated user {}", user_id);
    if let Err(e) = validate_okta_id(&user_id, "user_id") {
        return error_value(&e);
    }

    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::delete_user(&user_id),
        ConfirmationKind::Delete,
        None,
        true,
        format!("Deletion of user {user_id} cancelled by user."),
    )
    .await
    {
        return response;
    }

    match api.delete(&user_path(&user_id)).await {
        Ok(()) => {
            info!("Successfully deleted user: {}", user_id);
            message(format!("User {user_id} deleted successfully."))
        }
        Err(e) => {
            error!("Error while deleting user {}: {}", user_id, e);
            error_value(&e)
        }
    }
}

pub async fn unlock_user(api: &dyn OktaApi, args: UserIdArgs) -> Value {
    let user_id = args.user_id;
    info!("Unlocking user {}", user_id);
    if let Err(e) = validate_okta_id(&user_id, "user_id") {
        return error_value(&e);
    }
    let path = format!("{}/lifecycle/unlock", user_path(&user_id));
    match api.post(&path, &QueryParams::new(), None).await {
        Ok(_) => {
            info!("Successfully unlocked user: {}", user_id);
            message(format!("User {user_id} unlocked successfully."))
        }
        Err(e) => {
            error!("Error while unlocking user {}: {}", user_id, e);
            error_value(&e)
        }
    }
}
