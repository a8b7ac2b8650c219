//! Application tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::groups::{CONFIRMATION_MISMATCH, DELETE_CONFIRMATION};
use super::{
    confirm_destructive, error_value, list_first_page, message, resource_or_error, Confirmation,
};
use crate::client::OktaApi;
use crate::elicitation::{ConfirmationKind, ElicitationClient};
use crate::messages;
use crate::pagination::{build_query_params, normalize_limit, QueryParams};
use crate::validation::validate_okta_id;

const APPS: &str = "/api/v1/apps";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListApplicationsArgs {
    /// Prefix match on the application label
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    /// Page size (min 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Filter expression, e.g. status eq "ACTIVE"
    #[serde(default)]
    pub filter: Option<String>,
    /// Embedded resources to expand, e.g. user/00u1
    #[serde(default)]
    pub expand: Option<String>,
    /// Include applications that are not deleted
    #[serde(default)]
    pub include_non_deleted: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppIdArgs {
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetApplicationArgs {
    pub app_id: String,
    #[serde(default)]
    pub expand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateApplicationArgs {
    /// Application definition (name, label, signOnMode, settings, ...)
    pub app_config: Map<String, Value>,
    /// Activate the application after creation
    #[serde(default = "default_activate")]
    pub activate: bool,
}

fn default_activate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateApplicationArgs {
    pub app_id: String,
    /// Full replacement application definition
    pub app_config: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmDeleteApplicationArgs {
    pub app_id: String,
    /// Must be exactly 'DELETE', as typed by the user
    pub confirmation: String,
}

fn app_path(app_id: &str) -> String {
    format!("{APPS}/{app_id}")
}

pub async fn list_applications(api: &dyn OktaApi, args: ListApplicationsArgs) -> Value {
    info!("Listing applications");
    let query = build_query_params(
        None,
        args.filter.as_deref(),
        args.q.as_deref(),
        args.after.as_deref(),
        normalize_limit(args.limit),
    )
    .with("expand", args.expand.as_deref())
    .with("includeNonDeleted", args.include_non_deleted);
    list_first_page(api, APPS, &query, "applications").await
}

pub async fn get_application(api: &dyn OktaApi, args: GetApplicationArgs) -> Value {
    info!("Getting application with ID: {}", args.app_id);
    if let Err(e) = validate_okta_id(&args.app_id, "app_id") {
        return error_value(&e);
    }
    let query = QueryParams::new().with("expand", args.expand.as_deref());
    resource_or_error(
        api.get(&app_path(&args.app_id), &query).await,
        &format!("getting application {}", args.app_id),
    )
}

pub async fn create_application(api: &dyn OktaApi, args: CreateApplicationArgs) -> Value {
    info!("Creating new application");
    let query = QueryParams::new().with("activate", Some(args.activate));
    resource_or_error(
        api.post(APPS, &query, Some(Value::Object(args.app_config)))
            .await,
        "creating application",
    )
}

pub async fn update_application(api: &dyn OktaApi, args: UpdateApplicationArgs) -> Value {
    info!("Updating application with ID: {}", args.app_id);
    if let Err(e) = validate_okta_id(&args.app_id, "app_id") {
        return error_value(&e);
    }
    resource_or_error(
        api.put(&app_path(&args.app_id), Some(Value::Object(args.app_config)))
            .await,
        &format!("updating application {}", args.app_id),
    )
}

async fn remove_application(api: &dyn OktaApi, app_id: &str) -> Value {
    match api.delete(&app_path(app_id)).await {
        Ok(()) => {
            info!("Successfully deleted application: {}", app_id);
            message(format!("Application {app_id} deleted successfully"))
        }
        Err(e) => {
            error!("Error while deleting application {}: {}", app_id, e);
            error_value(&e)
        }
    }
}

/// Applications must be deactivated before Okta allows deleting them.
pub async fn delete_application(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: AppIdArgs,
) -> Value {
    let app_id = args.app_id;
    warn!("Deletion requested for application {}", app_id);
    if let Err(e) = validate_okta_id(&app_id, "app_id") {
        return error_value(&e);
    }

    let fallback = json!({
        "confirmation_required": true,
        "message": format!(
            "To confirm deletion of application {app_id}, please call confirm_delete_application \
             with confirmation '{DELETE_CONFIRMATION}'"
        ),
        "app_id": app_id,
        "tool_to_use": "confirm_delete_application",
    });

    match confirm_destructive(
        client,
        &messages::delete_application(&app_id),
        ConfirmationKind::Delete,
        Some(fallback),
        false,
        format!("Deletion of application {app_id} cancelled by user."),
    )
    .await
    {
        Confirmation::Proceed => remove_application(api, &app_id).await,
        Confirmation::Respond(response) => response,
    }
}

pub async fn confirm_delete_application(
    api: &dyn OktaApi,
    args: ConfirmDeleteApplicationArgs,
) -> Value {
    info!("Processing deletion confirmation for application {}", args.app_id);
    if let Err(e) = validate_okta_id(&args.app_id, "app_id") {
        return error_value(&e);
    }
    if args.confirmation != DELETE_CONFIRMATION {
        warn!(
            "Application deletion cancelled for {} - incorrect confirmation",
            args.app_id
        );
        return json!({ "error": CONFIRMATION_MISMATCH });
    }
    remove_application(api, &args.app_id).await
}

pub async fn activate_application(api: &dyn OktaApi, args: AppIdArgs) -> Value {
    info!("Activating application {}", args.app_id);
    if let Err(e) = validate_okta_id(&args.app_id, "app_id") {
        return error_value(&e);
    }
    let path = format!("{}/lifecycle/activate", app_path(&args.app_id));
    match api.post(&path, &QueryParams::new(), None).await {
        Ok(_) => message(format!("Application {} activated successfully", args.app_id)),
        Err(e) => {
            error!("Error while activating application {}: {}", args.app_id, e);
            error_value(&e)
        }
    }
}

pub async fn deactivate_application(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: AppIdArgs,
) -> Value {
    let app_id = args.app_id;
    info!("Deactivation requested for application {}", app_id);
    if let Err(e) = validate_okta_id(&app_id, "app_id") {
        return error_value(&e);
    }

    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::deactivate_application(&app_id),
        ConfirmationKind::Deactivate,
        None,
        true,
        format!("Deactivation of application {app_id} cancelled by user."),
    )
    .await
    {
        return response;
    }

    let path = format!("{}/lifecycle/deactivate", app_path(&app_id));
    match api.post(&path, &QueryParams::new(), None).await {
        Ok(_) => {
            info!("Successfully deactivated application: {}", app_id);
            message(format!("Application {app_id} deactivated successfully"))
        }
        Err(e) => {
            error!("Error while deactivating application {}: {}", app_id, e);
            error_value(&e)
        }
    }
}
