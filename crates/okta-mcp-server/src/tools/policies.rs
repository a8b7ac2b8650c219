//! Policy and policy rule tools.
//!
//! Every destructive policy operation auto-confirms when the client cannot
//! show a confirmation form.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use super::{confirm_destructive, error_value, resource_or_error, Confirmation};
use crate::client::OktaApi;
use crate::elicitation::{ConfirmationKind, ElicitationClient};
use crate::messages;
use crate::pagination::{extract_after_cursor, normalize_limit, QueryParams};
use crate::validation::validate_okta_id;

const POLICIES: &str = "/api/v1/policies";
const DEFAULT_POLICY_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListPoliciesArgs {
    /// Policy type, e.g. OKTA_SIGN_ON, PASSWORD, MFA_ENROLL, ACCESS_POLICY
    #[serde(rename = "type")]
    pub policy_type: String,
    /// ACTIVE or INACTIVE
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    /// Page size (min 20, max 100, default 20)
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PolicyIdArgs {
    pub policy_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreatePolicyArgs {
    /// Policy definition (type, name, conditions, settings, ...)
    pub policy_data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePolicyArgs {
    pub policy_id: String,
    pub policy_data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PolicyRuleIdArgs {
    pub policy_id: String,
    pub rule_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreatePolicyRuleArgs {
    pub policy_id: String,
    /// Rule definition (name, conditions, actions, ...)
    pub rule_data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePolicyRuleArgs {
    pub policy_id: String,
    pub rule_id: String,
    pub rule_data: Map<String, Value>,
}

fn policy_path(policy_id: &str) -> String {
    format!("{POLICIES}/{policy_id}")
}

fn rule_path(policy_id: &str, rule_id: &str) -> String {
    format!("{POLICIES}/{policy_id}/rules/{rule_id}")
}

fn success(text: String) -> Value {
    json!({ "success": true, "message": text })
}

/// Run a lifecycle call whose response body is irrelevant.
async fn lifecycle(api: &dyn OktaApi, path: &str, done: String) -> Value {
    match api.post(path, &QueryParams::new(), None).await {
        Ok(_) => {
            info!("{}", done);
            success(done)
        }
        Err(e) => {
            error!("Error calling {}: {}", path, e);
            error_value(&e)
        }
    }
}

async fn remove(api: &dyn OktaApi, path: &str, done: String) -> Value {
    match api.delete(path).await {
        Ok(()) => {
            info!("{}", done);
            success(done)
        }
        Err(e) => {
            error!("Error deleting {}: {}", path, e);
            error_value(&e)
        }
    }
}

pub async fn list_policies(api: &dyn OktaApi, args: ListPoliciesArgs) -> Value {
    info!("Listing policies of type {}", args.policy_type);
    let limit = normalize_limit(args.limit).unwrap_or(DEFAULT_POLICY_PAGE_SIZE);
    let query = QueryParams::new()
        .with("type", Some(&args.policy_type))
        .with("limit", Some(limit))
        .with("status", args.status.as_deref())
        .with("q", args.q.as_deref())
        .with("after", args.after.as_deref());
    debug!("Calling Okta API to list policies: {:?}", query);

    match api.list(POLICIES, &query).await {
        Ok((policies, _)) => {
            info!("Successfully retrieved {} policies", policies.len());
            json!({ "policies": policies })
        }
        Err(e) => {
            error!("Error listing policies: {}", e);
            error_value(&e)
        }
    }
}

pub async fn get_policy(api: &dyn OktaApi, args: PolicyIdArgs) -> Value {
    info!("Getting policy {}", args.policy_id);
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id") {
        return error_value(&e);
    }
    resource_or_error(
        api.get(&policy_path(&args.policy_id), &QueryParams::new()).await,
        &format!("getting policy {}", args.policy_id),
    )
}

pub async fn create_policy(api: &dyn OktaApi, args: CreatePolicyArgs) -> Value {
    info!("Creating policy");
    resource_or_error(
        api.post(
            POLICIES,
            &QueryParams::new(),
            Some(Value::Object(args.policy_data)),
        )
        .await,
        "creating policy",
    )
}

pub async fn update_policy(api: &dyn OktaApi, args: UpdatePolicyArgs) -> Value {
    info!("Updating policy {}", args.policy_id);
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id") {
        return error_value(&e);
    }
    resource_or_error(
        api.put(
            &policy_path(&args.policy_id),
            Some(Value::Object(args.policy_data)),
        )
        .await,
        &format!("updating policy {}", args.policy_id),
    )
}

pub async fn delete_policy(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: PolicyIdArgs,
) -> Value {
    let policy_id = args.policy_id;
    info!("Deletion requested for policy {}", policy_id);
    if let Err(e) = validate_okta_id(&policy_id, "policy_id") {
        return error_value(&e);
    }
    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::delete_policy(&policy_id),
        ConfirmationKind::Delete,
        None,
        true,
        format!("Deletion of policy {policy_id} cancelled by user."),
    )
    .await
    {
        return response;
    }
    remove(
        api,
        &policy_path(&policy_id),
        format!("Policy {policy_id} deleted successfully"),
    )
    .await
}

pub async fn activate_policy(api: &dyn OktaApi, args: PolicyIdArgs) -> Value {
    let policy_id = args.policy_id;
    if let Err(e) = validate_okta_id(&policy_id, "policy_id") {
        return error_value(&e);
    }
    lifecycle(
        api,
        &format!("{}/lifecycle/activate", policy_path(&policy_id)),
        format!("Policy {policy_id} activated successfully"),
    )
    .await
}

pub async fn deactivate_policy(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: PolicyIdArgs,
) -> Value {
    let policy_id = args.policy_id;
    info!("Deactivation requested for policy {}", policy_id);
    if let Err(e) = validate_okta_id(&policy_id, "policy_id") {
        return error_value(&e);
    }
    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::deactivate_policy(&policy_id),
        ConfirmationKind::Deactivate,
        None,
        true,
        format!("Deactivation of policy {policy_id} cancelled by user."),
    )
    .await
    {
        return response;
    }
    lifecycle(
        api,
        &format!("{}/lifecycle/deactivate", policy_path(&policy_id)),
        format!("Policy {policy_id} deactivated successfully"),
    )
    .await
}

/// First page of a policy's rules with a continuation token.
pub async fn list_policy_rules(api: &dyn OktaApi, args: PolicyIdArgs) -> Value {
    info!("Listing rules of policy {}", args.policy_id);
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id") {
        return error_value(&e);
    }
    let path = format!("{}/rules", policy_path(&args.policy_id));
    match api.list(&path, &QueryParams::new()).await {
        Ok((rules, response)) => {
            info!("Successfully retrieved {} rules", rules.len());
            json!({
                "rules": rules,
                "has_next": response.has_next().unwrap_or(false),
                "next_page_token": extract_after_cursor(Some(&*response)),
            })
        }
        Err(e) => {
            error!("Error listing policy rules: {}", e);
            error_value(&e)
        }
    }
}

pub async fn get_policy_rule(api: &dyn OktaApi, args: PolicyRuleIdArgs) -> Value {
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id")
        .and_then(|_| validate_okta_id(&args.rule_id, "rule_id"))
    {
        return error_value(&e);
    }
    resource_or_error(
        api.get(&rule_path(&args.policy_id, &args.rule_id), &QueryParams::new())
            .await,
        &format!("getting rule {} of policy {}", args.rule_id, args.policy_id),
    )
}

pub async fn create_policy_rule(api: &dyn OktaApi, args: CreatePolicyRuleArgs) -> Value {
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id") {
        return error_value(&e);
    }
    let path = format!("{}/rules", policy_path(&args.policy_id));
    resource_or_error(
        api.post(&path, &QueryParams::new(), Some(Value::Object(args.rule_data)))
            .await,
        &format!("creating rule in policy {}", args.policy_id),
    )
}

pub async fn update_policy_rule(api: &dyn OktaApi, args: UpdatePolicyRuleArgs) -> Value {
    if let Err(e) = validate_okta_id(&args.policy_id, "policy_id")
        .and_then(|_| validate_okta_id(&args.rule_id, "rule_id"))
    {
        return error_value(&e);
    }
    resource_or_error(
        api.put(
            &rule_path(&args.policy_id, &args.rule_id),
            Some(Value::Object(args.rule_data)),
        )
        .await,
        &format!("updating rule {} of policy {}", args.rule_id, args.policy_id),
    )
}

pub async fn delete_policy_rule(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: PolicyRuleIdArgs,
) -> Value {
    let PolicyRuleIdArgs { policy_id, rule_id } = args;
    info!("Deletion requested for rule {} of policy {}", rule_id, policy_id);
    if let Err(e) = validate_okta_id(&policy_id, "policy_id")
        .and_then(|_| validate_okta_id(&rule_id, "rule_id"))
    {
        return error_value(&e);
    }
    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::delete_policy_rule(&policy_id, &rule_id),
        ConfirmationKind::Delete,
        None,
        true,
        format!("Deletion of rule {rule_id} cancelled by user."),
    )
    .await
    {
        return response;
    }
    remove(
        api,
        &rule_path(&policy_id, &rule_id),
        format!("Rule {rule_id} deleted successfully"),
    )
    .await
}

pub async fn activate_policy_rule(api: &dyn OktaApi, args: PolicyRuleIdArgs) -> Value {
    let PolicyRuleIdArgs { policy_id, rule_id } = args;
    if let Err(e) = validate_okta_id(&policy_id, "policy_id")
        .and_then(|_| validate_okta_id(&rule_id, "rule_id"))
    {
        return error_value(&e);
    }
    lifecycle(
        api,
        &format!("{}/lifecycle/activate", rule_path(&policy_id, &rule_id)),
        format!("Rule {rule_id} activated successfully"),
    )
    .await
}

pub async fn deactivate_policy_rule(
    api: &dyn OktaApi,
    client: &dyn ElicitationClient,
    args: PolicyRuleIdArgs,
) -> Value {
    let PolicyRuleIdArgs { policy_id, rule_id } = args;
    info!("Deactivation requested for rule {} of policy {}", rule_id, policy_id);
    if let Err(e) = validate_okta_id(&policy_id, "policy_id")
        .and_then(|_| validate_okta_id(&rule_id, "rule_id"))
    {
        return error_value(&e);
    }
    if let Confirmation::Respond(response) = confirm_destructive(
        client,
        &messages::deactivate_policy_rule(&policy_id, &rule_id),
        ConfirmationKind::Deactivate,
        None,
        true,
        format!("Deactivation of rule {rule_id} cancelled by user."),
    )
    .await
    {
        return response;
    }
    lifecycle(
        api,
        &format!("{}/lifecycle/deactivate", rule_path(&policy_id, &rule_id)),
        format!("Rule {rule_id} deactivated successfully"),
    )
    .await
}
