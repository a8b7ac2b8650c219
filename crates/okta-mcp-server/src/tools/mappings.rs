//! Profile mapping tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{error_value, list_first_page, resource_or_error};
use crate::client::OktaApi;
use crate::pagination::{normalize_limit, QueryParams};
use crate::validation::validate_okta_id;

const MAPPINGS: &str = "/api/v1/mappings";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListProfileMappingsArgs {
    /// Only mappings whose source is this app or user type id
    #[serde(default)]
    pub source_id: Option<String>,
    /// Only mappings whose target is this app or user type id
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    /// Page size (min 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MappingIdArgs {
    pub mapping_id: String,
}

pub async fn list_profile_mappings(api: &dyn OktaApi, args: ListProfileMappingsArgs) -> Value {
    info!("Listing profile mappings");
    let query = QueryParams::new()
        .with("sourceId", args.source_id.as_deref())
        .with("targetId", args.target_id.as_deref())
        .with("after", args.after.as_deref())
        .with("limit", normalize_limit(args.limit));
    list_first_page(api, MAPPINGS, &query, "profile mappings").await
}

pub async fn get_profile_mapping(api: &dyn OktaApi, args: MappingIdArgs) -> Value {
    info!("Getting profile mapping {}", args.mapping_id);
    if let Err(e) = validate_okta_id(&args.mapping_id, "mapping_id") {
        return error_value(&e);
    }
    resource_or_error(
        api.get(&format!("{MAPPINGS}/{}", args.mapping_id), &QueryParams::new())
            .await,
        &format!("getting profile mapping {}", args.mapping_id),
    )
}
