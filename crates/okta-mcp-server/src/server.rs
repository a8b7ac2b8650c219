use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ListToolsResult, ProtocolVersion, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{Peer, RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData as McpError, ServerHandler};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, Instrument};

use crate::client::OktaApi;
use crate::pagination::PaginationOptions;
use crate::telemetry::ToolSpan;
use crate::tools::applications::{
    self, AppIdArgs, ConfirmDeleteApplicationArgs, CreateApplicationArgs, GetApplicationArgs,
    ListApplicationsArgs, UpdateApplicationArgs,
};
use crate::tools::groups::{
    self, ConfirmDeleteGroupArgs, GroupIdArgs, GroupMembershipArgs, GroupProfileArgs,
    ListGroupUsersArgs, ListGroupsArgs, UpdateGroupArgs,
};
use crate::tools::mappings::{self, ListProfileMappingsArgs, MappingIdArgs};
use crate::tools::policies::{
    self, CreatePolicyArgs, CreatePolicyRuleArgs, ListPoliciesArgs, PolicyIdArgs,
    PolicyRuleIdArgs, UpdatePolicyArgs, UpdatePolicyRuleArgs,
};
use crate::tools::system_logs::{self, GetLogsArgs};
use crate::tools::users::{self, CreateUserArgs, ListUsersArgs, UpdateUserArgs, UserIdArgs};

/// MCP server exposing the Okta management tools.
#[derive(Clone)]
pub struct OktaMcpServer {
    api: Arc<dyn OktaApi>,
    pagination: PaginationOptions,
    instructions: String,
    tool_router: ToolRouter<Self>,
}

fn respond(mut span: ToolSpan, result: Value) -> Result<CallToolResult, McpError> {
    span.record_result(&result);
    span.end();
    Ok(CallToolResult::success(vec![Content::json(result)?]))
}

#[tool_router]
impl OktaMcpServer {
    pub fn new(api: Arc<dyn OktaApi>, pagination: PaginationOptions, org_url: &str) -> Self {
        info!(
            "Initializing Okta MCP server (max_pages={}, page_delay={:?})",
            pagination.max_pages, pagination.delay
        );
        Self {
            api,
            pagination,
            instructions: crate::prompt::get_server_instructions(org_url),
            tool_router: Self::tool_router(),
        }
    }

    fn api(&self) -> &dyn OktaApi {
        self.api.as_ref()
    }

    // Users

    #[tool(
        description = "List users in the Okta organization. Supports search, filter and q expressions. Returns one page with has_more/next_cursor; pass fetch_all=true to retrieve every page."
    )]
    async fn list_users(
        &self,
        Parameters(args): Parameters<ListUsersArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_users");
        let result = users::list_users(self.api(), self.pagination, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Get the profile attribute names used by users in this org. Useful before building search or filter expressions."
    )]
    async fn get_user_profile_attributes(&self) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_user_profile_attributes");
        let result = users::get_user_profile_attributes(self.api())
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get a user by ID or login.")]
    async fn get_user(
        &self,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_user");
        let result = users::get_user(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Create a user. The profile must contain firstName, lastName, email and login.")]
    async fn create_user(
        &self,
        Parameters(args): Parameters<CreateUserArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("create_user");
        let result = users::create_user(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Update profile attributes of a user. Attributes not given are left unchanged.")]
    async fn update_user(
        &self,
        Parameters(args): Parameters<UpdateUserArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("update_user");
        let result = users::update_user(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Deactivate a user. Asks the user to confirm when the client supports elicitation.")]
    async fn deactivate_user(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("deactivate_user");
        let result = users::deactivate_user(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Permanently delete a user that is already deactivated or deprovisioned. Asks the user to confirm when the client supports elicitation."
    )]
    async fn delete_deactivated_user(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("delete_deactivated_user");
        let result = users::delete_deactivated_user(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Unlock a user in LOCKED_OUT status.")]
    async fn unlock_user(
        &self,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("unlock_user");
        let result = users::unlock_user(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    // Groups

    #[tool(
        description = "List groups. Supports search, filter and q. Returns one page with has_more/next_cursor; pass fetch_all=true to retrieve every page."
    )]
    async fn list_groups(
        &self,
        Parameters(args): Parameters<ListGroupsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_groups");
        let result = groups::list_groups(self.api(), self.pagination, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get a group by ID.")]
    async fn get_group(
        &self,
        Parameters(args): Parameters<GroupIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_group");
        let result = groups::get_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Create a group from a profile with name and optional description.")]
    async fn create_group(
        &self,
        Parameters(args): Parameters<GroupProfileArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("create_group");
        let result = groups::create_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Replace the profile of a group.")]
    async fn update_group(
        &self,
        Parameters(args): Parameters<UpdateGroupArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("update_group");
        let result = groups::update_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Delete a group. Asks the user to confirm; if the client cannot be asked, returns confirmation_required and the group is only deleted through confirm_delete_group."
    )]
    async fn delete_group(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<GroupIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("delete_group");
        let result = groups::delete_group(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Delete a group after the user typed DELETE. Only call this with the confirmation the user actually provided."
    )]
    async fn confirm_delete_group(
        &self,
        Parameters(args): Parameters<ConfirmDeleteGroupArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("confirm_delete_group");
        let result = groups::confirm_delete_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "List the members of a group. Returns one page with has_more/next_cursor; pass fetch_all=true to retrieve every page."
    )]
    async fn list_group_users(
        &self,
        Parameters(args): Parameters<ListGroupUsersArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_group_users");
        let result = groups::list_group_users(self.api(), self.pagination, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "List the applications assigned to a group.")]
    async fn list_group_apps(
        &self,
        Parameters(args): Parameters<GroupIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_group_apps");
        let result = groups::list_group_apps(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Add a user to a group.")]
    async fn add_user_to_group(
        &self,
        Parameters(args): Parameters<GroupMembershipArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("add_user_to_group");
        let result = groups::add_user_to_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Remove a user from a group.")]
    async fn remove_user_from_group(
        &self,
        Parameters(args): Parameters<GroupMembershipArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("remove_user_from_group");
        let result = groups::remove_user_from_group(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    // Applications

    #[tool(description = "List applications (first page). Supports q, filter, expand and after.")]
    async fn list_applications(
        &self,
        Parameters(args): Parameters<ListApplicationsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_applications");
        let result = applications::list_applications(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get an application by ID.")]
    async fn get_application(
        &self,
        Parameters(args): Parameters<GetApplicationArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_application");
        let result = applications::get_application(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Create an application from its definition.")]
    async fn create_application(
        &self,
        Parameters(args): Parameters<CreateApplicationArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("create_application");
        let result = applications::create_application(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Replace the definition of an application.")]
    async fn update_application(
        &self,
        Parameters(args): Parameters<UpdateApplicationArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("update_application");
        let result = applications::update_application(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Delete an application (it must be deactivated first). Asks the user to confirm; if the client cannot be asked, returns confirmation_required and the app is only deleted through confirm_delete_application."
    )]
    async fn delete_application(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<AppIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("delete_application");
        let result = applications::delete_application(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(
        description = "Delete an application after the user typed DELETE. Only call this with the confirmation the user actually provided."
    )]
    async fn confirm_delete_application(
        &self,
        Parameters(args): Parameters<ConfirmDeleteApplicationArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("confirm_delete_application");
        let result = applications::confirm_delete_application(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Activate an application.")]
    async fn activate_application(
        &self,
        Parameters(args): Parameters<AppIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("activate_application");
        let result = applications::activate_application(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Deactivate an application. Asks the user to confirm when the client supports elicitation.")]
    async fn deactivate_application(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<AppIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("deactivate_application");
        let result = applications::deactivate_application(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    // Policies

    #[tool(description = "List policies of a type (OKTA_SIGN_ON, PASSWORD, MFA_ENROLL, ACCESS_POLICY, ...).")]
    async fn list_policies(
        &self,
        Parameters(args): Parameters<ListPoliciesArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_policies");
        let result = policies::list_policies(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get a policy by ID.")]
    async fn get_policy(
        &self,
        Parameters(args): Parameters<PolicyIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_policy");
        let result = policies::get_policy(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Create a policy.")]
    async fn create_policy(
        &self,
        Parameters(args): Parameters<CreatePolicyArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("create_policy");
        let result = policies::create_policy(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Replace a policy.")]
    async fn update_policy(
        &self,
        Parameters(args): Parameters<UpdatePolicyArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("update_policy");
        let result = policies::update_policy(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Delete a policy. Asks the user to confirm when the client supports elicitation.")]
    async fn delete_policy(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<PolicyIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("delete_policy");
        let result = policies::delete_policy(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Activate a policy.")]
    async fn activate_policy(
        &self,
        Parameters(args): Parameters<PolicyIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("activate_policy");
        let result = policies::activate_policy(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Deactivate a policy. Asks the user to confirm when the client supports elicitation.")]
    async fn deactivate_policy(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<PolicyIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("deactivate_policy");
        let result = policies::deactivate_policy(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "List the rules of a policy.")]
    async fn list_policy_rules(
        &self,
        Parameters(args): Parameters<PolicyIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_policy_rules");
        let result = policies::list_policy_rules(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get a rule of a policy.")]
    async fn get_policy_rule(
        &self,
        Parameters(args): Parameters<PolicyRuleIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_policy_rule");
        let result = policies::get_policy_rule(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Create a rule in a policy.")]
    async fn create_policy_rule(
        &self,
        Parameters(args): Parameters<CreatePolicyRuleArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("create_policy_rule");
        let result = policies::create_policy_rule(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Replace a rule of a policy.")]
    async fn update_policy_rule(
        &self,
        Parameters(args): Parameters<UpdatePolicyRuleArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("update_policy_rule");
        let result = policies::update_policy_rule(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Delete a rule of a policy. Asks the user to confirm when the client supports elicitation.")]
    async fn delete_policy_rule(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<PolicyRuleIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("delete_policy_rule");
        let result = policies::delete_policy_rule(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Activate a rule of a policy.")]
    async fn activate_policy_rule(
        &self,
        Parameters(args): Parameters<PolicyRuleIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("activate_policy_rule");
        let result = policies::activate_policy_rule(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Deactivate a rule of a policy. Asks the user to confirm when the client supports elicitation.")]
    async fn deactivate_policy_rule(
        &self,
        peer: Peer<RoleServer>,
        Parameters(args): Parameters<PolicyRuleIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("deactivate_policy_rule");
        let result = policies::deactivate_policy_rule(self.api(), &peer, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    // Profile mappings

    #[tool(description = "List profile mappings, optionally filtered by source or target ID.")]
    async fn list_profile_mappings(
        &self,
        Parameters(args): Parameters<ListProfileMappingsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("list_profile_mappings");
        let result = mappings::list_profile_mappings(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    #[tool(description = "Get a profile mapping by ID.")]
    async fn get_profile_mapping(
        &self,
        Parameters(args): Parameters<MappingIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_profile_mapping");
        let result = mappings::get_profile_mapping(self.api(), args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }

    // System log

    #[tool(
        description = "Read the System Log. Filter with since/until (ISO 8601), filter and q. Returns one page with has_more/next_cursor; pass fetch_all=true to follow the log stream."
    )]
    async fn get_logs(
        &self,
        Parameters(args): Parameters<GetLogsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let span = ToolSpan::new("get_logs");
        let result = system_logs::get_logs(self.api(), self.pagination, args)
            .instrument(span.span().clone())
            .await;
        respond(span, result)
    }
}

impl ServerHandler for OktaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions.clone()),
        }
    }

    async fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        use rmcp::handler::server::tool::ToolCallContext;

        info!("Tool call: {}", request.name);
        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    async fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Page;
    use crate::error::OktaResult;
    use crate::pagination::QueryParams;
    use async_trait::async_trait;

    struct NoApi;

    #[async_trait]
    impl OktaApi for NoApi {
        async fn list(&self, _path: &str, _query: &QueryParams) -> OktaResult<Page> {
            unreachable!()
        }
        async fn get(&self, _path: &str, _query: &QueryParams) -> OktaResult<Value> {
            unreachable!()
        }
        async fn post(
            &self,
            _path: &str,
            _query: &QueryParams,
            _body: Option<Value>,
        ) -> OktaResult<Value> {
            unreachable!()
        }
        async fn put(&self, _path: &str, _body: Option<Value>) -> OktaResult<Value> {
            unreachable!()
        }
        async fn delete(&self, _path: &str) -> OktaResult<()> {
            unreachable!()
        }
    }

    fn server() -> OktaMcpServer {
        OktaMcpServer::new(
            Arc::new(NoApi),
            PaginationOptions::default(),
            "https://example.okta.com",
        )
    }

    #[test]
    fn registers_every_tool() {
        let tools = server().tool_router.list_all();
        let names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();
        for expected in [
            "list_users",
            "get_user_profile_attributes",
            "delete_group",
            "confirm_delete_group",
            "delete_application",
            "confirm_delete_application",
            "deactivate_policy_rule",
            "list_profile_mappings",
            "get_logs",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 43);
    }

    #[test]
    fn info_advertises_tools_and_instructions() {
        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.unwrap_or_default();
        assert!(instructions.contains("https://example.okta.com"));
        assert!(instructions.contains("fetch_all"));
    }
}
