//! User-facing confirmation prompts.

pub fn delete_group(group_id: &str) -> String {
    format!("Are you sure you want to delete group {group_id}? This action cannot be undone.")
}

pub fn delete_application(app_id: &str) -> String {
    format!("Are you sure you want to delete application {app_id}? This action cannot be undone.")
}

pub fn deactivate_application(app_id: &str) -> String {
    format!(
        "Are you sure you want to deactivate application {app_id}? \
         The application will become unavailable to all assigned users."
    )
}

pub fn deactivate_user(user_id: &str) -> String {
    format!(
        "Are you sure you want to deactivate user {user_id}? \
         The user will lose access to all applications."
    )
}

pub fn delete_user(user_id: &str) -> String {
    format!(
        "Are you sure you want to permanently delete user {user_id}? \
         This action cannot be undone."
    )
}

pub fn delete_policy(policy_id: &str) -> String {
    format!("Are you sure you want to delete policy {policy_id}? This action cannot be undone.")
}

pub fn deactivate_policy(policy_id: &str) -> String {
    format!("Are you sure you want to deactivate policy {policy_id}?")
}

pub fn delete_policy_rule(policy_id: &str, rule_id: &str) -> String {
    format!(
        "Are you sure you want to delete rule {rule_id} from policy {policy_id}? \
         This action cannot be undone."
    )
}

pub fn deactivate_policy_rule(policy_id: &str, rule_id: &str) -> String {
    format!("Are you sure you want to deactivate rule {rule_id} in policy {policy_id}?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_name_the_resource() {
        assert_eq!(
            delete_group("00g1"),
            "Are you sure you want to delete group 00g1? This action cannot be undone."
        );
        assert!(delete_policy_rule("00p1", "0pr1").contains("rule 0pr1 from policy 00p1"));
        assert!(deactivate_user("00u1").contains("lose access"));
    }
}
