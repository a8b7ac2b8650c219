//! Confirmation forms shown to the user before destructive operations.

use rmcp::elicit_safe;
use rmcp::model::ElicitationSchema;
use rmcp::service::ElicitationSafe;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confirmation for deleting a resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Confirm the deletion")]
pub struct DeleteConfirmation {
    #[schemars(description = "Set to true to confirm the deletion. This action cannot be undone.")]
    #[serde(default)]
    pub confirm: bool,
}

/// Confirmation for deactivating a resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Confirm the deactivation")]
pub struct DeactivateConfirmation {
    #[schemars(description = "Set to true to confirm the deactivation.")]
    #[serde(default)]
    pub confirm: bool,
}

elicit_safe!(DeleteConfirmation);
elicit_safe!(DeactivateConfirmation);

/// Only forms marked with `elicit_safe!` can be sent.
fn form_schema<T: ElicitationSafe>() -> Result<ElicitationSchema, serde_json::Error> {
    ElicitationSchema::from_type::<T>()
}

/// Which confirmation form to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Delete,
    Deactivate,
}

impl ConfirmationKind {
    /// Schema of the form, as sent in the elicitation request.
    pub fn elicitation_schema(self) -> Result<ElicitationSchema, serde_json::Error> {
        match self {
            ConfirmationKind::Delete => form_schema::<DeleteConfirmation>(),
            ConfirmationKind::Deactivate => form_schema::<DeactivateConfirmation>(),
        }
    }

    /// Read the `confirm` flag out of submitted form data.
    ///
    /// Anything other than an object with a boolean `confirm` counts as "no".
    pub fn confirmed(self, content: &Value) -> bool {
        match self {
            ConfirmationKind::Delete => serde_json::from_value::<DeleteConfirmation>(content.clone())
                .map(|form| form.confirm)
                .unwrap_or(false),
            ConfirmationKind::Deactivate => {
                serde_json::from_value::<DeactivateConfirmation>(content.clone())
                    .map(|form| form.confirm)
                    .unwrap_or(false)
            }
        }
    }
}
