//! Confirmation via elicitation with a deterministic fallback
//!
//! Destructive tools ask the connected client to show a confirmation form.
//! Clients that cannot do that get either the legacy two-call payload or an
//! automatic confirmation, depending on what the tool asks for.

use async_trait::async_trait;
use rmcp::model::{CreateElicitationRequestParam, ElicitationAction, ErrorCode};
use rmcp::service::{Peer, RoleServer, ServiceError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::schemas::ConfirmationKind;

/// What the user did with the form.
#[derive(Debug, Clone, PartialEq)]
pub enum ElicitationReply {
    Accept(Option<Value>),
    Decline,
    Cancel,
}

#[derive(Debug, Error)]
pub enum ElicitationFailure {
    /// The client does not implement `elicitation/create`.
    #[error("method not found")]
    MethodNotFound,
    #[error("{0}")]
    Other(String),
}

/// The client side of an elicitation exchange.
#[async_trait]
pub trait ElicitationClient: Send + Sync {
    /// Whether the client advertised elicitation during initialization.
    fn supports_elicitation(&self) -> bool;

    async fn elicit(
        &self,
        message: &str,
        kind: ConfirmationKind,
    ) -> Result<ElicitationReply, ElicitationFailure>;
}

#[async_trait]
impl ElicitationClient for Peer<RoleServer> {
    fn supports_elicitation(&self) -> bool {
        Peer::supports_elicitation(self)
    }

    async fn elicit(
        &self,
        message: &str,
        kind: ConfirmationKind,
    ) -> Result<ElicitationReply, ElicitationFailure> {
        let requested_schema = kind
            .elicitation_schema()
            .map_err(|e| ElicitationFailure::Other(format!("invalid confirmation schema: {e}")))?;

        let request_param = CreateElicitationRequestParam {
            message: message.to_string(),
            requested_schema,
        };

        match self.create_elicitation(request_param).await {
            Ok(result) => Ok(match result.action {
                ElicitationAction::Accept => ElicitationReply::Accept(result.content),
                ElicitationAction::Decline => ElicitationReply::Decline,
                ElicitationAction::Cancel => ElicitationReply::Cancel,
            }),
            Err(ServiceError::McpError(e)) if e.code == ErrorCode::METHOD_NOT_FOUND => {
                Err(ElicitationFailure::MethodNotFound)
            }
            Err(e) => Err(ElicitationFailure::Other(e.to_string())),
        }
    }
}

/// Normalized result of a confirmation attempt.
///
/// `fallback_response` is set exactly when elicitation was not used and the
/// operation does not auto-confirm; the tool returns it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElicitationOutcome {
    pub confirmed: bool,
    pub used_elicitation: bool,
    pub fallback_response: Option<Value>,
}

impl ElicitationOutcome {
    fn answered(confirmed: bool) -> Self {
        Self {
            confirmed,
            used_elicitation: true,
            fallback_response: None,
        }
    }

    fn fallback(message: &str, fallback_payload: Option<Value>, auto_confirm: bool) -> Self {
        if auto_confirm {
            tracing::info!("[elicitation] Elicitation unavailable, auto-confirming");
            return Self {
                confirmed: true,
                used_elicitation: false,
                fallback_response: None,
            };
        }
        tracing::info!("[elicitation] Elicitation unavailable, using fallback");
        Self {
            confirmed: false,
            used_elicitation: false,
            fallback_response: Some(fallback_payload.unwrap_or_else(|| {
                json!({
                    "confirmation_required": true,
                    "message": message,
                })
            })),
        }
    }
}

/// Ask for confirmation, falling back when the client can't be asked.
///
/// Only an accepted form with `confirm = true` confirms. Declines, cancels
/// and malformed replies all count as "no". Exchange failures are treated as
/// if the client lacked the capability. Never fails.
pub async fn elicit_or_fallback(
    client: &dyn ElicitationClient,
    message: &str,
    kind: ConfirmationKind,
    fallback_payload: Option<Value>,
    auto_confirm_on_fallback: bool,
) -> ElicitationOutcome {
    if !client.supports_elicitation() {
        tracing::info!("[elicitation] Client does not support elicitation: {}", message);
        return ElicitationOutcome::fallback(message, fallback_payload, auto_confirm_on_fallback);
    }

    match client.elicit(message, kind).await {
        Ok(ElicitationReply::Accept(Some(content))) => {
            let confirmed = kind.confirmed(&content);
            tracing::info!("[elicitation] Elicitation accepted, confirm={}", confirmed);
            ElicitationOutcome::answered(confirmed)
        }
        Ok(ElicitationReply::Accept(None)) => {
            tracing::warn!("[elicitation] Elicitation accepted without form data");
            ElicitationOutcome::answered(false)
        }
        Ok(ElicitationReply::Decline) => {
            tracing::info!("[elicitation] Elicitation declined by user");
            ElicitationOutcome::answered(false)
        }
        Ok(ElicitationReply::Cancel) => {
            tracing::info!("[elicitation] Elicitation cancelled by user");
            ElicitationOutcome::answered(false)
        }
        Err(ElicitationFailure::MethodNotFound) => {
            tracing::info!("[elicitation] Elicitation not supported by client (METHOD_NOT_FOUND)");
            ElicitationOutcome::fallback(message, fallback_payload, auto_confirm_on_fallback)
        }
        Err(ElicitationFailure::Other(e)) => {
            tracing::warn!("[elicitation] Elicitation failed ({}), using fallback", e);
            ElicitationOutcome::fallback(message, fallback_payload, auto_confirm_on_fallback)
        }
    }
}
