//! MCP elicitation support
//!
//! Destructive Okta operations (deletes and deactivations) ask the user for
//! confirmation through an MCP elicitation form before touching the API.
//!
//! ## Client Support
//!
//! Not every client implements elicitation. Each operation declares what to do
//! without it: either return a payload pointing at a `confirm_*` tool that
//! takes the literal `DELETE`, or proceed as if confirmed.
//!
//! ## Example
//!
//! ```ignore
//! use okta_mcp_server::elicitation::{elicit_or_fallback, ConfirmationKind};
//!
//! let outcome = elicit_or_fallback(
//!     &peer,
//!     "Are you sure you want to deactivate policy 00p1?",
//!     ConfirmationKind::Deactivate,
//!     None,
//!     true,
//! )
//! .await;
//! if outcome.confirmed {
//!     // call the API
//! }
//! ```

mod helpers;
mod schemas;


pub use schemas::{ConfirmationKind, DeactivateConfirmation, DeleteConfirmation};

pub use helpers::{
    elicit_or_fallback, ElicitationClient, ElicitationFailure, ElicitationOutcome,
    ElicitationReply,
};

pub use rmcp::elicit_safe;
