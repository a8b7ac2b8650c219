pub mod auth;
pub mod client;
pub mod config;
pub mod elicitation;
pub mod error;
pub mod messages;
pub mod pagination;
pub mod prompt;
pub mod server;
pub mod telemetry;
pub mod tools;
pub mod validation;

pub use auth::{CredentialProvider, OktaAuthManager};
pub use client::{HttpOktaClient, OktaApi, Page, PagedResponse};
pub use config::{AuthMode, Cli, OktaConfig};
pub use error::{AuthError, OktaError, OktaResult};
pub use pagination::{PaginatedResult, PaginationInfo, PaginationOptions, QueryParams, StopReason};
pub use server::OktaMcpServer;
