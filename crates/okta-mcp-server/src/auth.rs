//! Okta access token acquisition and caching.
//!
//! [`OktaAuthManager`] implements two flows:
//!
//! - **Device authorization** for interactive use. The verification URL and
//!   user code are logged and the token endpoint is polled until the user
//!   approves. Refresh tokens are used when the access token goes stale.
//! - **Browserless** client credentials with an RS256 private key JWT
//!   assertion. There is no refresh token, so stale tokens trigger a new grant.
//!
//! Tokens live only in process memory and are dropped by [`OktaAuthManager::clear_tokens`].

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::USER_AGENT;
use crate::config::{AuthMode, OktaConfig};
use crate::error::AuthError;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const JWT_BEARER_ASSERTION: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Added to the poll interval when the server answers `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Source of bearer tokens for the API client.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token that is valid right now, refreshing or re-authenticating if needed.
    async fn get_valid_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorization {
    device_code: String,
    #[serde(default)]
    user_code: Option<String>,
    #[serde(default)]
    verification_uri: Option<String>,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    iat: u64,
    exp: u64,
}

impl AssertionClaims {
    fn new(client_id: &str, token_url: &str, now: u64) -> Self {
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: token_url.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    issued_at: Option<Instant>,
}

impl TokenState {
    fn fresh_token(&self, lifetime: Duration) -> Option<&str> {
        let issued_at = self.issued_at?;
        if issued_at.elapsed() < lifetime {
            self.access_token.as_deref()
        } else {
            None
        }
    }

    fn store(&mut self, response: TokenResponse) {
        self.access_token = Some(response.access_token);
        if let Some(refresh) = response.refresh_token {
            debug!("Refresh token received and stored");
            self.refresh_token = Some(refresh);
        }
        self.issued_at = Some(Instant::now());
    }
}

pub struct OktaAuthManager {
    config: OktaConfig,
    http: reqwest::Client,
    state: Mutex<TokenState>,
}

impl OktaAuthManager {
    pub fn new(config: OktaConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        match &config.auth_mode {
            AuthMode::Browserless { .. } => {
                info!("Browserless authentication is available and will be used")
            }
            AuthMode::DeviceFlow => info!("Using device authorization flow for authentication"),
        }
        info!(
            "OktaAuthManager initialized with org_url: {}, client_id: {}",
            config.org_url, config.client_id
        );
        debug!("Configured scopes: {}", config.scopes);
        Ok(Self {
            config,
            http,
            state: Mutex::new(TokenState::default()),
        })
    }

    pub fn config(&self) -> &OktaConfig {
        &self.config
    }

    /// Run the configured flow unconditionally and cache the result.
    pub async fn authenticate(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        self.authenticate_locked(&mut state).await
    }

    /// Forget every cached token.
    pub async fn clear_tokens(&self) {
        info!("Clearing stored tokens");
        let mut state = self.state.lock().await;
        *state = TokenState::default();
        info!("Token cleanup completed");
    }

    async fn authenticate_locked(&self, state: &mut TokenState) -> Result<(), AuthError> {
        let response = match &self.config.auth_mode {
            AuthMode::Browserless {
                private_key,
                key_id,
            } => {
                info!("Using browserless authentication flow");
                // No fallback to the device flow: the auth path stays what was configured.
                self.client_credentials(private_key, key_id).await?
            }
            AuthMode::DeviceFlow => {
                info!("Starting device flow authentication process");
                let device = self.initiate_device_authorization().await?;
                self.poll_for_token(&device).await?
            }
        };
        state.store(response);
        info!("Authentication completed successfully");
        Ok(())
    }

    fn client_assertion(&self, private_key: &str, key_id: &str) -> Result<String, AuthError> {
        debug!("Generating client assertion JWT");
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Other(e.to_string()))?
            .as_secs();
        let claims = AssertionClaims::new(&self.config.client_id, &self.config.token_url(), now);

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key_id.to_string());
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;
        Ok(encode(&header, &claims, &key)?)
    }

    async fn client_credentials(
        &self,
        private_key: &str,
        key_id: &str,
    ) -> Result<TokenResponse, AuthError> {
        let assertion = self.client_assertion(private_key, key_id)?;
        let token_url = self.config.token_url();
        debug!("Requesting token from: {}", token_url);

        let response = self
            .http
            .post(&token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.config.scopes.as_str()),
                ("client_assertion_type", JWT_BEARER_ASSERTION),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to get token: HTTP {} - {}", status.as_u16(), body);
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        info!("Successfully obtained access token via browserless authentication");
        Ok(response.json().await?)
    }

    async fn initiate_device_authorization(&self) -> Result<DeviceAuthorization, AuthError> {
        let url = self.config.device_authorize_url();
        info!("Initiating device authorization flow");
        debug!("Request URL: {}", url);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scopes.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let device: DeviceAuthorization = response.json().await?;
        debug!("Expires in: {} seconds", device.expires_in);

        // stdout carries the protocol, so the prompt goes to the log.
        match device
            .verification_uri_complete
            .as_deref()
            .or(device.verification_uri.as_deref())
        {
            Some(uri) => info!("Authentication URL: {}", uri),
            None => warn!("Device authorization response carried no verification URL"),
        }
        if let Some(code) = &device.user_code {
            info!("User code: {}", code);
        }
        Ok(device)
    }

    async fn poll_for_token(&self, device: &DeviceAuthorization) -> Result<TokenResponse, AuthError> {
        let token_url = self.config.token_url();
        let started = Instant::now();
        let deadline = Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS));
        let mut attempt = 0u32;

        info!("Starting token polling");
        while started.elapsed() < deadline {
            attempt += 1;
            debug!("Polling attempt #{}", attempt);

            let sent = self
                .http
                .post(&token_url)
                .header(reqwest::header::ACCEPT, "application/json")
                .form(&[
                    ("client_id", self.config.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                    ("grant_type", DEVICE_CODE_GRANT),
                ])
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    warn!("Token polling request failed: {}", e);
                    tokio::time::sleep(interval).await;
                    continue;
                }
            };

            let status = response.status();
            let body = response.text().await?;
            if status.is_success() {
                if let Ok(token) = serde_json::from_str::<TokenResponse>(&body) {
                    info!("Successfully obtained access token");
                    return Ok(token);
                }
            }

            let oauth_error: OAuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
            match oauth_error.error.as_deref() {
                Some("authorization_pending") => {
                    debug!("Authorization pending, waiting {:?}", interval);
                }
                Some("slow_down") => {
                    interval += SLOW_DOWN_STEP;
                    debug!("Server asked to slow down, waiting {:?}", interval);
                }
                Some("access_denied") => {
                    error!("Access denied by user");
                    return Err(AuthError::AccessDenied);
                }
                Some("expired_token") => return Err(AuthError::DeviceCodeExpired),
                _ => {
                    let message = oauth_error
                        .error_description
                        .unwrap_or_else(|| "Unknown error".to_string());
                    error!("Token polling error: {}", message);
                    return Err(AuthError::TokenEndpoint {
                        status: status.as_u16(),
                        body: message,
                    });
                }
            }
            tokio::time::sleep(interval).await;
        }

        error!("Token polling timed out");
        Err(AuthError::DeviceCodeExpired)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        info!("Attempting to refresh access token");
        let response = self
            .http
            .post(self.config.token_url())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        info!("Token refreshed successfully");
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CredentialProvider for OktaAuthManager {
    async fn get_valid_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.fresh_token(self.config.token_lifetime) {
            return Ok(token.to_string());
        }

        info!("Token is expired or missing");
        let refresh = match self.config.auth_mode {
            AuthMode::DeviceFlow => state.refresh_token.clone(),
            AuthMode::Browserless { .. } => None,
        };

        let refreshed = match refresh {
            Some(refresh) => match self.refresh_access_token(&refresh).await {
                Ok(response) => {
                    state.store(response);
                    true
                }
                Err(e) => {
                    warn!("Token refresh failed, initiating re-authentication: {}", e);
                    false
                }
            },
            None => false,
        };

        if !refreshed {
            self.authenticate_locked(&mut state).await?;
        }

        state
            .access_token
            .clone()
            .ok_or_else(|| AuthError::Other("no access token after authentication".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> OktaAuthManager {
        let config = OktaConfig::new("dev-1.okta.com", "client-1", "", None, None).unwrap();
        OktaAuthManager::new(config).unwrap()
    }

    #[test]
    fn assertion_claims_target_token_endpoint() {
        let claims = AssertionClaims::new(
            "client-1",
            "https://dev-1.okta.com/oauth2/v1/token",
            1_700_000_000,
        );
        assert_eq!(claims.iss, "client-1");
        assert_eq!(claims.sub, "client-1");
        assert_eq!(claims.aud, "https://dev-1.okta.com/oauth2/v1/token");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn stale_tokens_are_not_fresh() {
        let mut state = TokenState::default();
        assert_eq!(state.fresh_token(Duration::from_secs(3600)), None);

        state.store(TokenResponse {
            access_token: "abc".into(),
            refresh_token: Some("r1".into()),
        });
        assert_eq!(state.fresh_token(Duration::from_secs(3600)), Some("abc"));
        assert_eq!(state.fresh_token(Duration::ZERO), None);
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));

        // A token response without a refresh token keeps the previous one.
        state.store(TokenResponse {
            access_token: "def".into(),
            refresh_token: None,
        });
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn cached_token_is_served_without_network() {
        let manager = manager();
        manager.state.lock().await.store(TokenResponse {
            access_token: "cached".into(),
            refresh_token: None,
        });
        assert_eq!(manager.get_valid_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn clear_tokens_forgets_everything() {
        let manager = manager();
        manager.state.lock().await.store(TokenResponse {
            access_token: "cached".into(),
            refresh_token: Some("refresh".into()),
        });
        manager.clear_tokens().await;
        let state = manager.state.lock().await;
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
        assert!(state.issued_at.is_none());
    }

    #[test]
    fn invalid_private_key_is_an_assertion_error() {
        let manager = manager();
        let err = manager
            .client_assertion("not a pem", "kid-1")
            .unwrap_err();
        assert!(matches!(err, AuthError::Assertion(_)));
    }
}
