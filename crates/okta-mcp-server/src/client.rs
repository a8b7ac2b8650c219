//! Okta management API client.
//!
//! Tools talk to Okta through the [`OktaApi`] trait so handlers and paginators
//! can be driven by in-memory fakes. [`HttpOktaClient`] is the real thing: it
//! attaches a bearer token from the injected [`CredentialProvider`] and turns
//! Okta's `Link: <...>; rel="next"` header into a [`PagedResponse`] handle.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, LINK};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::CredentialProvider;
use crate::error::{OktaError, OktaResult};
use crate::pagination::QueryParams;

pub const USER_AGENT: &str = concat!("okta-mcp-server/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle on "the rest of a result set".
///
/// `has_next` returns `None` when the handle has no way of telling whether
/// more data exists; callers treat that the same as "no".
#[async_trait]
pub trait PagedResponse: Send + Sync {
    fn has_next(&self) -> Option<bool>;

    /// Opaque URL of the next page, usually carrying an `after` cursor.
    fn next_link(&self) -> Option<&str>;

    /// Fetch the next page and advance the handle past it.
    async fn fetch_next(&mut self) -> OktaResult<Vec<Value>>;
}

/// First page of a list call plus the handle for the remaining pages.
pub type Page = (Vec<Value>, Box<dyn PagedResponse>);

#[async_trait]
pub trait OktaApi: Send + Sync {
    async fn list(&self, path: &str, query: &QueryParams) -> OktaResult<Page>;

    async fn get(&self, path: &str, query: &QueryParams) -> OktaResult<Value>;

    async fn post(&self, path: &str, query: &QueryParams, body: Option<Value>)
        -> OktaResult<Value>;

    async fn put(&self, path: &str, body: Option<Value>) -> OktaResult<Value>;

    async fn delete(&self, path: &str) -> OktaResult<()>;
}

/// Pick the `rel="next"` target out of a `Link` header value.
pub fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if is_next && target.starts_with('<') && target.ends_with('>') {
            return Some(target[1..target.len() - 1].to_string());
        }
    }
    None
}

fn next_link_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(parse_next_link)
}

/// Okta error bodies look like `{"errorCode": "E0000007", "errorSummary": "Not found: ..."}`.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let summary = v.get("errorSummary")?.as_str()?.to_string();
            let causes: Vec<String> = v
                .get("errorCauses")
                .and_then(Value::as_array)
                .map(|causes| {
                    causes
                        .iter()
                        .filter_map(|c| c.get("errorSummary").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(if causes.is_empty() {
                summary
            } else {
                format!("{summary} ({})", causes.join("; "))
            })
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn parse_body(body: &str) -> OktaResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

#[derive(Clone)]
struct Transport {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl Transport {
    async fn send(&self, request: RequestBuilder) -> OktaResult<(HeaderMap, String)> {
        let token = self.credentials.get_valid_token().await?;
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OktaError::api(status.as_u16(), error_message(status, &body)));
        }
        Ok((headers, body))
    }
}

pub struct HttpOktaClient {
    transport: Transport,
    org_url: String,
}

impl HttpOktaClient {
    pub fn new(org_url: &str, credentials: Arc<dyn CredentialProvider>) -> OktaResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            transport: Transport { http, credentials },
            org_url: org_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.org_url, path)
    }
}

#[async_trait]
impl OktaApi for HttpOktaClient {
    async fn list(&self, path: &str, query: &QueryParams) -> OktaResult<Page> {
        debug!("GET {} (list) {:?}", path, query);
        let request = self.transport.http.get(self.url(path)).query(query.as_slice());
        let (headers, body) = self.transport.send(request).await?;
        let items: Vec<Value> = serde_json::from_str(&body)?;
        let handle = HttpPage {
            transport: self.transport.clone(),
            next: next_link_from_headers(&headers),
        };
        Ok((items, Box::new(handle)))
    }

    async fn get(&self, path: &str, query: &QueryParams) -> OktaResult<Value> {
        debug!("GET {}", path);
        let request = self.transport.http.get(self.url(path)).query(query.as_slice());
        let (_, body) = self.transport.send(request).await?;
        parse_body(&body)
    }

    async fn post(
        &self,
        path: &str,
        query: &QueryParams,
        body: Option<Value>,
    ) -> OktaResult<Value> {
        debug!("POST {}", path);
        let mut request = self
            .transport
            .http
            .post(self.url(path))
            .query(query.as_slice());
        request = match body {
            Some(body) => request.json(&body),
            None => request.header(CONTENT_TYPE, "application/json"),
        };
        let (_, body) = self.transport.send(request).await?;
        parse_body(&body)
    }

    async fn put(&self, path: &str, body: Option<Value>) -> OktaResult<Value> {
        debug!("PUT {}", path);
        let mut request = self.transport.http.put(self.url(path));
        request = match body {
            Some(body) => request.json(&body),
            None => request.header(CONTENT_TYPE, "application/json"),
        };
        let (_, body) = self.transport.send(request).await?;
        parse_body(&body)
    }

    async fn delete(&self, path: &str) -> OktaResult<()> {
        debug!("DELETE {}", path);
        let request = self.transport.http.delete(self.url(path));
        self.transport.send(request).await?;
        Ok(())
    }
}

/// Remaining pages of an HTTP list call, driven by the `Link` header.
pub struct HttpPage {
    transport: Transport,
    next: Option<String>,
}

#[async_trait]
impl PagedResponse for HttpPage {
    fn has_next(&self) -> Option<bool> {
        Some(self.next.is_some())
    }

    fn next_link(&self) -> Option<&str> {
        self.next.as_deref()
    }

    async fn fetch_next(&mut self) -> OktaResult<Vec<Value>> {
        let Some(url) = self.next.take() else {
            return Ok(Vec::new());
        };
        debug!("GET {} (next page)", url);
        let request = self.transport.http.get(&url);
        let (headers, body) = self.transport.send(request).await?;
        self.next = next_link_from_headers(&headers);
        Ok(serde_json::from_str(&body)?)
    }
}
