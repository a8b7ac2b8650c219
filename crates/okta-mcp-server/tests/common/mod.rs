//! In-memory stand-ins for the Okta API and an MCP client.

#![allow(dead_code)]

use async_trait::async_trait;
use okta_mcp_server::client::{OktaApi, Page, PagedResponse};
use okta_mcp_server::elicitation::{
    ConfirmationKind, ElicitationClient, ElicitationFailure, ElicitationReply,
};
use okta_mcp_server::error::{OktaError, OktaResult};
use okta_mcp_server::pagination::{PaginationOptions, QueryParams};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub fn no_delay() -> PaginationOptions {
    PaginationOptions {
        max_pages: 50,
        delay: Duration::ZERO,
    }
}

pub fn items(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "id": format!("{prefix}{i}"), "status": "ACTIVE", "profile": {} }))
        .collect()
}

enum Probe {
    /// More data exists while queued pages remain.
    Auto,
    Fixed(Option<bool>),
}

/// Handle over a fixed sequence of follow-up pages.
pub struct FakePage {
    pages: VecDeque<OktaResult<Vec<Value>>>,
    probe: Probe,
    link: Option<String>,
}

impl FakePage {
    pub fn last() -> Self {
        Self {
            pages: VecDeque::new(),
            probe: Probe::Fixed(Some(false)),
            link: None,
        }
    }

    pub fn followed_by(pages: Vec<OktaResult<Vec<Value>>>) -> Self {
        Self {
            pages: pages.into(),
            probe: Probe::Auto,
            link: Some("https://example.okta.com/api/v1/groups?after=next-page&limit=20".into()),
        }
    }

    /// Log style handle: a fixed probe answer and an optional next link.
    pub fn log(probe: Option<bool>, cursor: Option<&str>) -> Self {
        Self {
            pages: VecDeque::new(),
            probe: Probe::Fixed(probe),
            link: cursor
                .map(|c| format!("https://example.okta.com/api/v1/logs?limit=100&after={c}")),
        }
    }
}

#[async_trait]
impl PagedResponse for FakePage {
    fn has_next(&self) -> Option<bool> {
        match self.probe {
            Probe::Auto => Some(!self.pages.is_empty()),
            Probe::Fixed(value) => value,
        }
    }

    fn next_link(&self) -> Option<&str> {
        match self.probe {
            Probe::Auto if self.pages.is_empty() => None,
            _ => self.link.as_deref(),
        }
    }

    async fn fetch_next(&mut self) -> OktaResult<Vec<Value>> {
        self.pages.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Records every request and answers list calls from a queue.
#[derive(Default)]
pub struct FakeApi {
    lists: Mutex<VecDeque<OktaResult<(Vec<Value>, FakePage)>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, items: Vec<Value>, page: FakePage) -> Self {
        self.lists.lock().unwrap().push_back(Ok((items, page)));
        self
    }

    pub fn with_list_error(self, err: OktaError) -> Self {
        self.lists.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    fn record(&self, method: &'static str, path: &str, query: &[(String, String)], body: Option<Value>) {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            query: query.to_vec(),
            body,
        });
    }
}

#[async_trait]
impl OktaApi for FakeApi {
    async fn list(&self, path: &str, query: &QueryParams) -> OktaResult<Page> {
        self.record("LIST", path, query.as_slice(), None);
        let next = self.lists.lock().unwrap().pop_front();
        match next {
            Some(Ok((items, page))) => Ok((items, Box::new(page) as Box<dyn PagedResponse>)),
            Some(Err(e)) => Err(e),
            None => Ok((Vec::new(), Box::new(FakePage::last()) as Box<dyn PagedResponse>)),
        }
    }

    async fn get(&self, path: &str, query: &QueryParams) -> OktaResult<Value> {
        self.record("GET", path, query.as_slice(), None);
        Ok(json!({ "id": path.rsplit('/').next().unwrap_or_default() }))
    }

    async fn post(&self, path: &str, query: &QueryParams, body: Option<Value>) -> OktaResult<Value> {
        self.record("POST", path, query.as_slice(), body);
        Ok(json!({}))
    }

    async fn put(&self, path: &str, body: Option<Value>) -> OktaResult<Value> {
        self.record("PUT", path, &[], body);
        Ok(json!({}))
    }

    async fn delete(&self, path: &str) -> OktaResult<()> {
        self.record("DELETE", path, &[], None);
        Ok(())
    }
}

/// MCP client double answering elicitation requests with a fixed reply.
pub struct ScriptedElicitation {
    supported: bool,
    reply: fn() -> Result<ElicitationReply, ElicitationFailure>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedElicitation {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            reply: || Err(ElicitationFailure::Other("not asked".into())),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: fn() -> Result<ElicitationReply, ElicitationFailure>) -> Self {
        Self {
            supported: true,
            reply,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::replying(|| Ok(ElicitationReply::Accept(Some(json!({ "confirm": true })))))
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ElicitationClient for ScriptedElicitation {
    fn supports_elicitation(&self) -> bool {
        self.supported
    }

    async fn elicit(
        &self,
        message: &str,
        _kind: ConfirmationKind,
    ) -> Result<ElicitationReply, ElicitationFailure> {
        self.asked.lock().unwrap().push(message.to_string());
        (self.reply)()
    }
}
