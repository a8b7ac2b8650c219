//! Per-call tool spans, recorded through tracing.

use serde_json::Value;
use std::time::Instant;
use tracing::{field, info, info_span, warn, Span};

pub struct ToolSpan {
    span: Span,
    start_time: Instant,
    tool_name: String,
    success: bool,
    error: Option<String>,
}

impl ToolSpan {
    pub fn new(tool_name: &str) -> Self {
        let span = info_span!(
            "tool",
            tool.name = tool_name,
            tool.start_time = %chrono::Utc::now().to_rfc3339(),
            tool.duration_ms = field::Empty,
            tool.success = field::Empty,
            error.kind = field::Empty,
        );
        ToolSpan {
            span,
            start_time: Instant::now(),
            tool_name: tool_name.to_string(),
            success: true,
            error: None,
        }
    }

    /// The span to instrument the call with.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn set_status(&mut self, success: bool, error: Option<&str>) {
        self.success = success;
        self.error = if success {
            None
        } else {
            Some(error.unwrap_or("Failed").to_string())
        };
    }

    /// Derive the outcome from a tool payload: `{"error": ...}` means failure.
    pub fn record_result(&mut self, result: &Value) {
        match result.get("error") {
            Some(error) => {
                let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
                self.set_status(false, Some(&message));
            }
            None => self.set_status(true, None),
        }
    }

    pub fn end(self) {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        self.span.record("tool.duration_ms", duration_ms);
        self.span.record("tool.success", self.success);
        let _entered = self.span.enter();
        match &self.error {
            None => info!("Tool {} completed in {}ms", self.tool_name, duration_ms),
            Some(message) => {
                self.span.record("error.kind", classify_error(message));
                warn!(
                    "Tool {} failed in {}ms: {}",
                    self.tool_name, duration_ms, message
                );
            }
        }
    }
}

fn classify_error(error: &str) -> &'static str {
    let lower = error.to_lowercase();
    if lower.contains("not found") {
        "not_found"
    } else if lower.contains("cancelled") {
        "cancelled"
    } else if lower.contains("invalid") || lower.contains("validation") {
        "validation_error"
    } else if lower.contains("authentication") || lower.contains("403") || lower.contains("401") {
        "permission_denied"
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "timeout"
    } else if lower.starts_with("exception") {
        "exception"
    } else {
        "api_error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payloads_mark_failure() {
        let mut span = ToolSpan::new("get_group");
        span.record_result(&json!({"error": "Error: HTTP 404: Not found"}));
        assert!(!span.success);
        assert_eq!(span.error.as_deref(), Some("Error: HTTP 404: Not found"));

        span.record_result(&json!({"id": "00g1"}));
        assert!(span.success);
        assert!(span.error.is_none());
        span.end();
    }

    #[test]
    fn errors_are_classified() {
        assert_eq!(classify_error("Error: HTTP 404: Not found: Resource"), "not_found");
        assert_eq!(
            classify_error("Deletion cancelled. Confirmation 'DELETE' was not provided correctly."),
            "cancelled"
        );
        assert_eq!(classify_error("Error: Invalid group_id: contains"), "validation_error");
        assert_eq!(classify_error("Exception: request failed"), "exception");
        assert_eq!(classify_error("Error: HTTP 429: Too many requests"), "api_error");
    }
}
