//! The JSON error body and the header names shared by every endpoint.

use serde::Serialize;
use std::collections::BTreeMap;

/// Correlation id, accepted on requests and echoed on every response.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const API_KEY_HEADER: &str = "x-api-key";
/// Narrows a request to one branch of the caller's tenant.
pub const BRANCH_ID_HEADER: &str = "x-branch-id";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Body of every error response.
///
/// ```json
/// { "success": false, "error": "Validation failed", "errors": { "email": ["..."] }, "traceId": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    /// Field-keyed messages, present for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    pub trace_id: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, trace_id: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: None,
            trace_id,
        }
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }
}
