use crate::ipc::error::err;
use crate::ipc::types::{AppState, Session};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

/// Store failures are logged here once; callers just propagate.
pub fn query_failed(e: rusqlite::Error) -> HandlerErr {
    tracing::error!(error = %e, "store query failed");
    HandlerErr::new("db_query_failed", e.to_string())
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Numeric form fields arrive as JSON numbers or numeric strings; both parse.
pub fn get_required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))?;
    if let Some(n) = v.as_f64() {
        return Ok(n);
    }
    if let Some(s) = v.as_str() {
        if let Ok(n) = s.trim().parse::<f64>() {
            return Ok(n);
        }
    }
    Err(HandlerErr::new(
        "bad_params",
        format!("{} must be numeric", key),
    ))
}

pub fn require_session(state: &AppState) -> Result<Session, HandlerErr> {
    state
        .session
        .clone()
        .ok_or_else(|| HandlerErr::new("not_signed_in", "sign in first"))
}
