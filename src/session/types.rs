use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::LogEntry;

/// Body of one POST to the fitting service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub function: String,
    pub input_parameters: Map<String, Value>,
    pub sequence_num: u64,
}

/// Parsed response body. Only `output_parameters` is interpreted; everything
/// else the service sends is kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub output_parameters: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Function name echoed by the service, or `fallback` when it sent none.
    pub fn function_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.function.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => fallback,
        }
    }

    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.output_parameters.as_ref()
    }

    /// A present, non-null output value.
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs()?.get(key).filter(|v| !v.is_null())
    }

    /// The service's `return` status code, when it sends one.
    pub fn return_code(&self) -> Option<i64> {
        self.extra.get("return")?.as_i64()
    }
}

/// A completed call: what went out (with its sequence number) and what came back.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: RequestEnvelope,
    pub response: ResponseEnvelope,
}

impl Exchange {
    pub fn log_entry(&self) -> LogEntry {
        LogEntry::now(format!(
            "Sent:\n{}\nReceived:\n{}\n{}",
            pretty(&self.request),
            pretty(&self.response),
            "-".repeat(68)
        ))
    }
}

pub fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}
