//! Outcome records
//!
//! Every operation handler produces one `OutcomeRecord`: a success flag, a
//! human-readable message, zero or more data records, and operation-specific
//! summary fields. Dispatch applies the NUL-escape sanitization transform to
//! the finished record exactly once before it is returned to the host.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Default)]
pub struct OutcomeRecord {
    pub success: bool,
    pub message: String,
    pub data: Vec<Value>,
    pub summary: Map<String, Value>,
}

impl OutcomeRecord {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn add_data(&mut self, value: Value) {
        self.data.push(value);
    }

    pub fn set_summary(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.summary.insert(key.into(), value.into());
    }

    pub fn with_data(mut self, value: Value) -> Self {
        self.add_data(value);
        self
    }

    pub fn with_summary(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_summary(key, value);
        self
    }

    /// Returns the record with its message, data, and summary passed
    /// through [`sanitize_value`]. Applied exactly once per outcome, by
    /// dispatch.
    pub fn sanitized(mut self) -> Self {
        if let Value::String(s) = sanitize_value(&Value::String(self.message.clone())) {
            self.message = s;
        }
        self.data = self
            .data
            .into_iter()
            .map(|v| sanitize_value(&v))
            .collect();
        if let Value::Object(m) = sanitize_value(&Value::Object(self.summary.clone())) {
            self.summary = m;
        }
        self
    }
}

/// Doubles the JSON escape sequence for NUL in the serialized form of
/// `value`, so downstream JSON consumers never see a literal NUL-derived
/// escape.
pub fn sanitize_value(value: &Value) -> Value {
    let serialized = match serde_json::to_string(value) {
        Ok(s) => s,
        Err(_) => return value.clone(),
    };
    let replaced = serialized.replace("\\u0000", "\\\\u0000");
    serde_json::from_str(&replaced).unwrap_or_else(|_| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_and_failure_constructors() {
        let ok = OutcomeRecord::succeeded("done");
        assert!(ok.success);
        assert_eq!(ok.message, "done");

        let bad = OutcomeRecord::failed("broken");
        assert!(!bad.success);
        assert_eq!(bad.message, "broken");
    }

    #[test]
    fn summary_and_data_accumulate() {
        let mut outcome = OutcomeRecord::succeeded("ok");
        outcome.add_data(json!({"member": "cn=a", "group": "cn=g"}));
        outcome.set_summary("total_objects", 3);
        assert_eq!(outcome.data.len(), 1);
        assert_eq!(outcome.summary["total_objects"], json!(3));
    }

    #[test]
    fn sanitize_doubles_null_escape() {
        // A literal NUL serializes as the two-character u0000 escape.
        let value = json!({"name": "bad\u{0000}value"});
        let sanitized = sanitize_value(&value);
        let text = serde_json::to_string(&sanitized).unwrap();
        assert!(text.contains("\\\\u0000"));
        assert!(!text.contains("bad\\u0000value"));
    }

    #[test]
    fn sanitize_leaves_clean_payloads_alone() {
        let value = json!({"name": "fine", "count": 2});
        assert_eq!(sanitize_value(&value), value);
    }

    #[test]
    fn sanitized_record_covers_message_and_data() {
        let outcome = OutcomeRecord::failed("server said bad\u{0000}end")
            .with_data(json!({"detail": "x\u{0000}y"}))
            .sanitized();
        // The literal NUL in the message became the six-character escape
        // text after the serialize-replace-parse pass.
        assert_eq!(outcome.message, "server said bad\\u0000end");
        let data = serde_json::to_string(&outcome.data).unwrap();
        assert!(data.contains("\\\\u0000"));
    }

    #[test]
    fn sanitized_record_covers_summary() {
        let outcome = OutcomeRecord::succeeded("ok")
            .with_summary("note", "a\u{0000}b")
            .sanitized();
        assert_eq!(outcome.summary["note"], json!("a\\u0000b"));
    }
}
