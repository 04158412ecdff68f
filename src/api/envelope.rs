//! Uniform response envelope: `status` is one of success/fail/error, with a
//! `data` payload for success/fail and a `message` for error.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
    Error,
}

#[derive(Serialize, Debug)]
pub struct Envelope {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    #[must_use]
    pub fn fail(data: Value) -> Self {
        Self {
            status: Status::Fail,
            data: Some(data),
            message: None,
        }
    }

    /// Fail with the payload nested under a single field name.
    #[must_use]
    pub fn fail_with_name(message: &str, name: &str) -> Self {
        Self::fail(json!({ name: message }))
    }

    #[must_use]
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn success_keeps_null_data() -> Result<()> {
        let value = serde_json::to_value(Envelope::success(Value::Null))?;
        assert_eq!(value, json!({"status": "success", "data": null}));
        Ok(())
    }

    #[test]
    fn fail_with_name_nests_payload() -> Result<()> {
        let value = serde_json::to_value(Envelope::fail_with_name(
            "missing access token",
            "access_token",
        ))?;
        assert_eq!(
            value,
            json!({"status": "fail", "data": {"access_token": "missing access token"}})
        );
        Ok(())
    }

    #[test]
    fn error_has_message_and_no_data() -> Result<()> {
        let value = serde_json::to_value(Envelope::error("database error"))?;
        assert_eq!(value, json!({"status": "error", "message": "database error"}));
        Ok(())
    }
}
