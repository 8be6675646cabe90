use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound body of `POST /api/v1/messages`.
///
/// Every field is optional at the wire level so that validation can report
/// all missing fields together instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default, rename = "access_key")]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default, rename = "from")]
    pub from_number: Option<String>,
    #[serde(default, rename = "to")]
    pub to_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SendRequest {
    /// Reads the five fields out of a JSON body without failing. A body that
    /// is not a JSON object, or a field that is not a string, leaves the field
    /// unset so validation reports it.
    pub fn from_json_lenient(bytes: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(bytes).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            secret_id: field("access_key"),
            auth_token: field("auth_token"),
            from_number: field("from"),
            to_number: field("to"),
            message: field("message"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub status: String,
    pub sid: String,
    pub message: String,
    pub from: String,
    pub to: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorsBody {
    pub errors: Vec<FieldError>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub app_version: String,
}
