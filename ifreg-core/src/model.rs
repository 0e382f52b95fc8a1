//! Interface records and the request shapes that create or modify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{RegistryError, RegistryResult};

pub type InterfaceId = u64;

/// Methods an interface may declare.
const HTTP_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Lifecycle state of an interface.
///
/// The gateway routes traffic only to `Online` interfaces. Serialized by
/// name; input also accepts the admin console's numeric codes, `0` for
/// `Disabled` and `1` for `Online`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case", try_from = "StatusWire")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InterfaceStatus {
    #[default]
    Disabled,
    Online,
}

/// Incoming status value: a numeric code or a name.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusWire {
    Code(u8),
    Name(String),
}

impl TryFrom<StatusWire> for InterfaceStatus {
    type Error = String;

    fn try_from(value: StatusWire) -> Result<Self, Self::Error> {
        match value {
            StatusWire::Code(0) => Ok(Self::Disabled),
            StatusWire::Code(1) => Ok(Self::Online),
            StatusWire::Code(code) => Err(format!("unknown interface status code {}", code)),
            StatusWire::Name(name) => name
                .parse()
                .map_err(|_| format!("unknown interface status {}", name)),
        }
    }
}

/// A registered, externally callable endpoint description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceInfo {
    pub id: InterfaceId,
    pub name: String,
    pub description: Option<String>,
    pub method: String,
    pub url: String,
    /// Opaque, stored verbatim.
    pub request_header: Option<String>,
    /// Opaque, stored verbatim.
    pub response_header: Option<String>,
    /// Opaque, stored verbatim.
    pub request_params: Option<String>,
    pub status: InterfaceStatus,
    pub call_no: u64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl InterfaceInfo {
    pub fn fields(&self) -> InterfaceFields {
        InterfaceFields {
            name: self.name.clone(),
            description: self.description.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            request_header: self.request_header.clone(),
            response_header: self.response_header.clone(),
            request_params: self.request_params.clone(),
        }
    }
}

/// The caller-editable part of an interface record.
///
/// Identity, lifecycle state, call count and timestamps are owned by the
/// registry and never appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub request_header: Option<String>,
    #[serde(default)]
    pub response_header: Option<String>,
    #[serde(default)]
    pub request_params: Option<String>,
}

impl InterfaceFields {
    /// Checks required fields and normalizes the method to upper case.
    pub fn validated(mut self) -> RegistryResult<Self> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::validation("name must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(RegistryError::validation("url must not be empty"));
        }
        self.method = normalize_method(&self.method)?;
        Ok(self)
    }
}

fn normalize_method(method: &str) -> RegistryResult<String> {
    let method = method.trim();
    if method.is_empty() {
        return Err(RegistryError::validation("method must not be empty"));
    }
    let upper = method.to_ascii_uppercase();
    if !HTTP_METHODS.contains(&upper.as_str()) {
        return Err(RegistryError::validation(format!(
            "unsupported HTTP method: {}",
            method
        )));
    }
    Ok(upper)
}

/// Request to register a new interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddInterfaceRequest {
    #[serde(flatten)]
    pub fields: InterfaceFields,

    /// Client-generated token making retries of this request idempotent.
    #[serde(default)]
    pub request_token: Option<String>,
}

/// Partial update of an interface.
///
/// Absent fields are left unchanged. For the optional text fields an empty
/// string clears the stored value. `status` is accepted only so that a
/// request trying to change it can be rejected explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfacePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_header: Option<String>,
    #[serde(default)]
    pub response_header: Option<String>,
    #[serde(default)]
    pub request_params: Option<String>,
    #[serde(default)]
    pub status: Option<InterfaceStatus>,
}

impl InterfacePatch {
    /// Merges the patch over `current` and validates the result.
    pub fn apply_to(self, current: InterfaceFields) -> RegistryResult<InterfaceFields> {
        let clearable = |new: Option<String>, old: Option<String>| match new {
            Some(value) if value.is_empty() => None,
            Some(value) => Some(value),
            None => old,
        };
        InterfaceFields {
            name: self.name.unwrap_or(current.name),
            description: clearable(self.description, current.description),
            method: self.method.unwrap_or(current.method),
            url: self.url.unwrap_or(current.url),
            request_header: clearable(self.request_header, current.request_header),
            response_header: clearable(self.response_header, current.response_header),
            request_params: clearable(self.request_params, current.request_params),
        }
        .validated()
    }
}

/// One row of the top-invocations report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRank {
    pub id: InterfaceId,
    pub name: String,
    pub call_no: u64,
}

impl From<&InterfaceInfo> for InvocationRank {
    fn from(info: &InterfaceInfo) -> Self {
        Self {
            id: info.id,
            name: info.name.clone(),
            call_no: info.call_no,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn fields() -> InterfaceFields {
        InterfaceFields {
            name: "weather".to_string(),
            description: Some("current weather".to_string()),
            method: "get".to_string(),
            url: "https://api.example.com/weather".to_string(),
            request_header: Some(r#"{"Accept":"application/json"}"#.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validated_normalizes_method() {
        let validated = fields().validated().unwrap();
        assert_eq!(validated.method, "GET");
        assert_eq!(
            validated.request_header.as_deref(),
            Some(r#"{"Accept":"application/json"}"#)
        );
    }

    #[test]
    fn test_validated_rejects_missing_fields() {
        let blank_name = InterfaceFields {
            name: "  ".to_string(),
            ..fields()
        };
        assert!(matches!(
            blank_name.validated(),
            Err(RegistryError::Validation(_))
        ));

        let blank_url = InterfaceFields {
            url: String::new(),
            ..fields()
        };
        assert!(matches!(
            blank_url.validated(),
            Err(RegistryError::Validation(_))
        ));

        let bad_method = InterfaceFields {
            method: "FETCH".to_string(),
            ..fields()
        };
        assert!(matches!(
            bad_method.validated(),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_merges_and_clears() {
        let patch = InterfacePatch {
            name: Some("forecast".to_string()),
            description: Some(String::new()),
            ..Default::default()
        };
        let merged = patch.apply_to(fields()).unwrap();
        assert_eq!(merged.name, "forecast");
        assert_eq!(merged.description, None);
        assert_eq!(merged.url, "https://api.example.com/weather");
        assert_eq!(merged.method, "GET");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            InterfaceStatus::from_str("Online").unwrap(),
            InterfaceStatus::Online
        );
        assert_eq!(InterfaceStatus::default(), InterfaceStatus::Disabled);
        assert_eq!(
            serde_json::to_value(InterfaceStatus::Online).unwrap(),
            serde_json::json!("online")
        );
    }

    #[test]
    fn test_status_accepts_console_codes() {
        let parse = |value| serde_json::from_value::<InterfaceStatus>(value);
        assert_eq!(parse(serde_json::json!(0)).unwrap(), InterfaceStatus::Disabled);
        assert_eq!(parse(serde_json::json!(1)).unwrap(), InterfaceStatus::Online);
        assert_eq!(parse(serde_json::json!("ONLINE")).unwrap(), InterfaceStatus::Online);
        assert!(parse(serde_json::json!(2)).is_err());
        assert!(parse(serde_json::json!("archived")).is_err());

        let patch: InterfacePatch =
            serde_json::from_value(serde_json::json!({ "status": 1 })).unwrap();
        assert_eq!(patch.status, Some(InterfaceStatus::Online));
    }

    #[test]
    fn test_add_request_wire_format() {
        let request: AddInterfaceRequest = serde_json::from_value(serde_json::json!({
            "name": "echo",
            "method": "POST",
            "url": "http://localhost/echo",
            "requestParams": "{\"msg\":\"string\"}",
            "requestToken": "abc"
        }))
        .unwrap();
        assert_eq!(request.fields.name, "echo");
        assert_eq!(
            request.fields.request_params.as_deref(),
            Some("{\"msg\":\"string\"}")
        );
        assert_eq!(request.request_token.as_deref(), Some("abc"));
    }
}
