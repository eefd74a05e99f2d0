//! Raw webhook bytes → [`WebhookEvent`].
//!
//! The envelope (`action`, `type`) is always required. The `data` member is
//! parsed strictly into an [`IssuePayload`] for Issue events and kept as an
//! opaque JSON object for every other entity type, including types this
//! crate does not know about.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{EntityType, EventPayload, PayloadError, Timestamp, WebhookAction, WebhookEvent};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    action: String,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    webhook_timestamp: Option<i64>,
}

/// Parses raw webhook bytes.
///
/// # Errors
///
/// - [`PayloadError::MalformedJson`] when the bytes are not JSON.
/// - [`PayloadError::InvalidSchema`] when the envelope is incomplete, when an
///   Issue event's data is missing or malformed, or when another entity
///   type's data is present but not a JSON object.
pub fn parse_event(raw: &[u8]) -> Result<WebhookEvent, PayloadError> {
    let value: Value = serde_json::from_slice(raw).map_err(PayloadError::MalformedJson)?;
    debug!(payload = %value, "received webhook payload");

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| PayloadError::schema(e.to_string()))?;

    let entity_type = EntityType::from_wire(&envelope.entity_type);
    let action = WebhookAction::from_wire(&envelope.action);

    let payload = match entity_type {
        EntityType::Issue => {
            let data = envelope
                .data
                .filter(|d| !d.is_null())
                .ok_or_else(|| PayloadError::schema("Issue webhook is missing data"))?;
            let issue = serde_json::from_value(data)
                .map_err(|e| PayloadError::schema(format!("Issue data: {e}")))?;
            EventPayload::Issue(issue)
        }
        _ => EventPayload::Opaque(opaque_map(envelope.data, &entity_type)?),
    };

    Ok(WebhookEvent {
        action,
        entity_type,
        payload,
        url: envelope.url,
        created_at: envelope.created_at,
        webhook_timestamp: envelope.webhook_timestamp,
    })
}

fn opaque_map(data: Option<Value>, entity_type: &EntityType) -> Result<Map<String, Value>, PayloadError> {
    match data {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(PayloadError::schema(format!(
            "{entity_type} data must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_issue_parses_into_typed_payload() {
        let raw = br#"{
            "action": "update",
            "type": "Issue",
            "url": "https://linear.app/team/issue/TEAM-123",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "data": {
                "id": "issue-123",
                "identifier": "TEAM-123",
                "title": "Test Issue",
                "priority": 2,
                "assignee": {"id": "user-456", "name": "John Doe", "email": "john@example.com"},
                "labels": [{"name": "bug"}],
                "someNewField": true
            }
        }"#;

        let event = parse_event(raw).expect("parse");
        assert_eq!(event.entity_type, EntityType::Issue);
        assert_eq!(event.action, WebhookAction::Update);
        assert!(event.created_at.is_some());
        let issue = event.issue().expect("issue payload");
        assert_eq!(issue.identifier.as_str(), "TEAM-123");
        assert_eq!(issue.priority, Some(2));
        assert_eq!(event.assignee_email(), Some("john@example.com"));
    }

    #[test]
    fn non_issue_data_is_kept_opaque() {
        let raw = br#"{"action":"create","type":"Comment","data":{"id":"comment-123","body":"hi"}}"#;
        let event = parse_event(raw).expect("parse");
        match event.payload {
            EventPayload::Opaque(map) => assert_eq!(map["id"], "comment-123"),
            EventPayload::Issue(_) => panic!("comment parsed as issue"),
        }
    }

    #[test]
    fn unknown_entity_types_do_not_fail() {
        let raw = br#"{"action":"create","type":"IssueLabel","data":{"id":"l1"}}"#;
        let event = parse_event(raw).expect("parse");
        assert_eq!(event.entity_type, EntityType::Other("IssueLabel".into()));
    }

    #[test]
    fn missing_data_for_non_issue_is_an_empty_map() {
        let raw = br#"{"action":"remove","type":"Cycle"}"#;
        let event = parse_event(raw).expect("parse");
        assert_eq!(event.payload, EventPayload::Opaque(Map::new()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_event(b"{not json").expect_err("malformed");
        assert!(matches!(err, PayloadError::MalformedJson(_)));
    }

    #[test]
    fn issue_without_required_fields_is_invalid_schema() {
        let raw = br#"{"action":"update","type":"Issue","data":{"id":"issue-123"}}"#;
        let err = parse_event(raw).expect_err("schema");
        assert!(matches!(err, PayloadError::InvalidSchema { .. }));
    }

    #[test]
    fn empty_issue_identifier_is_invalid_schema() {
        let raw = br#"{"action":"update","type":"Issue","data":{
            "id":"issue-1","identifier":"","title":"Fix: login bug!!",
            "assignee":{"id":"u1","name":"Ann","email":"ann@example.com"}}}"#;
        let err = parse_event(raw).expect_err("schema");
        assert!(matches!(err, PayloadError::InvalidSchema { .. }), "{err:?}");
        assert!(err.to_string().contains("IssueIdentifier must not be empty"));
    }

    #[test]
    fn issue_without_data_is_invalid_schema() {
        let raw = br#"{"action":"update","type":"Issue","data":null}"#;
        assert!(matches!(
            parse_event(raw),
            Err(PayloadError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn missing_envelope_fields_are_invalid_schema() {
        assert!(matches!(
            parse_event(br#"{"type":"Issue"}"#),
            Err(PayloadError::InvalidSchema { .. })
        ));
        assert!(matches!(
            parse_event(br#"{"action":"create","type":7}"#),
            Err(PayloadError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn non_object_opaque_data_is_invalid_schema() {
        let raw = br#"{"action":"create","type":"Project","data":[1,2]}"#;
        let err = parse_event(raw).expect_err("schema");
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn assignee_without_email_is_tolerated() {
        let raw = br#"{"action":"update","type":"Issue","data":{
            "id":"i","identifier":"T-1","title":"t","assignee":{"id":"u1","name":"Ann"}}}"#;
        let event = parse_event(raw).expect("parse");
        assert_eq!(event.assignee_email(), None);
    }
}
