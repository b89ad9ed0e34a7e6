use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Payload sent by a feed listener after its connection was re-established.
///
/// Notifications may have been missed, so it decodes to `Unknown` and forces
/// a full reload.
pub const RESYNC_PAYLOAD: &str = r#"{"eventType":"RESYNC"}"#;

/// Wire shape of one change-feed notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotice {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl ChangeNotice {
    pub fn insert(table: &str, row: Value) -> Self {
        Self {
            event_type: "INSERT".to_string(),
            table: Some(table.to_string()),
            new: Some(row),
            old: None,
        }
    }

    pub fn update(table: &str, id: Uuid, row: Value) -> Self {
        Self {
            event_type: "UPDATE".to_string(),
            table: Some(table.to_string()),
            new: Some(row),
            old: Some(serde_json::json!({ "id": id })),
        }
    }

    pub fn delete(table: &str, id: Uuid) -> Self {
        Self {
            event_type: "DELETE".to_string(),
            table: Some(table.to_string()),
            new: None,
            old: Some(serde_json::json!({ "id": id })),
        }
    }

    pub fn to_payload(&self) -> String {
        // Serializing plain strings and JSON values cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct RowKey {
    id: Uuid,
}

/// A decoded change for one list
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    Delete(Uuid),
    /// Anything the reducer cannot apply directly
    Unknown,
}

impl<T: DeserializeOwned> ChangeEvent<T> {
    /// Decode a raw notification payload. Never fails: shapes that cannot be
    /// applied become `Unknown`.
    pub fn decode(payload: &str) -> Self {
        let notice = match serde_json::from_str::<ChangeNotice>(payload) {
            Ok(notice) => notice,
            Err(err) => {
                debug!(error = %err, "change payload is not a notice");
                return ChangeEvent::Unknown;
            }
        };
        Self::from_notice(notice)
    }

    pub fn from_notice(notice: ChangeNotice) -> Self {
        let event = match notice.event_type.to_ascii_uppercase().as_str() {
            "INSERT" => notice.new.and_then(decode_row).map(ChangeEvent::Insert),
            "UPDATE" => notice.new.and_then(decode_row).map(ChangeEvent::Update),
            "DELETE" => notice
                .old
                .and_then(|old| serde_json::from_value::<RowKey>(old).ok())
                .map(|key| ChangeEvent::Delete(key.id)),
            _ => None,
        };

        event.unwrap_or_else(|| {
            debug!(event_type = %notice.event_type, "unrecognized change shape");
            ChangeEvent::Unknown
        })
    }
}

fn decode_row<T: DeserializeOwned>(row: Value) -> Option<T> {
    match serde_json::from_value(row) {
        Ok(row) => Some(row),
        Err(err) => {
            debug!(error = %err, "change row does not decode");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: Uuid,
        name: String,
    }

    fn id() -> Uuid {
        Uuid::parse_str("0b5c1f9e-5f0a-4d3e-9a57-0d8f1f0b6a11").unwrap()
    }

    #[test]
    fn test_decodes_insert_and_update() {
        let row = json!({ "id": id(), "name": "Office" });

        let insert = ChangeNotice::insert("projects", row.clone()).to_payload();
        assert_eq!(
            ChangeEvent::<Row>::decode(&insert),
            ChangeEvent::Insert(Row { id: id(), name: "Office".to_string() })
        );

        let update = ChangeNotice::update("projects", id(), row).to_payload();
        assert!(matches!(ChangeEvent::<Row>::decode(&update), ChangeEvent::Update(r) if r.id == id()));
    }

    #[test]
    fn test_decodes_delete_from_old_key() {
        let payload = ChangeNotice::delete("clients", id()).to_payload();
        assert_eq!(ChangeEvent::<Row>::decode(&payload), ChangeEvent::Delete(id()));
    }

    #[test]
    fn test_event_type_is_case_insensitive() {
        let payload = json!({ "eventType": "delete", "old": { "id": id() } }).to_string();
        assert_eq!(ChangeEvent::<Row>::decode(&payload), ChangeEvent::Delete(id()));
    }

    #[test]
    fn test_unusable_shapes_are_unknown() {
        let cases = [
            "not json at all".to_string(),
            RESYNC_PAYLOAD.to_string(),
            json!({ "eventType": "TRUNCATE" }).to_string(),
            json!({ "eventType": "INSERT", "new": null }).to_string(),
            json!({ "eventType": "UPDATE", "new": { "id": "nope" } }).to_string(),
            json!({ "eventType": "DELETE", "old": {} }).to_string(),
            json!({ "new": { "id": id(), "name": "x" } }).to_string(),
        ];

        for payload in cases {
            assert_eq!(ChangeEvent::<Row>::decode(&payload), ChangeEvent::Unknown, "{payload}");
        }
    }
}
