//! JSON boundary between the remote card store and the typed model.
//!
//! Decoding is closed: every field the model needs is checked for presence
//! and type, and a malformed payload never reaches the collection. Fields the
//! model does not use (`created_at`, `archived`, `responsible_id`, ...) are
//! ignored.

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::model::card::{BoardId, Card, CardDraft, CardId, CardPatch, ListId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected a list of cards")]
    NotAList,
    #[error("expected a card object")]
    NotAnObject,
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("card at index {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<Self>,
    },
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn positive_int(obj: &Map<String, Value>, field: &'static str) -> Result<u64, DecodeError> {
    let value = obj.get(field).ok_or(DecodeError::MissingField(field))?;
    match value.as_u64() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(invalid(field, format!("expected a positive integer, got {value}"))),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(field, format!("expected a string or null, got {other}"))),
    }
}

fn due_date(obj: &Map<String, Value>) -> Result<Option<NaiveDate>, DecodeError> {
    let Some(raw) = optional_string(obj, "due_date")? else {
        return Ok(None);
    };
    // ISO datetimes carry the date in their first ten characters.
    let date_part = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| invalid("due_date", format!("'{raw}': {e}")))
}

fn position(obj: &Map<String, Value>) -> Result<i64, DecodeError> {
    let (field, value) = match (obj.get("position"), obj.get("order")) {
        (Some(v), _) if !v.is_null() => ("position", v),
        (_, Some(v)) if !v.is_null() => ("order", v),
        _ => return Ok(0),
    };
    value
        .as_i64()
        .ok_or_else(|| invalid(field, format!("expected an integer, got {value}")))
}

/// Decode one card object.
///
/// # Errors
///
/// Returns a [`DecodeError`] naming the first field that failed validation.
pub fn decode_card(value: &Value) -> Result<Card, DecodeError> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let list_id = positive_int(obj, "list_id")?;
    let list_id = u32::try_from(list_id).map_err(|_| invalid("list_id", "out of range"))?;

    let title = match obj.get("title") {
        None => return Err(DecodeError::MissingField("title")),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(invalid("title", "must not be empty")),
        Some(other) => return Err(invalid("title", format!("expected a string, got {other}"))),
    };

    Ok(Card {
        id: CardId(positive_int(obj, "id")?),
        board_id: BoardId(positive_int(obj, "board_id")?),
        list_id: ListId(list_id),
        title,
        description: optional_string(obj, "description")?,
        due_date: due_date(obj)?,
        position: position(obj)?,
    })
}

/// Decode a full-board fetch. Anything but a JSON array is rejected.
///
/// # Errors
///
/// Returns [`DecodeError::NotAList`] or the first item's failure.
pub fn decode_card_list(value: &Value) -> Result<Vec<Card>, DecodeError> {
    let items = value.as_array().ok_or(DecodeError::NotAList)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            decode_card(item).map_err(|e| DecodeError::Item {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Parse a response body and decode it as a single card.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for invalid JSON.
pub fn parse_card(body: &str) -> Result<Card, DecodeError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    decode_card(&value)
}

/// Parse a response body and decode it as a card list.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for invalid JSON.
pub fn parse_card_list(body: &str) -> Result<Vec<Card>, DecodeError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    decode_card_list(&value)
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string()))
}

#[must_use]
pub fn encode_draft(draft: &CardDraft) -> Value {
    json!({
        "title": draft.title,
        "description": draft.description,
        "due_date": date_value(draft.due_date),
        "board_id": draft.board_id.0,
        "list_id": draft.list_id.0,
    })
}

/// Body for a partial update. Only present fields are sent; a cleared
/// nullable field is sent as `null`.
#[must_use]
pub fn encode_patch(patch: &CardPatch) -> Value {
    let mut body = Map::new();
    if let Some(title) = &patch.title {
        body.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(description) = &patch.description {
        body.insert(
            "description".into(),
            description.clone().map_or(Value::Null, Value::String),
        );
    }
    if let Some(due) = patch.due_date {
        body.insert("due_date".into(), date_value(due));
    }
    if let Some(list_id) = patch.list_id {
        body.insert("list_id".into(), json!(list_id.0));
    }
    if let Some(position) = patch.position {
        body.insert("position".into(), json!(position));
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_card() -> Value {
        json!({
            "id": 12,
            "board_id": 1,
            "list_id": 2,
            "title": "Migrar base de datos",
            "description": null,
            "due_date": "2026-10-21",
            "created_by_id": 3,
            "responsible_id": null,
            "created_at": "2026-10-01T09:00:00",
            "updated_at": "2026-10-02T10:30:00",
            "archived": false
        })
    }

    #[test]
    fn decodes_remote_card_and_ignores_extra_fields() {
        let card = decode_card(&remote_card()).expect("valid card");
        assert_eq!(card.id, CardId(12));
        assert_eq!(card.list_id, ListId(2));
        assert_eq!(card.description, None);
        assert_eq!(card.due_date, NaiveDate::from_ymd_opt(2026, 10, 21));
        assert_eq!(card.position, 0);
    }

    #[test]
    fn datetime_due_date_is_truncated() {
        let mut v = remote_card();
        v["due_date"] = json!("2026-10-21T00:00:00Z");
        let card = decode_card(&v).expect("valid card");
        assert_eq!(card.due_date, NaiveDate::from_ymd_opt(2026, 10, 21));
    }

    #[test]
    fn order_is_accepted_as_position() {
        let mut v = remote_card();
        v["order"] = json!(4);
        assert_eq!(decode_card(&v).expect("valid").position, 4);
    }

    #[test]
    fn missing_and_mistyped_fields_are_rejected() {
        let mut v = remote_card();
        v.as_object_mut().expect("object").remove("title");
        assert_eq!(decode_card(&v), Err(DecodeError::MissingField("title")));

        let mut v = remote_card();
        v["list_id"] = json!("2");
        assert!(matches!(
            decode_card(&v),
            Err(DecodeError::InvalidField { field: "list_id", .. })
        ));

        let mut v = remote_card();
        v["id"] = json!(0);
        assert!(decode_card(&v).is_err());

        let mut v = remote_card();
        v["due_date"] = json!("mañana");
        assert!(decode_card(&v).is_err());
    }

    #[test]
    fn non_array_fetch_is_rejected() {
        assert_eq!(
            decode_card_list(&json!({"detail": "boom"})),
            Err(DecodeError::NotAList)
        );
    }

    #[test]
    fn list_errors_carry_index() {
        let list = json!([remote_card(), {"id": 3}]);
        assert!(matches!(
            decode_card_list(&list),
            Err(DecodeError::Item { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_body_is_reported() {
        assert!(matches!(parse_card("{"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn move_patch_encodes_only_list_and_position() {
        let body = encode_patch(&CardPatch::relocate(ListId(3), 0));
        assert_eq!(body, json!({"list_id": 3, "position": 0}));
    }

    #[test]
    fn cleared_description_is_sent_as_null() {
        let patch = CardPatch {
            description: Some(None),
            ..CardPatch::default()
        };
        assert_eq!(encode_patch(&patch), json!({"description": null}));
    }

    #[test]
    fn draft_encodes_due_date_as_plain_date() {
        let draft = CardDraft::new(BoardId(1), ListId(1), "Nueva")
            .with_due_date(NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"));
        let body = encode_draft(&draft);
        assert_eq!(body["due_date"], json!("2026-01-05"));
        assert_eq!(body["description"], Value::Null);
    }
}
