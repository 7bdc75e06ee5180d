use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod calendar;
pub mod navigation;
pub mod pipeline;
pub mod protocol;
pub mod sync;
pub mod transform;
pub mod widget;

pub use calendar::{CalendarGroup, CalendarOptions, ViewKind};
pub use navigation::{on_key, NavCommand};
pub use pipeline::{FallbackStore, RenderPipeline};
pub use protocol::ClientRequest;
pub use sync::{ConnectionEvent, ConnectionState, SyncController};
pub use transform::{sanitize_title, transform, ColorPolicy, GroupingPolicy, TransformPolicy};
pub use widget::CalendarWidget;

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("malformed snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("fallback store error: {0}")]
    Store(String),
}

/// One record of an agenda snapshot as sent by the scheduling application.
///
/// Fields are read permissively: a missing or oddly typed field becomes `None`
/// instead of failing the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    #[serde(
        rename = "ID",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub id: Option<String>,
    #[serde(
        rename = "ITEM",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub item: Option<String>,
    #[serde(
        rename = "CATEGORY",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub category: Option<String>,
    /// Kept raw: only the string `"true"` marks an all-day item.
    #[serde(rename = "allDay", default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<Value>,
    #[serde(rename = "SCHEDULED", default, skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<Value>,
    #[serde(
        rename = "startDate",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub start_date: Option<String>,
    #[serde(
        rename = "endDate",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub end_date: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl AgendaItem {
    /// Builds an item from one element of a snapshot array. Non-object
    /// elements yield an item with every field absent.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(&self.all_day, Some(Value::String(flag)) if flag == "true")
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.as_ref().is_some_and(is_truthy)
    }

    pub fn is_task(&self) -> bool {
        self.category.as_deref() == Some("tasks")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Allday,
    Time,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Allday => "allday",
            EventCategory::Time => "time",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "allday" => Ok(EventCategory::Allday),
            "time" => Ok(EventCategory::Time),
            other => Err(format!("Unknown category: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventColors {
    pub color: String,
    pub bg_color: String,
    pub drag_bg_color: String,
    pub border_color: String,
}

impl EventColors {
    pub fn accent(text: &str, accent: &str) -> Self {
        Self {
            color: text.to_string(),
            bg_color: accent.to_string(),
            drag_bg_color: accent.to_string(),
            border_color: accent.to_string(),
        }
    }
}

/// Renderable event derived from an [`AgendaItem`]. This is also the shape
/// persisted in the fallback store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub id: Option<String>,
    pub calendar_id: String,
    pub title: Option<String>,
    pub category: EventCategory,
    #[serde(flatten)]
    pub colors: Option<EventColors>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl NormalizedEvent {
    pub fn is_all_day(&self) -> bool {
        self.category == EventCategory::Allday
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// Parses a snapshot payload. Only a payload that is not a JSON array is an
/// error; individual elements never fail.
pub fn parse_snapshot(payload: &str) -> Result<Vec<AgendaItem>, AgendaError> {
    let values: Vec<Value> = serde_json::from_str(payload).map_err(AgendaError::Snapshot)?;
    Ok(values.into_iter().map(AgendaItem::from_value).collect())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accepts a string or a number; anything else reads as absent.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_read_permissively() {
        let item = AgendaItem::from_value(json!({
            "ID": 42,
            "ITEM": "Write report",
            "CATEGORY": ["not", "text"],
            "allDay": "true",
            "startDate": "2026-10-19T09:00:00+0200",
            "LEVEL": 2
        }));
        assert_eq!(item.id.as_deref(), Some("42"));
        assert_eq!(item.item.as_deref(), Some("Write report"));
        assert_eq!(item.category, None);
        assert!(item.is_all_day());
        assert_eq!(item.end_date, None);
        assert_eq!(item.extra.get("LEVEL"), Some(&json!(2)));
    }

    #[test]
    fn non_object_elements_become_empty_items() {
        let items = parse_snapshot(r#"[{"ID":"a1"}, 7, null, "x"]"#).expect("array parses");
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].id.as_deref(), Some("a1"));
        assert_eq!(items[1], AgendaItem::default());
        assert_eq!(items[3], AgendaItem::default());
    }

    #[test]
    fn non_array_payloads_are_rejected() {
        assert!(matches!(parse_snapshot("not json"), Err(AgendaError::Snapshot(_))));
        assert!(parse_snapshot(r#"{"ID":"a1"}"#).is_err());
        assert!(parse_snapshot("[]").expect("empty array").is_empty());
    }

    #[test]
    fn all_day_requires_the_string_true() {
        for (value, expected) in [
            (Some(json!("true")), true),
            (Some(json!(true)), false),
            (Some(json!("false")), false),
            (Some(json!("TRUE")), false),
            (None, false),
        ] {
            let item = AgendaItem {
                all_day: value.clone(),
                ..AgendaItem::default()
            };
            assert_eq!(item.is_all_day(), expected, "allDay {value:?}");
        }
    }

    #[test]
    fn scheduled_marker_follows_truthiness() {
        for (value, expected) in [
            (json!("<2026-10-19 Mon>"), true),
            (json!(""), false),
            (json!(false), false),
            (json!(0), false),
            (json!(null), false),
            (json!(1), true),
        ] {
            let item = AgendaItem {
                scheduled: Some(value.clone()),
                ..AgendaItem::default()
            };
            assert_eq!(item.is_scheduled(), expected, "SCHEDULED {value}");
        }
    }

    #[test]
    fn normalized_event_uses_widget_field_names() {
        let event = NormalizedEvent {
            id: Some("a1".to_string()),
            calendar_id: "1".to_string(),
            title: Some("Meeting".to_string()),
            category: EventCategory::Time,
            colors: Some(EventColors::accent("#ffffff", "#00a9ff")),
            start: Some("2026-10-19T10:00:00".to_string()),
            end: None,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["calendarId"], json!("1"));
        assert_eq!(value["category"], json!("time"));
        assert_eq!(value["bgColor"], json!("#00a9ff"));
        assert_eq!(value["end"], json!(null));

        let back: NormalizedEvent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn persisted_events_without_colors_load() {
        let raw = r#"{"id":"a2","calendarId":"2","title":"Standup","category":"allday","start":"2026-10-19","end":"2026-10-19"}"#;
        let event: NormalizedEvent = serde_json::from_str(raw).expect("deserialize");
        assert!(event.is_all_day());
        assert_eq!(event.colors, None);
    }
}
