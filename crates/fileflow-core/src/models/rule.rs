//! Rule definitions.
//!
//! Conditions and actions are closed enums validated when rules are read
//! from the store. Unknown kinds deserialize to `Unknown` instead of failing
//! so that rules written by a newer version keep flowing through an older
//! engine; the matcher and resolver skip them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Extension,
    NameContains,
    SizeGtMb,
    SizeLtMb,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MoveToFolder,
    Tag,
    Delete,
    CopyToBucket,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub value: String,
}

/// A routing rule. Lower `priority` wins; the first matching rule is the
/// only one applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: i32,
    pub enabled: bool,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_enabled() -> bool {
    true
}

/// Partial rule update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
    pub conditions: Option<Vec<Condition>>,
    pub actions: Option<Vec<Action>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_condition_kind_deserializes() {
        let cond: Condition =
            serde_json::from_str(r#"{"type": "content_matches", "value": "x"}"#).unwrap();
        assert_eq!(cond.kind, ConditionKind::Unknown);
    }

    #[test]
    fn condition_value_defaults_to_empty() {
        let cond: Condition = serde_json::from_str(r#"{"type": "extension"}"#).unwrap();
        assert_eq!(cond.kind, ConditionKind::Extension);
        assert!(cond.value.is_empty());
    }

    #[test]
    fn action_kind_round_trips() {
        let action = Action {
            kind: ActionKind::MoveToFolder,
            value: "reports".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}
