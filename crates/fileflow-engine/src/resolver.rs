//! Action resolution.
//!
//! Turns a matched rule's action list into a concrete disposition. Actions
//! apply in list order: later `move_to_folder`/`copy_to_bucket` actions
//! override earlier ones, `tag` actions accumulate, and `delete` latches the
//! delete flag. Blank folder and bucket values keep the defaults. Resolution records every field even on the delete path so
//! the audit trail stays complete; deletion takes precedence at execution
//! time.

use fileflow_core::models::{ActionKind, Disposition, FileMeta, Rule};

/// Resolve `rule`'s actions against `meta` into a disposition.
pub fn resolve_actions(rule: &Rule, meta: &FileMeta, processed_bucket: &str) -> Disposition {
    let mut disposition = Disposition::default_for(meta, processed_bucket);
    disposition.rule_id = Some(rule.id);
    disposition.rule_name = Some(rule.name.clone());

    for action in &rule.actions {
        let value = action.value.trim();
        match action.kind {
            ActionKind::MoveToFolder => {
                // A blank value keeps the classification-label default.
                if !value.is_empty() {
                    disposition.dest_folder = value.to_string();
                }
            }
            ActionKind::CopyToBucket => {
                // An empty value keeps the configured default bucket.
                if !value.is_empty() {
                    disposition.dest_bucket = value.to_string();
                }
            }
            ActionKind::Tag => {
                if !value.is_empty() {
                    disposition.tags.push(value.to_string());
                }
            }
            ActionKind::Delete => {
                disposition.delete_only = true;
            }
            ActionKind::Unknown => continue,
        }
    }

    disposition
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fileflow_core::models::{Action, ActionKind, Condition};
    use uuid::Uuid;

    fn rule_with(actions: Vec<Action>) -> Rule {
        Rule {
            id: Uuid::new_v4(),
            name: "routing".to_string(),
            description: None,
            priority: 1,
            enabled: true,
            conditions: Vec::<Condition>::new(),
            actions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn act(kind: ActionKind, value: &str) -> Action {
        Action {
            kind,
            value: value.to_string(),
        }
    }

    fn meta() -> FileMeta {
        FileMeta {
            job_id: "j".to_string(),
            bucket: "up".to_string(),
            blob: "uploads/report.csv".to_string(),
            name: "uploads/report.csv".to_string(),
            ext: ".csv".to_string(),
            mime_type: Some("text/csv".to_string()),
            size_bytes: 2 * 1_048_576,
            classification: "spreadsheets".to_string(),
        }
    }

    #[test]
    fn defaults_come_from_classification() {
        let d = resolve_actions(&rule_with(vec![]), &meta(), "processed");
        assert_eq!(d.dest_bucket, "processed");
        assert_eq!(d.dest_folder, "spreadsheets");
        assert!(d.tags.is_empty());
        assert!(!d.delete_only);
    }

    #[test]
    fn later_move_overrides_earlier() {
        let d = resolve_actions(
            &rule_with(vec![
                act(ActionKind::MoveToFolder, "a"),
                act(ActionKind::MoveToFolder, "b"),
            ]),
            &meta(),
            "processed",
        );
        assert_eq!(d.dest_folder, "b");
    }

    #[test]
    fn tags_accumulate_in_order() {
        let d = resolve_actions(
            &rule_with(vec![
                act(ActionKind::Tag, "confidential"),
                act(ActionKind::Tag, "finance"),
            ]),
            &meta(),
            "processed",
        );
        assert_eq!(d.tags, vec!["confidential", "finance"]);
    }

    #[test]
    fn delete_latches_regardless_of_order() {
        let before = resolve_actions(
            &rule_with(vec![
                act(ActionKind::Delete, ""),
                act(ActionKind::MoveToFolder, "reports"),
            ]),
            &meta(),
            "processed",
        );
        let after = resolve_actions(
            &rule_with(vec![
                act(ActionKind::MoveToFolder, "reports"),
                act(ActionKind::Delete, ""),
            ]),
            &meta(),
            "processed",
        );
        assert!(before.delete_only);
        assert!(after.delete_only);
        // Fields are still recorded for audit even when deleting.
        assert_eq!(before.dest_folder, "reports");
    }

    #[test]
    fn blank_move_to_folder_keeps_classification_default() {
        let d = resolve_actions(
            &rule_with(vec![act(ActionKind::MoveToFolder, "  ")]),
            &meta(),
            "processed",
        );
        assert_eq!(d.dest_folder, "spreadsheets");
    }

    #[test]
    fn empty_copy_bucket_keeps_default() {
        let d = resolve_actions(
            &rule_with(vec![act(ActionKind::CopyToBucket, "  ")]),
            &meta(),
            "processed",
        );
        assert_eq!(d.dest_bucket, "processed");
    }

    #[test]
    fn copy_to_bucket_overrides_default() {
        let d = resolve_actions(
            &rule_with(vec![act(ActionKind::CopyToBucket, "archive")]),
            &meta(),
            "processed",
        );
        assert_eq!(d.dest_bucket, "archive");
    }

    #[test]
    fn resolved_disposition_names_the_rule() {
        let rule = rule_with(vec![]);
        let d = resolve_actions(&rule, &meta(), "processed");
        assert_eq!(d.rule_id, Some(rule.id));
        assert_eq!(d.rule_name.as_deref(), Some("routing"));
    }
}
