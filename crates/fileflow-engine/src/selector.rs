//! First-match-wins rule selection.
//!
//! The store hands over rules already sorted ascending by priority (ties in
//! insertion order); the first rule that matches is the only one applied and
//! nothing after it is evaluated. A later rule never shadows an earlier
//! match.

use fileflow_core::models::{FileMeta, Rule};

use crate::matcher::rule_matches;

/// Return the first matching rule, or `None` when no rule applies.
pub fn select_rule<'a>(rules: &'a [Rule], meta: &FileMeta) -> Option<&'a Rule> {
    let selected = rules.iter().find(|rule| rule_matches(rule, meta));
    if let Some(rule) = selected {
        tracing::debug!(rule_id = %rule.id, rule_name = %rule.name, priority = rule.priority, "Rule matched");
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fileflow_core::models::{Action, ActionKind, Condition, ConditionKind};
    use uuid::Uuid;

    fn rule(priority: i32, conditions: Vec<Condition>, folder: &str) -> Rule {
        Rule {
            id: Uuid::new_v4(),
            name: format!("rule-{}", priority),
            description: None,
            priority,
            enabled: true,
            conditions,
            actions: vec![Action {
                kind: ActionKind::MoveToFolder,
                value: folder.to_string(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cond(kind: ConditionKind, value: &str) -> Condition {
        Condition {
            kind,
            value: value.to_string(),
        }
    }

    fn csv_meta(size_bytes: u64) -> FileMeta {
        FileMeta {
            job_id: "j".to_string(),
            bucket: "up".to_string(),
            blob: "uploads/report.csv".to_string(),
            name: "uploads/report.csv".to_string(),
            ext: ".csv".to_string(),
            mime_type: Some("text/csv".to_string()),
            size_bytes,
            classification: "spreadsheets".to_string(),
        }
    }

    #[test]
    fn lowest_priority_match_wins() {
        // The priority-2 catch-all matches everything, so only ordering
        // keeps the priority-1 rule selected.
        let rules = vec![
            rule(1, vec![cond(ConditionKind::Extension, "csv")], "reports"),
            rule(2, vec![], "catch-all"),
        ];
        let selected = select_rule(&rules, &csv_meta(1024)).unwrap();
        assert_eq!(selected.priority, 1);
    }

    #[test]
    fn non_matching_high_priority_rule_is_skipped() {
        // A priority-0 size rule that does not match a 2MB file must not
        // shadow the csv rule below it.
        let rules = vec![
            rule(0, vec![cond(ConditionKind::SizeGtMb, "5")], "big"),
            rule(1, vec![cond(ConditionKind::Extension, "csv")], "reports"),
        ];
        let selected = select_rule(&rules, &csv_meta(2 * 1_048_576)).unwrap();
        assert_eq!(selected.priority, 1);
    }

    #[test]
    fn no_match_returns_none() {
        let rules = vec![rule(1, vec![cond(ConditionKind::Extension, "pdf")], "pdfs")];
        assert!(select_rule(&rules, &csv_meta(1024)).is_none());
    }

    #[test]
    fn disabled_rules_fall_through() {
        let mut first = rule(1, vec![], "first");
        first.enabled = false;
        let rules = vec![first, rule(2, vec![], "second")];
        let selected = select_rule(&rules, &csv_meta(1024)).unwrap();
        assert_eq!(selected.priority, 2);
    }
}
