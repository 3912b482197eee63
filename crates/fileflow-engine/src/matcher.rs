//! Rule matching.
//!
//! All conditions within a rule are ANDed. A blank condition value is
//! vacuously satisfied, an unparseable size threshold is ignored rather than
//! failing the rule, and unknown condition kinds are skipped so newer rule
//! definitions degrade gracefully on older engines.

use fileflow_core::models::{ConditionKind, FileMeta, Rule};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Whether `rule` matches `meta`. A disabled rule never matches.
pub fn rule_matches(rule: &Rule, meta: &FileMeta) -> bool {
    if !rule.enabled {
        return false;
    }

    let name = meta.name.to_lowercase();
    let ext = meta.ext.to_lowercase();
    let size_bytes = meta.size_bytes as f64;

    for condition in &rule.conditions {
        let value = condition.value.trim();
        if value.is_empty() {
            continue;
        }

        match condition.kind {
            ConditionKind::Extension => {
                let mut wanted = value.to_lowercase();
                if !wanted.starts_with('.') {
                    wanted.insert(0, '.');
                }
                if ext != wanted {
                    return false;
                }
            }
            ConditionKind::NameContains => {
                if !name.contains(&value.to_lowercase()) {
                    return false;
                }
            }
            ConditionKind::SizeGtMb => match value.parse::<f64>() {
                Ok(mb) => {
                    if size_bytes <= mb * BYTES_PER_MB {
                        return false;
                    }
                }
                Err(_) => continue,
            },
            ConditionKind::SizeLtMb => match value.parse::<f64>() {
                Ok(mb) => {
                    if size_bytes >= mb * BYTES_PER_MB {
                        return false;
                    }
                }
                Err(_) => continue,
            },
            ConditionKind::Unknown => continue,
        }
    }

    true
}
