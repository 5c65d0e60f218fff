//! Human-readable change feed entries.

use difflog_diff::{Delta, Document};
use difflog_store::VersionRecord;
use std::time::SystemTime;

/// One history feed entry, rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Who made the change, if recorded.
    pub actor: Option<String>,
    /// When the change was recorded.
    pub changed_at: SystemTime,
    /// Last store write of the underlying record.
    pub updated_at: SystemTime,
    /// Why the change was made, if recorded.
    pub reason: Option<String>,
    /// Rendered description of what changed.
    pub summary: String,
}

pub(crate) fn entry_for(record: &VersionRecord, expandable: &[String]) -> HistoryEntry {
    HistoryEntry {
        actor: record.actor.clone(),
        changed_at: record.recorded_at,
        updated_at: record.updated_at,
        reason: record.reason.clone(),
        summary: summarize(&record.delta, expandable),
    }
}

/// Renders a delta's top-level changed fields into a single comment.
///
/// Plain fields are listed by name; fields in `expandable` whose delta is
/// a value update spell out the old and new values.
fn summarize(delta: &Delta, expandable: &[String]) -> String {
    let Some(fields) = delta.as_object() else {
        return "modified document".to_string();
    };

    let mut changed_fields = Vec::new();
    let mut changed_values = Vec::new();
    for (key, field_delta) in fields {
        if expandable.iter().any(|name| name == key) {
            if let Delta::Updated { old, new } = field_delta {
                changed_values.push(format!("{key} from {} to {}", render(old), render(new)));
                continue;
            }
        }
        changed_fields.push(key.clone());
    }

    changed_fields.extend(changed_values);
    format!("modified {}", changed_fields.join(", "))
}

fn render(value: &Document) -> String {
    match value {
        Document::String(s) => s.clone(),
        other => other.to_string(),
    }
}
