//! History records for the CLI. The engine itself never persists anything.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use serde_json::{to_string_pretty, Value};
use uuid::Uuid;

use crate::wire::Intent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub original_prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,
    pub result: Value,
}

impl HistoryRecord {
    pub fn new(intent: Intent, original_prompt: &str, result: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            intent,
            model_used: None,
            original_prompt: original_prompt.to_string(),
            answers: Vec::new(),
            result,
        }
    }
}

pub fn history_dir(root: &Path) -> PathBuf {
    root.join(".prompt_architect").join("history")
}

/// Writes `<root>/.prompt_architect/history/<id>.json`.
pub fn save_record(root: &Path, record: &HistoryRecord) -> anyhow::Result<PathBuf> {
    let dir = history_dir(root);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", record.id));
    fs::write(&path, to_string_pretty(record)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn saves_record_under_history_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = HistoryRecord::new(Intent::Finalize, "a cat", json!({"enhanced": "a cat, oil"}));
        rec.model_used = Some("midjourney".into());

        let path = save_record(dir.path(), &rec).unwrap();
        assert!(path.starts_with(history_dir(dir.path())));

        let back: HistoryRecord = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.intent, Intent::Finalize);
        assert_eq!(back.result["enhanced"], "a cat, oil");
    }
}
