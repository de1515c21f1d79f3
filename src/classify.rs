//! Orphan classification of session keys.
//!
//! A key is an **orphan** when it contains `:run:` (a finished cron run whose
//! session was never cleaned up). A key is a **cron session** when it contains
//! `cron` anywhere. The two tags are independent; every orphan produced by the
//! cron scheduler is also a cron session.

use crate::store::SessionStore;
use serde::Serialize;

/// Substring marking a per-run session.
pub const ORPHAN_PATTERN: &str = ":run:";

/// Substring marking any cron-related session.
pub const CRON_PATTERN: &str = "cron";

/// Classification tags for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyClass {
    pub orphan: bool,
    pub cron: bool,
}

/// Classify one session key. Plain substring matching, no regex.
pub fn classify_key(key: &str) -> KeyClass {
    KeyClass {
        orphan: key.contains(ORPHAN_PATTERN),
        cron: key.contains(CRON_PATTERN),
    }
}

/// A session entry selected by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub key: String,
    pub session_id: String,
    pub updated_at: i64,
    /// `now - updated_at` in milliseconds
    pub age_ms: i64,
    pub label: String,
}

impl SessionEntry {
    /// Age in whole minutes.
    pub fn age_minutes(&self) -> i64 {
        self.age_ms / 60_000
    }
}

/// Result of one pass over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub total: usize,
    /// Orphans, in store order
    pub orphans: Vec<SessionEntry>,
    /// Cron sessions (superset of cron-produced orphans), in store order
    pub cron_sessions: Vec<SessionEntry>,
}

impl Classification {
    /// Keys of every orphan, in store order.
    pub fn orphan_keys(&self) -> impl Iterator<Item = &str> {
        self.orphans.iter().map(|e| e.key.as_str())
    }
}

/// Partition the store into orphans and cron sessions. Pure, no I/O.
pub fn classify(store: &SessionStore, now_ms: i64) -> Classification {
    let mut result = Classification {
        total: store.len(),
        ..Default::default()
    };

    for (key, record) in store.records() {
        let class = classify_key(key);
        if !class.orphan && !class.cron {
            continue;
        }

        let entry = SessionEntry {
            key: key.to_string(),
            session_id: record.session_id,
            updated_at: record.updated_at,
            age_ms: now_ms.saturating_sub(record.updated_at),
            label: record.label,
        };

        if class.orphan && class.cron {
            result.orphans.push(entry.clone());
            result.cron_sessions.push(entry);
        } else if class.orphan {
            result.orphans.push(entry);
        } else {
            result.cron_sessions.push(entry);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn store(json: &str) -> SessionStore {
        SessionStore::parse(Path::new("test.json"), json.as_bytes()).unwrap()
    }

    #[test]
    fn test_classify_key_orphan_requires_run_segment() {
        assert!(classify_key("agent:main:cron:J1:run:a").orphan);
        assert!(classify_key("x:run:").orphan);
        assert!(!classify_key("agent:main:cron:J1").orphan);
        assert!(!classify_key("agent:main:run").orphan);
        assert!(!classify_key("agent:main:rerun:x").orphan);
        assert!(!classify_key("agent:main:RUN:x").orphan);
    }

    #[test]
    fn test_classify_key_cron_is_loose() {
        assert!(classify_key("agent:main:cron:J1").cron);
        assert!(classify_key("agent:cronos:main").cron);
        assert!(!classify_key("agent:main:main").cron);
        // Orphan without the cron substring
        let class = classify_key("agent:main:hook:H:run:1");
        assert!(class.orphan);
        assert!(!class.cron);
    }

    #[test]
    fn test_classify_reference_store() {
        let s = store(
            r#"{
                "agent:main:main": {"sessionId": "m"},
                "agent:main:cron:J1": {"sessionId": "j"},
                "agent:main:cron:J1:run:a": {"sessionId": "a", "updatedAt": 1000},
                "agent:main:cron:J1:run:b": {"sessionId": "b", "updatedAt": 2000}
            }"#,
        );
        let result = classify(&s, 10_000);

        assert_eq!(result.total, 4);
        assert_eq!(result.orphans.len(), 2);
        assert_eq!(result.cron_sessions.len(), 3);

        let keys: Vec<&str> = result.orphan_keys().collect();
        assert_eq!(keys, vec!["agent:main:cron:J1:run:a", "agent:main:cron:J1:run:b"]);
        assert_eq!(result.orphans[0].age_ms, 9_000);
        assert_eq!(result.orphans[1].session_id, "b");
    }

    #[test]
    fn test_missing_updated_at_is_very_old() {
        let s = store(r#"{"agent:a:cron:j:run:1": {}}"#);
        let now = 1_700_000_000_000;
        let result = classify(&s, now);
        assert_eq!(result.orphans[0].age_ms, now);
        assert_eq!(result.orphans[0].label, "agent:a:cron:j:run:1");
    }

    #[test]
    fn test_age_minutes_truncates() {
        let entry = SessionEntry {
            key: "k".into(),
            session_id: String::new(),
            updated_at: 0,
            age_ms: 119_999,
            label: "k".into(),
        };
        assert_eq!(entry.age_minutes(), 1);
    }

    #[test]
    fn test_empty_store() {
        let result = classify(&store("{}"), 0);
        assert_eq!(result, Classification::default());
    }
}
