//! Backup Archive format
//!
//! The versioned, JSON-serializable snapshot produced by export and
//! consumed by restore. Created in memory; persisting an archive to a
//! file is the scheduler's concern.

use atrium_domain::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only archive format version this engine reads and writes
pub const ARCHIVE_VERSION: u32 = 1;

/// Archive header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMeta {
    /// Archive format version
    pub version: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Exactly the expanded selection the archive was exported with
    pub entities: Vec<EntityKind>,
}

/// A versioned snapshot of a subset of the entity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    /// Header
    pub meta: ArchiveMeta,
    /// Records per entity kind, as plain JSON objects
    pub data: BTreeMap<EntityKind, Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_serializes_with_camel_case_meta() {
        let archive = Archive {
            meta: ArchiveMeta {
                version: ARCHIVE_VERSION,
                created_at: Utc::now(),
                entities: vec![EntityKind::Category],
            },
            data: BTreeMap::from([(EntityKind::Category, Vec::new())]),
        };
        let json = serde_json::to_value(&archive).unwrap();
        assert!(json["meta"]["createdAt"].is_string());
        assert_eq!(json["meta"]["version"], 1);
        assert_eq!(json["meta"]["entities"][0], "category");
        assert!(json["data"]["category"].is_array());
    }

    #[test]
    fn archive_round_trips_through_json() {
        let archive = Archive {
            meta: ArchiveMeta {
                version: ARCHIVE_VERSION,
                created_at: Utc::now(),
                entities: vec![EntityKind::Link, EntityKind::TagLink],
            },
            data: BTreeMap::new(),
        };
        let json = serde_json::to_string(&archive).unwrap();
        let back: Archive = serde_json::from_str(&json).unwrap();
        assert_eq!(back, archive);
    }
}
