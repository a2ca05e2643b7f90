//! Content-hash grouping of ingested files.
//!
//! # Overview
//!
//! Files are bucketed by their BLAKE3 content hash. Buckets with a single
//! member are discarded (a unique file is not a duplicate); buckets with
//! two or more members become [`DuplicateGroup`]s.
//!
//! Ordering is deterministic for a fixed input order: groups appear in
//! first-seen order and members keep their discovery order. Running the
//! grouper twice on the same input yields identical output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scanner::{hash_to_hex, FileId, FileRecord, Hash};

/// A group of two or more files sharing a content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// BLAKE3 content hash shared by every member (32 bytes).
    pub hash: Hash,
    /// Member records in discovery order.
    pub files: Vec<FileRecord>,
    /// Sum of ALL member sizes: the space occupied by the duplicates,
    /// not the space reclaimable by deleting the extras.
    pub total_size: u64,
}

impl DuplicateGroup {
    /// Create a group from its members.
    ///
    /// `total_size` is derived from the members.
    #[must_use]
    pub fn new(hash: Hash, files: Vec<FileRecord>) -> Self {
        let total_size = files.iter().map(|f| f.size).sum();
        Self {
            hash,
            files,
            total_size,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of redundant copies (total minus the one worth keeping).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Space freed if everything but the largest copy were removed.
    ///
    /// Distinct from [`total_size`](Self::total_size), which counts every
    /// copy.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        let max = self.files.iter().map(|f| f.size).max().unwrap_or(0);
        self.total_size.saturating_sub(max)
    }

    /// Hash as a hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }

    /// Look up a member by id.
    #[must_use]
    pub fn member(&self, id: FileId) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Ids of all members in discovery order.
    #[must_use]
    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.iter().map(|f| f.id).collect()
    }
}

/// Statistics from the grouping step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of records bucketed.
    pub total_files: usize,
    /// Number of distinct content hashes seen.
    pub unique_hashes: usize,
    /// Number of files discarded as unique (singleton buckets).
    pub eliminated_unique: usize,
    /// Number of groups with 2+ members.
    pub duplicate_groups: usize,
    /// Number of files inside duplicate groups (all copies).
    pub duplicate_files: usize,
    /// Total size of all files inside duplicate groups.
    pub duplicate_size: u64,
}

/// Bucket records by content hash, keeping only buckets of 2+ files.
///
/// Groups come back in first-seen hash order and members in input order,
/// so the result is stable and reproducible for a fixed input ordering.
/// Singleton buckets are discarded without error.
#[must_use]
pub fn group_by_hash(
    records: impl IntoIterator<Item = FileRecord>,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut order: Vec<Hash> = Vec::new();
    let mut buckets: HashMap<Hash, Vec<FileRecord>> = HashMap::new();

    for record in records {
        stats.total_files += 1;
        let bucket = buckets.entry(record.content_hash).or_insert_with(|| {
            order.push(record.content_hash);
            Vec::new()
        });
        bucket.push(record);
    }

    stats.unique_hashes = order.len();

    let mut groups = Vec::new();
    for hash in order {
        let files = buckets.remove(&hash).unwrap_or_default();
        if files.len() < 2 {
            stats.eliminated_unique += files.len();
            log::trace!("Eliminated unique hash {}", hash_to_hex(&hash));
            continue;
        }
        stats.duplicate_files += files.len();
        let group = DuplicateGroup::new(hash, files);
        stats.duplicate_size += group.total_size;
        log::debug!(
            "Duplicate group {}: {} copies, {} bytes total",
            group.hash_hex(),
            group.len(),
            group.total_size
        );
        groups.push(group);
    }
    stats.duplicate_groups = groups.len();

    log::info!(
        "Grouping complete: {} files → {} duplicate groups ({} unique files eliminated)",
        stats.total_files,
        stats.duplicate_groups,
        stats.eliminated_unique
    );

    (groups, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_record(id: u64, name: &str, size: u64, hash_byte: u8) -> FileRecord {
        FileRecord {
            id: FileId(id),
            name: name.to_string(),
            path: name.into(),
            size,
            mime_type: "application/octet-stream".to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            content_hash: [hash_byte; 32],
            category: crate::classify::Category::Other,
            category_confidence: 0.0,
            version: None,
        }
    }

    #[test]
    fn test_group_by_hash_empty() {
        let (groups, stats) = group_by_hash(Vec::new());
        assert!(groups.is_empty());
        assert_eq!(stats.total_files, 0);
    }

    #[test]
    fn test_singletons_discarded() {
        let records = vec![
            make_record(0, "a.txt", 10, 1),
            make_record(1, "b.txt", 20, 2),
        ];
        let (groups, stats) = group_by_hash(records);

        assert!(groups.is_empty());
        assert_eq!(stats.eliminated_unique, 2);
        assert_eq!(stats.unique_hashes, 2);
    }

    #[test]
    fn test_identical_content_different_names_single_group() {
        let records = vec![
            make_record(0, "report.pdf", 500, 7),
            make_record(1, "Copy of report.pdf", 500, 7),
        ];
        let (groups, _) = group_by_hash(records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].total_size, 1000);
    }

    #[test]
    fn test_member_order_is_insertion_order() {
        let records = vec![
            make_record(0, "first", 10, 5),
            make_record(1, "other", 10, 9),
            make_record(2, "second", 10, 5),
            make_record(3, "third", 10, 5),
        ];
        let (groups, _) = group_by_hash(records);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].file_ids(),
            vec![FileId(0), FileId(2), FileId(3)]
        );
    }

    #[test]
    fn test_group_order_is_first_seen_order() {
        let records = vec![
            make_record(0, "b1", 10, 2),
            make_record(1, "a1", 10, 1),
            make_record(2, "b2", 10, 2),
            make_record(3, "a2", 10, 1),
        ];
        let (groups, _) = group_by_hash(records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].hash, [2u8; 32]);
        assert_eq!(groups[1].hash, [1u8; 32]);
    }

    #[test]
    fn test_grouping_idempotent() {
        let records: Vec<_> = (0..20)
            .map(|i| make_record(i, &format!("f{i}"), 10 + i, (i % 4) as u8))
            .collect();

        let (first, first_stats) = group_by_hash(records.clone());
        let (second, second_stats) = group_by_hash(records);

        assert_eq!(first_stats, second_stats);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.file_ids(), b.file_ids());
        }
    }

    #[test]
    fn test_total_size_counts_all_copies() {
        let records = vec![
            make_record(0, "a", 300, 4),
            make_record(1, "b", 300, 4),
            make_record(2, "c", 300, 4),
        ];
        let (groups, stats) = group_by_hash(records);

        assert_eq!(groups[0].total_size, 900);
        assert_eq!(groups[0].reclaimable_space(), 600);
        assert_eq!(groups[0].duplicate_count(), 2);
        assert_eq!(stats.duplicate_size, 900);
    }

    #[test]
    fn test_member_lookup() {
        let records = vec![make_record(0, "a", 10, 1), make_record(1, "b", 10, 1)];
        let (groups, _) = group_by_hash(records);

        assert_eq!(groups[0].member(FileId(1)).unwrap().name, "b");
        assert!(groups[0].member(FileId(9)).is_none());
    }
}
