use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use dupescout::classify::Category;
use dupescout::duplicates::group_by_hash;
use dupescout::recommend::Recommender;
use dupescout::scanner::{FileId, FileRecord, Hasher};

fn record(id: u64, size: u64, hash_byte: u8, day: u32) -> FileRecord {
    FileRecord {
        id: FileId(id),
        name: format!("f{id}.bin"),
        path: format!("/data/f{id}.bin").into(),
        size,
        mime_type: "application/octet-stream".to_string(),
        last_modified: Utc.with_ymd_and_hms(2024, 1, day.clamp(1, 28), 0, 0, 0).unwrap(),
        content_hash: [hash_byte; 32],
        category: Category::Other,
        category_confidence: 0.0,
        version: None,
    }
}

proptest! {
    #[test]
    fn test_hash_ignores_everything_but_bytes(content in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let hasher = Hasher::new();
        // Same bytes, "different files": the digest only sees content.
        prop_assert_eq!(hasher.hash_bytes(&content), hasher.hash_bytes(&content));
    }

    #[test]
    fn test_single_byte_mutation_changes_hash(
        content in proptest::collection::vec(any::<u8>(), 1..2048),
        index in any::<prop::sample::Index>(),
    ) {
        let hasher = Hasher::new();
        let mut mutated = content.clone();
        let i = index.index(mutated.len());
        mutated[i] = mutated[i].wrapping_add(1);

        prop_assert_ne!(hasher.hash_bytes(&content), hasher.hash_bytes(&mutated));
    }

    #[test]
    fn test_grouping_invariants(specs in proptest::collection::vec((1u64..500, 0u8..6), 0..60)) {
        let records: Vec<FileRecord> = specs
            .iter()
            .enumerate()
            .map(|(i, (size, hash_byte))| record(i as u64, *size, *hash_byte, 1))
            .collect();

        let (groups, stats) = group_by_hash(records.clone());

        prop_assert_eq!(stats.total_files, records.len());
        for group in &groups {
            // Every group has 2+ members sharing its hash, and total_size
            // counts every copy.
            prop_assert!(group.len() >= 2);
            let mut expected_size = 0u64;
            for file in &group.files {
                prop_assert_eq!(file.content_hash, group.hash);
                expected_size += file.size;
            }
            prop_assert_eq!(group.total_size, expected_size);
            prop_assert!(group.reclaimable_space() < group.total_size);
        }

        // Grouped plus eliminated accounts for every input file.
        let grouped: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(grouped + stats.eliminated_unique, records.len());
    }

    #[test]
    fn test_grouping_idempotent(specs in proptest::collection::vec((1u64..500, 0u8..6), 0..60)) {
        let records: Vec<FileRecord> = specs
            .iter()
            .enumerate()
            .map(|(i, (size, hash_byte))| record(i as u64, *size, *hash_byte, 1))
            .collect();

        let (first, _) = group_by_hash(records.clone());
        let (second, _) = group_by_hash(records);

        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            prop_assert_eq!(a.hash, b.hash);
            prop_assert_eq!(a.file_ids(), b.file_ids());
        }
    }

    #[test]
    fn test_recommendation_confidence_bounds_and_determinism(
        specs in proptest::collection::vec((1u64..1000, 1u32..28), 2..8),
    ) {
        let records: Vec<FileRecord> = specs
            .iter()
            .enumerate()
            .map(|(i, (size, day))| record(i as u64, *size, 1, *day))
            .collect();
        let refs: Vec<&FileRecord> = records.iter().collect();
        let recommender = Recommender::new();

        let first = recommender.recommend([1u8; 32], &refs).unwrap();
        prop_assert!((0.0..=1.0).contains(&first.confidence));
        // The keeper is always a member of the group.
        prop_assert!(records.iter().any(|r| r.id == first.file_to_keep));

        let again = recommender.recommend([1u8; 32], &refs).unwrap();
        prop_assert_eq!(first.file_to_keep, again.file_to_keep);
        prop_assert_eq!(first.confidence, again.confidence);
        prop_assert_eq!(first.rationale, again.rationale);
    }
}
