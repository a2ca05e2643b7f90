//! Session-scoped cleanup state: soft delete, undo, and Smart Clean.
//!
//! # Overview
//!
//! A [`CleanupSession`] tracks which files the user has (softly) deleted
//! and which groups have been resolved. It is created per scan, passed
//! explicitly to every operation that reads or mutates cleanup state, and
//! discarded (or [`reset`](CleanupSession::reset)) when the scan is
//! thrown away. Nothing here touches the file system: deletion is a
//! reversible mark, not an unlink.
//!
//! # State machines
//!
//! Per file: `live → deleted → live` — both transitions idempotent
//! (undoing a never-deleted file is a no-op, not an error).
//!
//! Per group: `active → resolved` once at most one live member remains.
//! A resolved group leaves the active result set and its cached
//! recommendation is discarded. An undo that brings the live count back
//! above one re-activates the group.
//!
//! # Concurrency
//!
//! Every group's state sits behind its own mutex, so mutations of one
//! group are totally ordered while different groups never contend.
//! The session holds only file ids and cached recommendations — member
//! records stay owned by their [`DuplicateGroup`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::duplicates::DuplicateGroup;
use crate::recommend::{RecommendError, Recommendation, Recommender};
use crate::scanner::{hash_to_hex, FileId, FileRecord, Hash};

/// Errors from session operations.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The group is not registered in this session.
    #[error("unknown group {0}")]
    UnknownGroup(String),

    /// The file is not a member of the given group.
    #[error("{file} is not a member of group {group}")]
    UnknownFile {
        /// The offending file id.
        file: FileId,
        /// Hex hash of the group.
        group: String,
    },

    /// Smart Clean was invoked without a prior recommendation.
    /// The session state is left untouched.
    #[error("smart clean requires a prior recommendation for group {0}")]
    MissingRecommendation(String),

    /// The operation needs at least two live members.
    #[error("group {group} has {live} live member(s), need at least 2")]
    TooFewMembers {
        /// Hex hash of the group.
        group: String,
        /// Current live-member count.
        live: usize,
    },
}

/// Snapshot of a group's state after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatus {
    /// Number of live members remaining.
    pub live_members: usize,
    /// Whether the group is resolved (≤ 1 live member).
    pub resolved: bool,
}

/// Result of a Smart Clean operation.
#[derive(Debug, Clone)]
pub struct SmartCleanOutcome {
    /// The member that was kept.
    pub kept: FileId,
    /// Members marked deleted by this operation, in group order.
    pub removed: Vec<FileId>,
}

/// Per-group mutable state. Always accessed under the group's mutex.
#[derive(Debug, Default)]
struct GroupState {
    member_ids: Vec<FileId>,
    deleted: HashSet<FileId>,
    resolved: bool,
    /// Cached recommendation; invalidated on every membership change so a
    /// stale decision is never served.
    recommendation: Option<Recommendation>,
}

impl GroupState {
    fn live_count(&self) -> usize {
        self.member_ids
            .iter()
            .filter(|id| !self.deleted.contains(*id))
            .count()
    }

    fn status(&self) -> GroupStatus {
        GroupStatus {
            live_members: self.live_count(),
            resolved: self.resolved,
        }
    }

    /// Re-derive the resolved flag from the live count.
    fn settle(&mut self) {
        let live = self.live_count();
        if !self.resolved && live <= 1 {
            self.resolved = true;
            self.recommendation = None;
        } else if self.resolved && live >= 2 {
            self.resolved = false;
        }
    }
}

/// Session-scoped soft-delete and resolution tracking.
pub struct CleanupSession {
    groups: HashMap<Hash, Mutex<GroupState>>,
}

impl CleanupSession {
    /// Create a session covering the given duplicate groups.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup]) -> Self {
        let states = groups
            .iter()
            .map(|group| {
                (
                    group.hash,
                    Mutex::new(GroupState {
                        member_ids: group.file_ids(),
                        ..Default::default()
                    }),
                )
            })
            .collect();
        Self { groups: states }
    }

    fn state(&self, hash: &Hash) -> Result<&Mutex<GroupState>, SessionError> {
        self.groups
            .get(hash)
            .ok_or_else(|| SessionError::UnknownGroup(hash_to_hex(hash)))
    }

    /// Mark a file deleted.
    ///
    /// Idempotent: deleting an already-deleted file changes nothing. The
    /// group's cached recommendation is invalidated, and the group
    /// resolves if at most one live member remains.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownGroup`] / [`SessionError::UnknownFile`] when
    /// the target does not exist.
    pub fn delete_file(
        &self,
        group: &DuplicateGroup,
        file: FileId,
    ) -> Result<GroupStatus, SessionError> {
        let mut state = self.state(&group.hash)?.lock().expect("session lock");
        if !state.member_ids.contains(&file) {
            return Err(SessionError::UnknownFile {
                file,
                group: group.hash_hex(),
            });
        }
        if state.deleted.insert(file) {
            log::debug!("Marked {} deleted in group {}", file, group.hash_hex());
            state.recommendation = None;
            state.settle();
        }
        Ok(state.status())
    }

    /// Undo a deletion, restoring the file to live.
    ///
    /// Idempotent: undoing a never-deleted file is a no-op. If the live
    /// count climbs back above one, a resolved group re-activates.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownGroup`] / [`SessionError::UnknownFile`] when
    /// the target does not exist.
    pub fn undo_delete(
        &self,
        group: &DuplicateGroup,
        file: FileId,
    ) -> Result<GroupStatus, SessionError> {
        let mut state = self.state(&group.hash)?.lock().expect("session lock");
        if !state.member_ids.contains(&file) {
            return Err(SessionError::UnknownFile {
                file,
                group: group.hash_hex(),
            });
        }
        if state.deleted.remove(&file) {
            log::debug!("Restored {} in group {}", file, group.hash_hex());
            state.recommendation = None;
            state.settle();
        }
        Ok(state.status())
    }

    /// Check whether a file is currently marked deleted.
    #[must_use]
    pub fn is_deleted(&self, group: &DuplicateGroup, file: FileId) -> bool {
        self.groups
            .get(&group.hash)
            .is_some_and(|m| m.lock().expect("session lock").deleted.contains(&file))
    }

    /// Check whether a group is resolved.
    #[must_use]
    pub fn is_resolved(&self, group: &DuplicateGroup) -> bool {
        self.groups
            .get(&group.hash)
            .is_some_and(|m| m.lock().expect("session lock").resolved)
    }

    /// The group's live members in discovery order.
    #[must_use]
    pub fn live_members<'a>(&self, group: &'a DuplicateGroup) -> Vec<&'a FileRecord> {
        let Some(state) = self.groups.get(&group.hash) else {
            return group.files.iter().collect();
        };
        let state = state.lock().expect("session lock");
        group
            .files
            .iter()
            .filter(|f| !state.deleted.contains(&f.id))
            .collect()
    }

    /// Filter a group list down to the active (unresolved) groups.
    #[must_use]
    pub fn active_groups<'a>(&self, groups: &'a [DuplicateGroup]) -> Vec<&'a DuplicateGroup> {
        groups.iter().filter(|g| !self.is_resolved(g)).collect()
    }

    /// Get the retention recommendation for a group, computing it if the
    /// cache is empty or was invalidated by a membership change.
    ///
    /// # Errors
    ///
    /// [`SessionError::TooFewMembers`] when fewer than two members are
    /// live (including when the group is already resolved).
    pub fn recommendation(
        &self,
        group: &DuplicateGroup,
        recommender: &Recommender,
    ) -> Result<Recommendation, SessionError> {
        let mut state = self.state(&group.hash)?.lock().expect("session lock");
        if let Some(cached) = &state.recommendation {
            return Ok(cached.clone());
        }

        let live: Vec<&FileRecord> = group
            .files
            .iter()
            .filter(|f| !state.deleted.contains(&f.id))
            .collect();
        let recommendation = recommender
            .recommend(group.hash, &live)
            .map_err(|e| match e {
                RecommendError::TooFewMembers(live) => SessionError::TooFewMembers {
                    group: group.hash_hex(),
                    live,
                },
            })?;
        state.recommendation = Some(recommendation.clone());
        Ok(recommendation)
    }

    /// Smart Clean: delete every live member except the recommended one.
    ///
    /// Requires a recommendation computed earlier for the group's current
    /// membership; the whole mutation happens atomically under the
    /// group's mutex, after which the group is resolved.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingRecommendation`] when no recommendation has
    /// been computed (or it was invalidated); the session state is left
    /// untouched.
    pub fn smart_clean(&self, group: &DuplicateGroup) -> Result<SmartCleanOutcome, SessionError> {
        let mut state = self.state(&group.hash)?.lock().expect("session lock");
        let Some(recommendation) = state.recommendation.take() else {
            return Err(SessionError::MissingRecommendation(group.hash_hex()));
        };

        let kept = recommendation.file_to_keep;
        let removed: Vec<FileId> = state
            .member_ids
            .iter()
            .filter(|id| **id != kept && !state.deleted.contains(*id))
            .copied()
            .collect();
        for id in &removed {
            state.deleted.insert(*id);
        }
        state.settle();

        log::info!(
            "Smart clean on group {}: kept {}, removed {} copies",
            group.hash_hex(),
            kept,
            removed.len()
        );
        Ok(SmartCleanOutcome { kept, removed })
    }

    /// Discard all session state: every file back to live, every group
    /// back to active, every cached recommendation dropped.
    pub fn reset(&self) {
        for state in self.groups.values() {
            let mut state = state.lock().expect("session lock");
            state.deleted.clear();
            state.resolved = false;
            state.recommendation = None;
        }
        log::debug!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::duplicates::group_by_hash;
    use chrono::{TimeZone, Utc};

    fn make_group(n: u64) -> DuplicateGroup {
        let records: Vec<FileRecord> = (0..n)
            .map(|i| FileRecord {
                id: FileId(i),
                name: format!("copy{i}.bin"),
                path: format!("/data/copy{i}.bin").into(),
                size: 100,
                mime_type: "application/octet-stream".to_string(),
                last_modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                content_hash: [1u8; 32],
                category: Category::Other,
                category_confidence: 0.0,
                version: None,
            })
            .collect();
        let (mut groups, _) = group_by_hash(records);
        groups.remove(0)
    }

    #[test]
    fn test_delete_and_undo_round_trip() {
        let group = make_group(3);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        let status = session.delete_file(&group, FileId(1)).unwrap();
        assert_eq!(status.live_members, 2);
        assert!(!status.resolved);
        assert!(session.is_deleted(&group, FileId(1)));

        let status = session.undo_delete(&group, FileId(1)).unwrap();
        assert_eq!(status.live_members, 3);
        assert!(!session.is_deleted(&group, FileId(1)));
    }

    #[test]
    fn test_delete_idempotent() {
        let group = make_group(3);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        session.delete_file(&group, FileId(0)).unwrap();
        let status = session.delete_file(&group, FileId(0)).unwrap();
        assert_eq!(status.live_members, 2);
    }

    #[test]
    fn test_undo_never_deleted_is_noop() {
        let group = make_group(2);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        let status = session.undo_delete(&group, FileId(0)).unwrap();
        assert_eq!(status.live_members, 2);
        assert!(!status.resolved);
    }

    #[test]
    fn test_group_resolves_at_one_live_member() {
        let group = make_group(2);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        let status = session.delete_file(&group, FileId(0)).unwrap();
        assert!(status.resolved);
        assert!(session.is_resolved(&group));
        assert!(session.active_groups(std::slice::from_ref(&group)).is_empty());
    }

    #[test]
    fn test_undo_reactivates_resolved_group() {
        let group = make_group(2);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        session.delete_file(&group, FileId(0)).unwrap();
        assert!(session.is_resolved(&group));

        let status = session.undo_delete(&group, FileId(0)).unwrap();
        assert!(!status.resolved);
        assert_eq!(
            session.active_groups(std::slice::from_ref(&group)).len(),
            1
        );
    }

    #[test]
    fn test_smart_clean_requires_recommendation() {
        let group = make_group(3);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        let err = session.smart_clean(&group).unwrap_err();
        assert!(matches!(err, SessionError::MissingRecommendation(_)));
        // Precondition failure leaves the session untouched.
        assert_eq!(session.live_members(&group).len(), 3);
    }

    #[test]
    fn test_smart_clean_keeps_recommended_and_resolves() {
        let mut group = make_group(3);
        // Give the middle member the strongest signal so it is recommended.
        group.files[1].version = Some("2.0".to_string());
        let session = CleanupSession::new(std::slice::from_ref(&group));
        let recommender = Recommender::new();

        let rec = session.recommendation(&group, &recommender).unwrap();
        assert_eq!(rec.file_to_keep, FileId(1));

        let outcome = session.smart_clean(&group).unwrap();
        assert_eq!(outcome.kept, FileId(1));
        assert_eq!(outcome.removed, vec![FileId(0), FileId(2)]);
        assert!(session.is_resolved(&group));
        assert!(session.is_deleted(&group, FileId(0)));
        assert!(session.is_deleted(&group, FileId(2)));
        assert!(!session.is_deleted(&group, FileId(1)));
    }

    #[test]
    fn test_recommendation_invalidated_by_membership_change() {
        let mut group = make_group(3);
        group.files[0].version = Some("3.0".to_string());
        let session = CleanupSession::new(std::slice::from_ref(&group));
        let recommender = Recommender::new();

        let rec = session.recommendation(&group, &recommender).unwrap();
        assert_eq!(rec.file_to_keep, FileId(0));

        // Deleting the recommended file invalidates the cached decision;
        // the next request recomputes over the shrunk membership.
        session.delete_file(&group, FileId(0)).unwrap();
        let rec = session.recommendation(&group, &recommender).unwrap();
        assert_ne!(rec.file_to_keep, FileId(0));
    }

    #[test]
    fn test_recommendation_rejected_below_two_live() {
        let group = make_group(2);
        let session = CleanupSession::new(std::slice::from_ref(&group));
        let recommender = Recommender::new();

        session.delete_file(&group, FileId(0)).unwrap();
        let err = session.recommendation(&group, &recommender).unwrap_err();
        assert!(matches!(err, SessionError::TooFewMembers { live: 1, .. }));
    }

    #[test]
    fn test_unknown_file_and_group() {
        let group = make_group(2);
        let other = make_group(2); // same hash, so make a distinct one
        let mut distinct = other.clone();
        distinct.hash = [2u8; 32];
        let session = CleanupSession::new(std::slice::from_ref(&group));

        assert!(matches!(
            session.delete_file(&group, FileId(99)),
            Err(SessionError::UnknownFile { .. })
        ));
        assert!(matches!(
            session.delete_file(&distinct, FileId(0)),
            Err(SessionError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_reset_restores_everything() {
        let group = make_group(2);
        let session = CleanupSession::new(std::slice::from_ref(&group));

        session.delete_file(&group, FileId(0)).unwrap();
        assert!(session.is_resolved(&group));

        session.reset();
        assert!(!session.is_resolved(&group));
        assert_eq!(session.live_members(&group).len(), 2);
    }

    #[test]
    fn test_mutations_serialize_per_group() {
        use std::sync::Arc;

        let group = Arc::new(make_group(64));
        let session = Arc::new(CleanupSession::new(std::slice::from_ref(&group)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let group = Arc::clone(&group);
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for i in 0..8 {
                        let id = FileId(t * 8 + i);
                        session.delete_file(&group, id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // All 64 members deleted exactly once, group resolved.
        assert_eq!(session.live_members(&group).len(), 0);
        assert!(session.is_resolved(&group));
    }
}
