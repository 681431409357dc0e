//! Repository interfaces for artifacts and feedback
//!
//! Components receive these as `Arc<dyn …>` so tests and alternative
//! backends can be injected. [`SqliteStore`] implements both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hcat_common::models::{Artifact, Feedback, FeedbackStatus, FeedbackType, Identity};
use hcat_common::Result;
use uuid::Uuid;

use crate::merge::ArtifactPatch;
use crate::validator::FeedbackDraft;

mod sqlite;
pub use sqlite::SqliteStore;

/// Reviewer metadata written alongside a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewStamp {
    pub reviewed_by: String,
    pub review_note: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Optional constraints for feedback listings; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub feedback_type: Option<FeedbackType>,
    pub artifact_id: Option<Uuid>,
    pub user_id: Option<String>,
}

/// Grouped counts taken from a single read snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackTally {
    pub total: i64,
    /// Records created at or after the `since` bound passed to [`FeedbackStore::tally`]
    pub recent: i64,
    pub by_status: Vec<(FeedbackStatus, i64)>,
    pub by_type: Vec<(FeedbackType, i64)>,
}

/// Read access to externally owned artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>>;

    async fn artifact_exists(&self, id: Uuid) -> Result<bool>;
}

/// Feedback persistence and lifecycle
///
/// Contract:
/// - New records are always persisted `Pending`.
/// - `commit_rejection` and `commit_approval` are compare-and-swap on
///   `status = pending`; of any number of concurrent calls for one id at most
///   one succeeds, the rest fail `InvalidState`.
/// - `commit_approval` applies the artifact patch and the status change as
///   one unit: both persist or neither does.
/// - Records are never deleted.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(
        &self,
        draft: &FeedbackDraft,
        submitter: &Identity,
        created_at: DateTime<Utc>,
    ) -> Result<Feedback>;

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>>;

    async fn count_feedback(&self, filter: &FeedbackFilter) -> Result<i64>;

    /// Newest first
    async fn list_feedback(
        &self,
        filter: &FeedbackFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Feedback>>;

    async fn tally(&self, since: DateTime<Utc>) -> Result<FeedbackTally>;

    /// Pending → Rejected. `NotFound` for unknown ids, `InvalidState` otherwise.
    async fn commit_rejection(&self, id: Uuid, stamp: &ReviewStamp) -> Result<Feedback>;

    /// Pending → Approved plus the artifact patch, atomically.
    ///
    /// Images are appended after the artifact's current last image; the
    /// first appended image becomes primary only if the artifact has no
    /// primary at commit time. `NotFound` if the feedback or the artifact
    /// is missing; nothing is written on any failure.
    async fn commit_approval(
        &self,
        id: Uuid,
        artifact_id: Uuid,
        stamp: &ReviewStamp,
        patch: &ArtifactPatch,
    ) -> Result<(Feedback, Artifact)>;
}
