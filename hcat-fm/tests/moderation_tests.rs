//! Integration tests for submission, review and stats over SQLite
//!
//! Tests cover:
//! - Single-decision lifecycle (pending → approved | rejected, once)
//! - Field and image merge on approval
//! - Failed approvals leave the record pending and the artifact untouched
//! - Stats grouping and the 7-day window

use std::sync::Arc;

use chrono::{Duration, Utc};
use hcat_common::models::{
    Artifact, ArtifactImage, Category, FeedbackStatus, FeedbackType, Identity, Role,
    SuggestedChanges, SuggestedImage,
};
use hcat_common::Error;
use hcat_fm::merge;
use hcat_fm::moderation::{ModerationEngine, ReviewDecision};
use hcat_fm::stats::StatsAggregator;
use hcat_fm::store::{ArtifactStore, FeedbackStore, ReviewStamp, SqliteStore};
use hcat_fm::validator::{FeedbackDraft, SubmissionValidator};
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    _dir: TempDir,
    store: Arc<SqliteStore>,
    validator: SubmissionValidator,
    engine: ModerationEngine,
}

async fn setup() -> Harness {
    let dir = TempDir::new().unwrap();
    let pool = hcat_common::db::init_database(&dir.path().join("hcat.db"))
        .await
        .unwrap();
    let store = Arc::new(SqliteStore::new(pool));

    Harness {
        _dir: dir,
        validator: SubmissionValidator::new(store.clone()),
        engine: ModerationEngine::new(store.clone(), store.clone()),
        store,
    }
}

fn contributor() -> Identity {
    Identity {
        user_id: "u-contrib".to_string(),
        username: "tama".to_string(),
        role: Role::User,
    }
}

fn elder() -> Identity {
    Identity {
        user_id: "u-elder".to_string(),
        username: "whaea".to_string(),
        role: Role::Elder,
    }
}

fn sample_artifact() -> Artifact {
    Artifact {
        id: Uuid::new_v4(),
        name: "Hand adze".to_string(),
        description: "Stone adze with lashing".to_string(),
        category: Category::Tools,
        tags: vec!["stone".to_string(), "lashing".to_string()],
        location: Some("Ōtaki".to_string()),
        images: Vec::new(),
        image_url: None,
        status: "published".to_string(),
    }
}

fn with_primary(mut artifact: Artifact) -> Artifact {
    artifact.images.push(ArtifactImage {
        url: "https://cdn.example/orig.jpg".to_string(),
        public_id: Some("orig".to_string()),
        is_primary: true,
    });
    artifact.image_url = Some("https://cdn.example/orig.jpg".to_string());
    artifact
}

fn image(url: &str) -> SuggestedImage {
    SuggestedImage {
        url: url.to_string(),
        public_id: None,
    }
}

async fn submit(
    h: &Harness,
    artifact_id: Uuid,
    changes: SuggestedChanges,
    images: Vec<SuggestedImage>,
) -> Uuid {
    let draft = h
        .validator
        .validate(artifact_id, "edit_suggestion", Some(changes), Some(images))
        .await
        .unwrap();
    h.store
        .insert_feedback(&draft, &contributor(), Utc::now())
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_submission_persisted_pending_with_submitter() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        name: Some("  Toki  ".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, Vec::new()).await;

    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);
    assert_eq!(feedback.artifact_id, artifact.id);
    assert_eq!(feedback.user_id, "u-contrib");
    assert_eq!(feedback.username, "tama");
    assert_eq!(feedback.feedback_type, FeedbackType::EditSuggestion);
    assert_eq!(feedback.suggested_changes.name.as_deref(), Some("Toki"));
    assert!(feedback.reviewed_by.is_none());
    assert!(feedback.reviewed_at.is_none());
}

#[tokio::test]
async fn test_submission_for_unknown_artifact_is_not_found() {
    let h = setup().await;

    let err = h
        .validator
        .validate(
            Uuid::new_v4(),
            "general",
            None,
            Some(vec![image("https://cdn.example/a.jpg")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_empty_submission_is_validation_error() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let err = h
        .validator
        .validate(artifact.id, "general", Some(SuggestedChanges::default()), Some(Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_approve_category_change() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        category: Some("pottery".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, Vec::new()).await;

    let outcome = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), Some("confirmed".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.feedback.status, FeedbackStatus::Approved);
    assert_eq!(outcome.feedback.reviewed_by.as_deref(), Some("u-elder"));
    assert_eq!(outcome.feedback.review_note.as_deref(), Some("confirmed"));
    assert!(outcome.feedback.reviewed_at.is_some());

    let updated = outcome.updated_artifact.unwrap();
    assert_eq!(updated.category, Category::Pottery);
    assert_eq!(updated.name, artifact.name);
    assert_eq!(updated.tags, artifact.tags);

    let stored = h.store.get_artifact(artifact.id).await.unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_approve_replaces_tags_wholesale() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        tags: Some(vec!["a".to_string(), "b".to_string()]),
        additional_info: Some("seen at the marae".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, Vec::new()).await;

    let outcome = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap();

    let updated = outcome.updated_artifact.unwrap();
    assert_eq!(updated.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(updated.description, artifact.description);
}

#[tokio::test]
async fn test_approve_images_promotes_first_when_no_primary() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let id = submit(
        &h,
        artifact.id,
        SuggestedChanges::default(),
        vec![image("https://cdn.example/a.jpg"), image("https://cdn.example/b.jpg")],
    )
    .await;

    let updated = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap()
        .updated_artifact
        .unwrap();

    assert_eq!(updated.images.len(), 2);
    assert_eq!(updated.image_url.as_deref(), Some("https://cdn.example/a.jpg"));
    assert!(updated.images[0].is_primary);
    assert!(!updated.images[1].is_primary);
}

#[tokio::test]
async fn test_approve_images_keeps_existing_primary() {
    let h = setup().await;
    let artifact = with_primary(sample_artifact());
    h.store.insert_artifact(&artifact).await.unwrap();

    let id = submit(
        &h,
        artifact.id,
        SuggestedChanges::default(),
        vec![image("https://cdn.example/b.jpg")],
    )
    .await;

    let updated = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap()
        .updated_artifact
        .unwrap();

    assert_eq!(updated.image_url, artifact.image_url);
    assert_eq!(updated.images.len(), 2);
    assert!(updated.images[0].is_primary);
    assert_eq!(updated.images[1].url, "https://cdn.example/b.jpg");
    assert!(!updated.images[1].is_primary);
}

#[tokio::test]
async fn test_reject_records_stamp_without_touching_artifact() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        name: Some("Wrong name".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, vec![image("https://cdn.example/x.jpg")]).await;

    let outcome = h
        .engine
        .review(id, ReviewDecision::Rejected, &elder(), Some("   ".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.feedback.status, FeedbackStatus::Rejected);
    assert_eq!(outcome.feedback.reviewed_by.as_deref(), Some("u-elder"));
    assert_eq!(outcome.feedback.review_note, None);
    assert!(outcome.updated_artifact.is_none());

    let stored = h.store.get_artifact(artifact.id).await.unwrap().unwrap();
    assert_eq!(stored, artifact);
}

#[tokio::test]
async fn test_second_review_is_invalid_state() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        name: Some("Toki pou tangata".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, vec![image("https://cdn.example/a.jpg")]).await;

    h.engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap();
    let after_first = h.store.get_artifact(artifact.id).await.unwrap().unwrap();

    for decision in [ReviewDecision::Rejected, ReviewDecision::Approved] {
        let err = h
            .engine
            .review(id, decision, &elder(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);
    }

    // No second merge: images not appended twice
    let after_retry = h.store.get_artifact(artifact.id).await.unwrap().unwrap();
    assert_eq!(after_retry, after_first);
    assert_eq!(after_retry.images.len(), 1);

    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Approved);
}

#[tokio::test]
async fn test_review_unknown_feedback_is_not_found() {
    let h = setup().await;

    for decision in [ReviewDecision::Approved, ReviewDecision::Rejected] {
        let err = h
            .engine
            .review(Uuid::new_v4(), decision, &elder(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    }
}

#[tokio::test]
async fn test_non_curator_cannot_review() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        location: Some("Rangiātea".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, Vec::new()).await;

    let err = h
        .engine
        .review(id, ReviewDecision::Approved, &contributor(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "got {:?}", err);

    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);
}

#[tokio::test]
async fn test_admin_may_review() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let id = submit(
        &h,
        artifact.id,
        SuggestedChanges {
            description: Some("Basalt adze".to_string()),
            ..Default::default()
        },
        Vec::new(),
    )
    .await;

    let admin = Identity {
        user_id: "u-admin".to_string(),
        username: "admin".to_string(),
        role: Role::Admin,
    };
    let outcome = h
        .engine
        .review(id, ReviewDecision::Approved, &admin, None)
        .await
        .unwrap();
    assert_eq!(outcome.updated_artifact.unwrap().description, "Basalt adze");
}

#[tokio::test]
async fn test_approval_of_deleted_artifact_fails_and_stays_pending() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let id = submit(&h, artifact.id, changes, Vec::new()).await;

    sqlx::query("DELETE FROM artifacts WHERE id = ?")
        .bind(artifact.id.to_string())
        .execute(h.store.pool())
        .await
        .unwrap();

    let err = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);

    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);

    // Rejection needs no artifact
    let outcome = h
        .engine
        .review(id, ReviewDecision::Rejected, &elder(), None)
        .await
        .unwrap();
    assert_eq!(outcome.feedback.status, FeedbackStatus::Rejected);
}

#[tokio::test]
async fn test_commit_approval_rolls_back_claim_when_artifact_missing() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let changes = SuggestedChanges {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let images = vec![image("https://cdn.example/late.jpg")];
    let id = submit(&h, artifact.id, changes.clone(), images.clone()).await;
    let patch = merge::plan(&changes, &images).unwrap();

    // Artifact disappears between planning and commit
    sqlx::query("DELETE FROM artifacts WHERE id = ?")
        .bind(artifact.id.to_string())
        .execute(h.store.pool())
        .await
        .unwrap();

    let stamp = ReviewStamp {
        reviewed_by: "u-elder".to_string(),
        review_note: Some("looks right".to_string()),
        reviewed_at: Utc::now(),
    };
    let err = h
        .store
        .commit_approval(id, artifact.id, &stamp, &patch)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);

    // The status claim ran first and must have been undone with the patch
    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);
    assert!(feedback.reviewed_by.is_none());
    assert!(feedback.review_note.is_none());
    assert!(feedback.reviewed_at.is_none());

    let images_left: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM artifact_images WHERE artifact_id = ?")
            .bind(artifact.id.to_string())
            .fetch_one(h.store.pool())
            .await
            .unwrap();
    assert_eq!(images_left, 0);

    // Still claimable by a later decision
    let rejected = h.store.commit_rejection(id, &stamp).await.unwrap();
    assert_eq!(rejected.status, FeedbackStatus::Rejected);
    assert_eq!(rejected.reviewed_by.as_deref(), Some("u-elder"));
}

#[tokio::test]
async fn test_unmergeable_proposal_leaves_everything_untouched() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    // Bypass the validator to persist a category the merge must refuse
    let draft = FeedbackDraft {
        artifact_id: artifact.id,
        feedback_type: FeedbackType::Correction,
        suggested_changes: SuggestedChanges {
            name: Some("Should not land".to_string()),
            category: Some("spaceships".to_string()),
            ..Default::default()
        },
        suggested_images: vec![image("https://cdn.example/a.jpg")],
    };
    let id = h
        .store
        .insert_feedback(&draft, &contributor(), Utc::now())
        .await
        .unwrap()
        .id;

    let err = h
        .engine
        .review(id, ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "got {:?}", err);

    let feedback = h.store.get_feedback(id).await.unwrap().unwrap();
    assert_eq!(feedback.status, FeedbackStatus::Pending);
    assert!(feedback.reviewed_by.is_none());

    let stored = h.store.get_artifact(artifact.id).await.unwrap().unwrap();
    assert_eq!(stored, artifact);
}

#[tokio::test]
async fn test_stats_group_counts_and_recent_window() {
    let h = setup().await;
    let artifact = sample_artifact();
    h.store.insert_artifact(&artifact).await.unwrap();

    let now = Utc::now();
    let mut ids = Vec::new();
    for (feedback_type, age_days) in [
        (FeedbackType::EditSuggestion, 0),
        (FeedbackType::NewInfo, 1),
        (FeedbackType::NewInfo, 6),
        (FeedbackType::General, 8),
        (FeedbackType::Correction, 30),
    ] {
        let draft = FeedbackDraft {
            artifact_id: artifact.id,
            feedback_type,
            suggested_changes: SuggestedChanges {
                additional_info: Some("context".to_string()),
                ..Default::default()
            },
            suggested_images: Vec::new(),
        };
        let feedback = h
            .store
            .insert_feedback(&draft, &contributor(), now - Duration::days(age_days))
            .await
            .unwrap();
        ids.push(feedback.id);
    }

    h.engine
        .review(ids[0], ReviewDecision::Approved, &elder(), None)
        .await
        .unwrap();
    h.engine
        .review(ids[3], ReviewDecision::Rejected, &elder(), None)
        .await
        .unwrap();

    let stats = StatsAggregator::new(h.store.clone())
        .get_stats_at(now)
        .await
        .unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.recent_week, 3);
    assert_eq!(stats.by_status.pending, 3);
    assert_eq!(stats.by_status.approved, 1);
    assert_eq!(stats.by_status.rejected, 1);
    assert_eq!(stats.by_status.sum(), stats.total);
    assert_eq!(stats.by_type.edit_suggestion, 1);
    assert_eq!(stats.by_type.new_info, 2);
    assert_eq!(stats.by_type.general, 1);
    assert_eq!(stats.by_type.correction, 1);
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let h = setup().await;
    let stats = StatsAggregator::new(h.store.clone()).get_stats().await.unwrap();

    assert_eq!(stats.total, 0);
    assert_eq!(stats.recent_week, 0);
    assert_eq!(stats.by_status.sum(), 0);
}
