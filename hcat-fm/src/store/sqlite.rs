//! SQLite-backed artifact and feedback stores
//!
//! Review commits run inside one transaction whose first statement is the
//! conditional status update, so the write lock is taken before anything is
//! read and concurrent reviews serialize on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hcat_common::models::{
    Artifact, ArtifactImage, Feedback, FeedbackStatus, FeedbackType, Identity, SuggestedChanges,
    SuggestedImage,
};
use hcat_common::time::{parse_db_timestamp, to_db_timestamp};
use hcat_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{ArtifactStore, FeedbackFilter, FeedbackStore, FeedbackTally, ReviewStamp};
use crate::merge::ArtifactPatch;
use crate::validator::FeedbackDraft;

const FEEDBACK_COLUMNS: &str = "id, artifact_id, user_id, username, feedback_type, status, \
     suggested_changes, suggested_images, reviewed_by, review_note, reviewed_at, created_at";

/// Implements both [`ArtifactStore`] and [`FeedbackStore`] over one pool
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Insert an artifact with its images
    ///
    /// Artifact CRUD belongs to the catalog service; this exists for
    /// provisioning and tests.
    pub async fn insert_artifact(&self, artifact: &Artifact) -> Result<()> {
        let now = to_db_timestamp(&Utc::now());
        let tags = serde_json::to_string(&artifact.tags)
            .map_err(|e| Error::Internal(format!("Failed to serialize tags: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO artifacts (
                id, name, description, category, tags, location,
                image_url, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(artifact.id.to_string())
        .bind(&artifact.name)
        .bind(&artifact.description)
        .bind(artifact.category.as_str())
        .bind(&tags)
        .bind(&artifact.location)
        .bind(&artifact.image_url)
        .bind(&artifact.status)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for (position, image) in artifact.images.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO artifact_images (artifact_id, position, url, public_id, is_primary)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(artifact.id.to_string())
            .bind(position as i64)
            .bind(&image.url)
            .bind(&image.public_id)
            .bind(image.is_primary)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid {} '{}': {}", column, value, e)))
}

fn decode_json<T: serde::de::DeserializeOwned>(value: &str, column: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

fn encode_json<T: serde::Serialize>(value: &T, column: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", column, e)))
}

fn feedback_from_row(row: &SqliteRow) -> Result<Feedback> {
    let id: String = row.get("id");
    let artifact_id: String = row.get("artifact_id");
    let feedback_type: String = row.get("feedback_type");
    let status: String = row.get("status");
    let changes: String = row.get("suggested_changes");
    let images: String = row.get("suggested_images");
    let reviewed_at: Option<String> = row.get("reviewed_at");
    let created_at: String = row.get("created_at");

    Ok(Feedback {
        id: parse_uuid(&id, "feedback id")?,
        artifact_id: parse_uuid(&artifact_id, "artifact_id")?,
        user_id: row.get("user_id"),
        username: row.get("username"),
        feedback_type: feedback_type
            .parse()
            .map_err(|_| Error::Internal(format!("Stored feedback_type '{}'", feedback_type)))?,
        status: status
            .parse()
            .map_err(|_| Error::Internal(format!("Stored status '{}'", status)))?,
        suggested_changes: decode_json::<SuggestedChanges>(&changes, "suggested_changes")?,
        suggested_images: decode_json::<Vec<SuggestedImage>>(&images, "suggested_images")?,
        reviewed_by: row.get("reviewed_by"),
        review_note: row.get("review_note"),
        reviewed_at: reviewed_at.as_deref().map(parse_db_timestamp).transpose()?,
        created_at: parse_db_timestamp(&created_at)?,
    })
}

async fn fetch_feedback(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Feedback>> {
    let sql = format!("SELECT {} FROM feedback WHERE id = ?", FEEDBACK_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(feedback_from_row).transpose()
}

async fn fetch_artifact(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Artifact>> {
    let row = sqlx::query(
        r#"
        SELECT name, description, category, tags, location, image_url, status
        FROM artifacts
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let images = sqlx::query(
        "SELECT url, public_id, is_primary FROM artifact_images WHERE artifact_id = ? ORDER BY position",
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|r| ArtifactImage {
        url: r.get("url"),
        public_id: r.get("public_id"),
        is_primary: r.get("is_primary"),
    })
    .collect();

    let category: String = row.get("category");
    let tags: String = row.get("tags");

    Ok(Some(Artifact {
        id,
        name: row.get("name"),
        description: row.get("description"),
        category: category
            .parse()
            .map_err(|_| Error::Internal(format!("Stored category '{}'", category)))?,
        tags: decode_json(&tags, "tags")?,
        location: row.get("location"),
        images,
        image_url: row.get("image_url"),
        status: row.get("status"),
    }))
}

/// Compare-and-swap `pending → status`
///
/// On a miss, reports whether the record is absent or already decided.
async fn claim_pending(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: FeedbackStatus,
    stamp: &ReviewStamp,
) -> Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE feedback
        SET status = ?, reviewed_by = ?, review_note = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(&stamp.reviewed_by)
    .bind(&stamp.review_note)
    .bind(to_db_timestamp(&stamp.reviewed_at))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 1 {
        return Ok(());
    }

    let current: Option<String> = sqlx::query_scalar("SELECT status FROM feedback WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    Err(match current {
        None => Error::NotFound(format!("Feedback {} not found", id)),
        Some(current) => Error::InvalidState(format!("Feedback {} has already been {}", id, current)),
    })
}

/// Apply field sets and image appends to one artifact
async fn apply_artifact_patch(
    conn: &mut SqliteConnection,
    artifact_id: Uuid,
    patch: &ArtifactPatch,
) -> Result<()> {
    let artifact_key = artifact_id.to_string();
    let tags = patch
        .tags
        .as_ref()
        .map(|tags| encode_json(tags, "tags"))
        .transpose()?;

    // Absent slots bind NULL and keep the current column value
    let updated = sqlx::query(
        r#"
        UPDATE artifacts
        SET name = COALESCE(?, name),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            tags = COALESCE(?, tags),
            location = COALESCE(?, location),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.category.map(|c| c.as_str()))
    .bind(tags.as_deref())
    .bind(patch.location.as_deref())
    .bind(to_db_timestamp(&Utc::now()))
    .bind(&artifact_key)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("Artifact {} no longer exists", artifact_id)));
    }

    let mut first_appended: Option<(i64, &str)> = None;
    for image in &patch.new_images {
        let image_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO artifact_images (artifact_id, position, url, public_id, is_primary)
            SELECT ?, COALESCE(MAX(position), -1) + 1, ?, ?, 0
            FROM artifact_images
            WHERE artifact_id = ?
            RETURNING id
            "#,
        )
        .bind(&artifact_key)
        .bind(&image.url)
        .bind(&image.public_id)
        .bind(&artifact_key)
        .fetch_one(&mut *conn)
        .await?;

        if first_appended.is_none() {
            first_appended = Some((image_id, image.url.as_str()));
        }
    }

    let Some((image_id, url)) = first_appended else {
        return Ok(());
    };

    // Promote only when the artifact has neither a primary image nor an image URL
    let promoted = sqlx::query(
        r#"
        UPDATE artifact_images
        SET is_primary = 1
        WHERE id = ?
          AND NOT EXISTS (
              SELECT 1 FROM artifact_images WHERE artifact_id = ? AND is_primary = 1
          )
          AND EXISTS (
              SELECT 1 FROM artifacts WHERE id = ? AND image_url IS NULL
          )
        "#,
    )
    .bind(image_id)
    .bind(&artifact_key)
    .bind(&artifact_key)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if promoted == 1 {
        sqlx::query("UPDATE artifacts SET image_url = ? WHERE id = ? AND image_url IS NULL")
            .bind(url)
            .bind(&artifact_key)
            .execute(&mut *conn)
            .await?;
        debug!(artifact_id = %artifact_id, "Promoted appended image to primary");
    }

    Ok(())
}

/// WHERE clause and its string binds for a listing filter
fn filter_clause(filter: &FeedbackFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(feedback_type) = filter.feedback_type {
        conditions.push("feedback_type = ?");
        binds.push(feedback_type.as_str().to_string());
    }
    if let Some(artifact_id) = filter.artifact_id {
        conditions.push("artifact_id = ?");
        binds.push(artifact_id.to_string());
    }
    if let Some(user_id) = &filter.user_id {
        conditions.push("user_id = ?");
        binds.push(user_id.clone());
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>> {
        // Row and images from one snapshot
        let mut tx = self.db.begin().await?;
        let artifact = fetch_artifact(&mut tx, id).await?;
        tx.commit().await?;
        Ok(artifact)
    }

    async fn artifact_exists(&self, id: Uuid) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM artifacts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    async fn insert_feedback(
        &self,
        draft: &FeedbackDraft,
        submitter: &Identity,
        created_at: DateTime<Utc>,
    ) -> Result<Feedback> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO feedback (
                id, artifact_id, user_id, username, feedback_type, status,
                suggested_changes, suggested_images, created_at
            ) VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(draft.artifact_id.to_string())
        .bind(&submitter.user_id)
        .bind(&submitter.username)
        .bind(draft.feedback_type.as_str())
        .bind(encode_json(&draft.suggested_changes, "suggested_changes")?)
        .bind(encode_json(&draft.suggested_images, "suggested_images")?)
        .bind(to_db_timestamp(&created_at))
        .execute(&self.db)
        .await?;

        self.get_feedback(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Feedback {} vanished after insert", id)))
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>> {
        let mut conn = self.db.acquire().await?;
        fetch_feedback(&mut conn, id).await
    }

    async fn count_feedback(&self, filter: &FeedbackFilter) -> Result<i64> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM feedback{}", clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        Ok(query.fetch_one(&self.db).await?)
    }

    async fn list_feedback(
        &self,
        filter: &FeedbackFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Feedback>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM feedback{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            FEEDBACK_COLUMNS, clause
        );

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(feedback_from_row).collect()
    }

    async fn tally(&self, since: DateTime<Utc>) -> Result<FeedbackTally> {
        let mut tx = self.db.begin().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
            .fetch_one(&mut *tx)
            .await?;

        let recent: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE created_at >= ?")
            .bind(to_db_timestamp(&since))
            .fetch_one(&mut *tx)
            .await?;

        let status_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM feedback GROUP BY status")
                .fetch_all(&mut *tx)
                .await?;

        let type_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT feedback_type, COUNT(*) FROM feedback GROUP BY feedback_type")
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        let by_status = status_rows
            .into_iter()
            .map(|(status, count)| {
                status
                    .parse::<FeedbackStatus>()
                    .map(|s| (s, count))
                    .map_err(|_| Error::Internal(format!("Stored status '{}'", status)))
            })
            .collect::<Result<Vec<_>>>()?;

        let by_type = type_rows
            .into_iter()
            .map(|(feedback_type, count)| {
                feedback_type
                    .parse::<FeedbackType>()
                    .map(|t| (t, count))
                    .map_err(|_| Error::Internal(format!("Stored feedback_type '{}'", feedback_type)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeedbackTally {
            total,
            recent,
            by_status,
            by_type,
        })
    }

    async fn commit_rejection(&self, id: Uuid, stamp: &ReviewStamp) -> Result<Feedback> {
        let mut tx = self.db.begin().await?;

        claim_pending(&mut tx, id, FeedbackStatus::Rejected, stamp).await?;

        let feedback = fetch_feedback(&mut tx, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Feedback {} vanished during review", id)))?;

        tx.commit().await?;
        Ok(feedback)
    }

    async fn commit_approval(
        &self,
        id: Uuid,
        artifact_id: Uuid,
        stamp: &ReviewStamp,
        patch: &ArtifactPatch,
    ) -> Result<(Feedback, Artifact)> {
        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.db.begin().await?;

        claim_pending(&mut tx, id, FeedbackStatus::Approved, stamp).await?;
        apply_artifact_patch(&mut tx, artifact_id, patch).await?;

        let feedback = fetch_feedback(&mut tx, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Feedback {} vanished during review", id)))?;
        let artifact = fetch_artifact(&mut tx, artifact_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Artifact {} no longer exists", artifact_id)))?;

        tx.commit().await?;
        Ok((feedback, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clause_empty() {
        let (clause, binds) = filter_clause(&FeedbackFilter::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn test_filter_clause_combines_conditions() {
        let filter = FeedbackFilter {
            status: Some(FeedbackStatus::Pending),
            feedback_type: Some(FeedbackType::Correction),
            artifact_id: None,
            user_id: Some("u-1".to_string()),
        };
        let (clause, binds) = filter_clause(&filter);
        assert_eq!(
            clause,
            " WHERE status = ? AND feedback_type = ? AND user_id = ?"
        );
        assert_eq!(binds, vec!["pending", "correction", "u-1"]);
    }
}
