//! Review state machine
//!
//! `Pending` is the only state with outgoing transitions:
//!
//! ```text
//! Pending ──approve──> Approved
//!    └─────reject────> Rejected
//! ```
//!
//! The transition is claimed by the store's conditional status update, so a
//! record that already left `Pending` fails `InvalidState` and is never
//! merged twice.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use hcat_common::models::{Artifact, Feedback, FeedbackStatus, Identity};
use hcat_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::merge;
use crate::store::{ArtifactStore, FeedbackStore, ReviewStamp};

/// A curator's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl FromStr for ReviewDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "approved" => Ok(ReviewDecision::Approved),
            "rejected" => Ok(ReviewDecision::Rejected),
            other => Err(Error::validation(
                "status",
                format!("decision must be 'approved' or 'rejected', got '{}'", other),
            )),
        }
    }
}

impl From<ReviewDecision> for FeedbackStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => FeedbackStatus::Approved,
            ReviewDecision::Rejected => FeedbackStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(FeedbackStatus::from(*self).as_str())
    }
}

/// Result of a successful review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub feedback: Feedback,
    /// Present only for approvals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_artifact: Option<Artifact>,
}

pub struct ModerationEngine {
    feedback: Arc<dyn FeedbackStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl ModerationEngine {
    pub fn new(feedback: Arc<dyn FeedbackStore>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            feedback,
            artifacts,
        }
    }

    /// Decide a pending feedback record
    ///
    /// Errors: `Forbidden` for non-curators, `NotFound` for an unknown
    /// feedback id or a vanished artifact, `InvalidState` once the record is
    /// decided, `Validation` when the proposal cannot be merged. Any failure
    /// leaves the record `Pending` and the artifact untouched.
    pub async fn review(
        &self,
        feedback_id: Uuid,
        decision: ReviewDecision,
        reviewer: &Identity,
        note: Option<String>,
    ) -> Result<ReviewOutcome> {
        if !reviewer.is_curator() {
            return Err(Error::Forbidden(format!(
                "role '{}' may not review feedback",
                reviewer.role.as_str()
            )));
        }

        let stamp = ReviewStamp {
            reviewed_by: reviewer.user_id.clone(),
            review_note: note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            reviewed_at: Utc::now(),
        };

        let outcome = match decision {
            ReviewDecision::Rejected => {
                let feedback = self.feedback.commit_rejection(feedback_id, &stamp).await?;
                ReviewOutcome {
                    feedback,
                    updated_artifact: None,
                }
            }
            ReviewDecision::Approved => self.approve(feedback_id, &stamp).await?,
        };

        info!(
            feedback_id = %feedback_id,
            artifact_id = %outcome.feedback.artifact_id,
            decision = %decision,
            reviewer = %reviewer.user_id,
            "Feedback reviewed"
        );

        Ok(outcome)
    }

    async fn approve(&self, feedback_id: Uuid, stamp: &ReviewStamp) -> Result<ReviewOutcome> {
        let feedback = self
            .feedback
            .get_feedback(feedback_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", feedback_id)))?;

        // Early exit only; the conditional update in the commit decides races
        if feedback.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "Feedback {} has already been {}",
                feedback_id, feedback.status
            )));
        }

        let artifact = self
            .artifacts
            .get_artifact(feedback.artifact_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    feedback_id = %feedback_id,
                    artifact_id = %feedback.artifact_id,
                    "Approval target artifact no longer exists"
                );
                Error::NotFound(format!("Artifact {} not found", feedback.artifact_id))
            })?;

        let patch = merge::plan(&feedback.suggested_changes, &feedback.suggested_images)?;
        merge::apply_patch(&artifact, &patch)?;
        debug!(
            feedback_id = %feedback_id,
            new_images = patch.new_images.len(),
            fields_unchanged = patch.is_empty(),
            "Merge planned"
        );

        let (feedback, artifact) = self
            .feedback
            .commit_approval(feedback_id, feedback.artifact_id, stamp, &patch)
            .await?;

        Ok(ReviewOutcome {
            feedback,
            updated_artifact: Some(artifact),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parsing() {
        assert_eq!("approved".parse::<ReviewDecision>().unwrap(), ReviewDecision::Approved);
        assert_eq!(" rejected ".parse::<ReviewDecision>().unwrap(), ReviewDecision::Rejected);

        for bad in ["pending", "APPROVED", "", "maybe"] {
            let err = bad.parse::<ReviewDecision>().unwrap_err();
            assert!(
                matches!(err, Error::Validation { ref field, .. } if field == "status"),
                "{:?} should fail validation",
                bad
            );
        }
    }

    #[test]
    fn test_decision_maps_to_terminal_status() {
        assert_eq!(FeedbackStatus::from(ReviewDecision::Approved), FeedbackStatus::Approved);
        assert_eq!(FeedbackStatus::from(ReviewDecision::Rejected), FeedbackStatus::Rejected);
        assert!(FeedbackStatus::from(ReviewDecision::Approved).is_terminal());
    }
}
