//! Submission validation
//!
//! Turns a raw contributor proposal into a [`FeedbackDraft`] carrying only
//! the fields the contributor actually intends to change.

use std::sync::Arc;

use hcat_common::models::{Category, FeedbackType, SuggestedChanges, SuggestedImage};
use hcat_common::{Error, Result};
use uuid::Uuid;

use crate::store::ArtifactStore;

/// Normalized proposal ready to be persisted as `Pending`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub artifact_id: Uuid,
    pub feedback_type: FeedbackType,
    pub suggested_changes: SuggestedChanges,
    pub suggested_images: Vec<SuggestedImage>,
}

pub struct SubmissionValidator {
    artifacts: Arc<dyn ArtifactStore>,
}

impl SubmissionValidator {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }

    /// Validate a proposal against the referenced artifact
    ///
    /// The artifact lookup is the only side effect. Fails `NotFound` for an
    /// unknown artifact, `Validation` for an unknown feedback type or a
    /// proposal with neither changes nor images.
    pub async fn validate(
        &self,
        artifact_id: Uuid,
        feedback_type: &str,
        suggested_changes: Option<SuggestedChanges>,
        suggested_images: Option<Vec<SuggestedImage>>,
    ) -> Result<FeedbackDraft> {
        if !self.artifacts.artifact_exists(artifact_id).await? {
            return Err(Error::NotFound(format!("Artifact {} not found", artifact_id)));
        }

        normalize_submission(
            artifact_id,
            feedback_type,
            suggested_changes.unwrap_or_default(),
            suggested_images.unwrap_or_default(),
        )
    }
}

/// The store-independent part of validation
pub fn normalize_submission(
    artifact_id: Uuid,
    feedback_type: &str,
    suggested_changes: SuggestedChanges,
    suggested_images: Vec<SuggestedImage>,
) -> Result<FeedbackDraft> {
    let feedback_type: FeedbackType = feedback_type.trim().parse()?;

    let suggested_changes = suggested_changes.normalized();
    if let Some(category) = &suggested_changes.category {
        category.parse::<Category>()?;
    }

    let suggested_images = suggested_images
        .into_iter()
        .enumerate()
        .map(|(index, image)| normalize_image(index, image))
        .collect::<Result<Vec<_>>>()?;

    if !suggested_changes.has_changes() && suggested_images.is_empty() {
        return Err(Error::validation(
            "suggestedChanges",
            "a submission needs at least one suggested change or image",
        ));
    }

    Ok(FeedbackDraft {
        artifact_id,
        feedback_type,
        suggested_changes,
        suggested_images,
    })
}

fn normalize_image(index: usize, image: SuggestedImage) -> Result<SuggestedImage> {
    let url = image.url.trim();
    if url.is_empty() {
        return Err(Error::validation(
            format!("suggestedImages[{}].url", index),
            "image url must not be empty",
        ));
    }

    Ok(SuggestedImage {
        url: url.to_string(),
        public_id: image
            .public_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
    })
}
