//! Merge of approved proposals into artifacts
//!
//! Everything here is pure: no clock, no store, no randomness. The same
//! artifact and proposal always produce the same result.
//!
//! Field policy: name, description, category and location are replaced only
//! when the proposal carries a non-blank value. A non-empty tag list replaces
//! the artifact's tags wholesale. `additionalInfo` is never merged.
//!
//! Image policy: proposed images are appended as non-primary. When the
//! artifact has no primary image the first appended one is promoted and
//! `imageUrl` points at it; an existing primary is never replaced.

use hcat_common::models::{Artifact, ArtifactImage, Category, SuggestedChanges, SuggestedImage};
use hcat_common::{Error, Result};

/// Validated, typed form of an approved proposal
///
/// `None` slots leave the artifact's field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub new_images: Vec<SuggestedImage>,
}

impl ArtifactPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.location.is_none()
            && self.new_images.is_empty()
    }
}

/// Build the patch for a proposal, validating every value it would write
pub fn plan(changes: &SuggestedChanges, images: &[SuggestedImage]) -> Result<ArtifactPatch> {
    let changes = changes.clone().normalized();

    let category = changes
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let new_images = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
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
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ArtifactPatch {
        name: changes.name,
        description: changes.description,
        category,
        tags: changes.tags,
        location: changes.location,
        new_images,
    })
}

/// Apply a planned patch to an artifact
pub fn apply_patch(artifact: &Artifact, patch: &ArtifactPatch) -> Result<Artifact> {
    let mut patched = artifact.clone();

    if let Some(name) = &patch.name {
        patched.name = name.clone();
    }
    if let Some(description) = &patch.description {
        patched.description = description.clone();
    }
    if let Some(category) = patch.category {
        patched.category = category;
    }
    if let Some(tags) = &patch.tags {
        patched.tags = tags.clone();
    }
    if let Some(location) = &patch.location {
        patched.location = Some(location.clone());
    }

    let promote = !artifact.has_primary();
    for (index, image) in patch.new_images.iter().enumerate() {
        let is_primary = promote && index == 0;
        if is_primary {
            patched.image_url = Some(image.url.clone());
        }
        patched.images.push(ArtifactImage {
            url: image.url.clone(),
            public_id: image.public_id.clone(),
            is_primary,
        });
    }

    check_invariants(&patched)?;
    Ok(patched)
}

/// `plan` followed by `apply_patch`
pub fn apply(
    artifact: &Artifact,
    changes: &SuggestedChanges,
    images: &[SuggestedImage],
) -> Result<Artifact> {
    apply_patch(artifact, &plan(changes, images)?)
}

/// At most one primary image
pub fn check_invariants(artifact: &Artifact) -> Result<()> {
    let primaries = artifact.images.iter().filter(|img| img.is_primary).count();
    if primaries > 1 {
        return Err(Error::validation(
            "images",
            format!("artifact would have {} primary images", primaries),
        ));
    }
    Ok(())
}
