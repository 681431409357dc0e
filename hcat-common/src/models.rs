//! Domain models shared by catalog services
//!
//! Wire format is camelCase JSON; enum values are snake_case strings, which
//! are also the values persisted in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

// ========================================
// Artifact
// ========================================

/// Fixed set of artifact categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pottery,
    Tools,
    Weaving,
    Carving,
    Jewelry,
    Clothing,
    Weapons,
    MusicalInstruments,
    Ceremonial,
    Household,
    Artwork,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Pottery,
        Category::Tools,
        Category::Weaving,
        Category::Carving,
        Category::Jewelry,
        Category::Clothing,
        Category::Weapons,
        Category::MusicalInstruments,
        Category::Ceremonial,
        Category::Household,
        Category::Artwork,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pottery => "pottery",
            Category::Tools => "tools",
            Category::Weaving => "weaving",
            Category::Carving => "carving",
            Category::Jewelry => "jewelry",
            Category::Clothing => "clothing",
            Category::Weapons => "weapons",
            Category::MusicalInstruments => "musical_instruments",
            Category::Ceremonial => "ceremonial",
            Category::Household => "household",
            Category::Artwork => "artwork",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::validation("category", format!("unknown category '{}'", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image attached to an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    pub is_primary: bool,
}

/// Canonical catalog record
///
/// Invariant: at most one entry of `images` has `is_primary == true`, and
/// when one does, `image_url` points at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    /// Ordered set, replaced whole on update
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub images: Vec<ArtifactImage>,
    pub image_url: Option<String>,
    pub status: String,
}

impl Artifact {
    /// The current primary image, if any
    pub fn primary_image(&self) -> Option<&ArtifactImage> {
        self.images.iter().find(|img| img.is_primary)
    }

    /// True when the artifact has a primary image or an image URL pointer
    pub fn has_primary(&self) -> bool {
        self.image_url.is_some() || self.primary_image().is_some()
    }
}

// ========================================
// Feedback
// ========================================

/// Kind of contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    EditSuggestion,
    NewInfo,
    Correction,
    General,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 4] = [
        FeedbackType::EditSuggestion,
        FeedbackType::NewInfo,
        FeedbackType::Correction,
        FeedbackType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::EditSuggestion => "edit_suggestion",
            FeedbackType::NewInfo => "new_info",
            FeedbackType::Correction => "correction",
            FeedbackType::General => "general",
        }
    }
}

impl FromStr for FeedbackType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeedbackType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::validation("feedbackType", format!("unknown feedback type '{}'", s))
            })
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    Approved,
    Rejected,
}

impl FeedbackStatus {
    pub const ALL: [FeedbackStatus; 3] = [
        FeedbackStatus::Pending,
        FeedbackStatus::Approved,
        FeedbackStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Approved => "approved",
            FeedbackStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FeedbackStatus::Pending)
    }
}

impl FromStr for FeedbackStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeedbackStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::validation("status", format!("unknown status '{}'", s)))
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial field patch proposed by a contributor
///
/// Every slot is independently optional. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Context for curators only, never merged into the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn trimmed(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl SuggestedChanges {
    /// True when at least one slot is present and non-blank
    pub fn has_changes(&self) -> bool {
        is_present(&self.name)
            || is_present(&self.description)
            || is_present(&self.category)
            || is_present(&self.location)
            || is_present(&self.additional_info)
            || self
                .tags
                .as_ref()
                .is_some_and(|tags| tags.iter().any(|t| !t.trim().is_empty()))
    }

    /// Trim every string, drop blank slots and blank or repeated tags
    pub fn normalized(self) -> Self {
        let tags = self.tags.and_then(|tags| {
            let mut out: Vec<String> = Vec::with_capacity(tags.len());
            for tag in tags {
                let tag = tag.trim();
                if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                    out.push(tag.to_string());
                }
            }
            (!out.is_empty()).then_some(out)
        });

        Self {
            name: trimmed(self.name),
            description: trimmed(self.description),
            category: trimmed(self.category),
            tags,
            location: trimmed(self.location),
            additional_info: trimmed(self.additional_info),
        }
    }
}

/// Already-uploaded image proposed for an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

/// Contributor-submitted proposal bound to one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub user_id: String,
    pub username: String,
    pub feedback_type: FeedbackType,
    pub status: FeedbackStatus,
    pub suggested_changes: SuggestedChanges,
    pub suggested_images: Vec<SuggestedImage>,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ========================================
// Identity
// ========================================

/// Caller role as issued by the authentication collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Elder,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Elder => "elder",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "elder" => Ok(Role::Elder),
            "admin" => Ok(Role::Admin),
            other => Err(Error::validation("role", format!("unknown role '{}'", other))),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// Curators (admin, elder) may review feedback
    pub fn is_curator(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Elder)
    }
}
