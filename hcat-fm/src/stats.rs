//! Feedback statistics

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hcat_common::models::{FeedbackStatus, FeedbackType};
use hcat_common::Result;
use serde::{Deserialize, Serialize};

use crate::store::{FeedbackStore, FeedbackTally};

/// Window for `recentWeek`
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn sum(&self) -> i64 {
        self.pending + self.approved + self.rejected
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub edit_suggestion: i64,
    pub new_info: i64,
    pub correction: i64,
    pub general: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total: i64,
    pub recent_week: i64,
    pub by_status: StatusCounts,
    pub by_type: TypeCounts,
}

/// Read-only aggregation over the feedback store
pub struct StatsAggregator {
    feedback: Arc<dyn FeedbackStore>,
}

impl StatsAggregator {
    pub fn new(feedback: Arc<dyn FeedbackStore>) -> Self {
        Self { feedback }
    }

    pub async fn get_stats(&self) -> Result<FeedbackStats> {
        self.get_stats_at(Utc::now()).await
    }

    /// Stats with the recent window ending at `now`
    pub async fn get_stats_at(&self, now: DateTime<Utc>) -> Result<FeedbackStats> {
        let since = now - Duration::days(RECENT_WINDOW_DAYS);
        let tally = self.feedback.tally(since).await?;
        Ok(aggregate(&tally))
    }
}

/// Fold grouped counts into fixed keys; missing groups stay 0
pub fn aggregate(tally: &FeedbackTally) -> FeedbackStats {
    let mut by_status = StatusCounts::default();
    for (status, count) in &tally.by_status {
        match status {
            FeedbackStatus::Pending => by_status.pending += count,
            FeedbackStatus::Approved => by_status.approved += count,
            FeedbackStatus::Rejected => by_status.rejected += count,
        }
    }

    let mut by_type = TypeCounts::default();
    for (feedback_type, count) in &tally.by_type {
        match feedback_type {
            FeedbackType::EditSuggestion => by_type.edit_suggestion += count,
            FeedbackType::NewInfo => by_type.new_info += count,
            FeedbackType::Correction => by_type.correction += count,
            FeedbackType::General => by_type.general += count,
        }
    }

    FeedbackStats {
        total: tally.total,
        recent_week: tally.recent,
        by_status,
        by_type,
    }
}
