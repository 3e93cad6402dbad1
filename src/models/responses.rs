use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{MatchStatus, RoundStatus};

/// Aggregate statistics for one round and across all rounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingStatistics {
    pub round: Option<RoundStatistics>,
    pub overall: OverallStatistics,
    pub matches: MatchStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStatistics {
    pub id: Uuid,
    pub name: String,
    pub status: RoundStatus,
    pub total_students: usize,
    pub matched_students: usize,
    pub total_organizations: usize,
    pub match_percentage: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStatistics {
    pub total_rounds: usize,
    pub completed_rounds: usize,
    pub total_matches: usize,
    pub confirmed_matches: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total: usize,
    pub by_status: BTreeMap<MatchStatus, usize>,
    pub by_area: BTreeMap<String, usize>,
    pub average_score: f64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
