use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::ScoringWeights;

/// Request to create a matching round
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoundRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the configured algorithm when omitted
    #[serde(default, alias = "algorithm_type", rename = "algorithmType")]
    pub algorithm_type: Option<String>,
    /// Defaults to the configured weights when omitted
    #[serde(default)]
    pub settings: Option<ScoringWeights>,
}

/// Request to execute a round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMatchingRequest {
    #[serde(default, alias = "user_id", rename = "userId")]
    pub user_id: Option<String>,
}

/// Request to move a match through the approval workflow
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateMatchStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default, alias = "approver_id", rename = "approverId")]
    pub approver_id: Option<String>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query string for the statistics endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default, alias = "round_id", rename = "roundId")]
    pub round_id: Option<String>,
}

/// Pagination for round listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_round_validation() {
        let request: CreateRoundRequest =
            serde_json::from_str(r#"{"name":"","algorithmType":"weighted_preference"}"#).unwrap();
        assert!(request.validate().is_err());

        let request: CreateRoundRequest =
            serde_json::from_str(r#"{"name":"Spring 2026","algorithm_type":"preference_priority"}"#)
                .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.algorithm_type.as_deref(), Some("preference_priority"));
        assert!(request.settings.is_none());
    }

    #[test]
    fn test_update_status_request() {
        let request: UpdateMatchStatusRequest =
            serde_json::from_str(r#"{"status":"ACCEPTED","approverId":"admin-1"}"#).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.approver_id.as_deref(), Some("admin-1"));
    }
}
