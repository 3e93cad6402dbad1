// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AlgorithmType, GradeRecord, Match, MatchProposal, MatchStatus, MatchingRound, Organization,
    Preference, PreferenceOwner, RoundStatus, ScoreBreakdown, ScoringWeights, Statement, Student,
    WEIGHT_TOLERANCE,
};
pub use requests::{CreateRoundRequest, PageQuery, RunMatchingRequest, StatisticsQuery, UpdateMatchStatusRequest};
pub use responses::{
    ErrorResponse, HealthResponse, MatchStatistics, MatchingStatistics, OverallStatistics,
    RoundStatistics,
};
