use uuid::Uuid;

use crate::error::MatchingError;
use crate::models::{AlgorithmType, Match, MatchStatus, MatchingRound, MatchingStatistics, ScoringWeights};
use crate::services::matching::MatchingService;

/// Operations that change state
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateRound {
        name: String,
        description: Option<String>,
        algorithm_type: Option<AlgorithmType>,
        settings: Option<ScoringWeights>,
    },
    RunMatching {
        round_id: Uuid,
        initiated_by: Option<String>,
    },
    UpdateMatchStatus {
        match_id: Uuid,
        status: MatchStatus,
        approver_id: Option<String>,
        notes: Option<String>,
    },
}

/// Read-only operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    GetRound(Uuid),
    ListRounds {
        limit: Option<usize>,
        offset: Option<usize>,
    },
    GetMatch(Uuid),
    MatchesForRound(Uuid),
    MatchesForStudent(String),
    MatchesForOrganization(String),
    Statistics {
        round_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Round(MatchingRound),
    Match(Match),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Round(MatchingRound),
    Rounds(Vec<MatchingRound>),
    Match(Match),
    Matches(Vec<Match>),
    Statistics(MatchingStatistics),
}

impl MatchingService {
    pub fn execute(&self, command: Command) -> Result<CommandOutcome, MatchingError> {
        match command {
            Command::CreateRound {
                name,
                description,
                algorithm_type,
                settings,
            } => self
                .create_round(&name, description, algorithm_type, settings)
                .map(CommandOutcome::Round),
            Command::RunMatching {
                round_id,
                initiated_by,
            } => self.run_matching(round_id, initiated_by).map(CommandOutcome::Round),
            Command::UpdateMatchStatus {
                match_id,
                status,
                approver_id,
                notes,
            } => self
                .update_match_status(match_id, status, approver_id, notes)
                .map(CommandOutcome::Match),
        }
    }

    pub fn query(&self, query: Query) -> Result<QueryOutcome, MatchingError> {
        match query {
            Query::GetRound(id) => self.get_round(id).map(QueryOutcome::Round),
            Query::ListRounds { limit, offset } => self.list_rounds(limit, offset).map(QueryOutcome::Rounds),
            Query::GetMatch(id) => self.get_match(id).map(QueryOutcome::Match),
            Query::MatchesForRound(id) => self.matches_for_round(id).map(QueryOutcome::Matches),
            Query::MatchesForStudent(id) => self.matches_for_student(&id).map(QueryOutcome::Matches),
            Query::MatchesForOrganization(id) => {
                self.matches_for_organization(&id).map(QueryOutcome::Matches)
            }
            Query::Statistics { round_id } => {
                self.get_matching_statistics(round_id).map(QueryOutcome::Statistics)
            }
        }
    }
}
