use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{GradeRecord, Match, MatchingRound, Organization, Preference, Statement, Student};

/// Errors raised by storage collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("no remaining positions for organization {0}")]
    CapacityExceeded(String),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait StudentRepository: Send + Sync {
    fn get_all_active(&self) -> Result<Vec<Student>, RepositoryError>;
    fn get(&self, student_id: &str) -> Result<Option<Student>, RepositoryError>;
    fn mark_matched(&self, student_id: &str) -> Result<(), RepositoryError>;
}

pub trait OrganizationRepository: Send + Sync {
    fn get_all_active(&self) -> Result<Vec<Organization>, RepositoryError>;
    fn get(&self, organization_id: &str) -> Result<Option<Organization>, RepositoryError>;

    /// Atomically increment `filled_positions` if a position is open
    ///
    /// Returns the updated organization, or `CapacityExceeded` without
    /// touching the counter.
    fn reserve_position(&self, organization_id: &str) -> Result<Organization, RepositoryError>;

    /// Undo a reservation made by `reserve_position`
    fn release_position(&self, organization_id: &str) -> Result<(), RepositoryError>;
}

pub trait PreferenceRepository: Send + Sync {
    fn get_all(&self) -> Result<Vec<Preference>, RepositoryError>;
}

pub trait StatementRepository: Send + Sync {
    /// Statements keyed by (student id, area of law)
    fn get_all_with_grades(&self) -> Result<HashMap<(String, String), Statement>, RepositoryError>;
}

pub trait GradeRepository: Send + Sync {
    fn get_all_for_students(&self, student_ids: &[String]) -> Result<HashMap<String, GradeRecord>, RepositoryError>;
}

pub trait RoundRepository: Send + Sync {
    fn insert(&self, round: MatchingRound) -> Result<MatchingRound, RepositoryError>;
    fn update(&self, round: &MatchingRound) -> Result<(), RepositoryError>;
    fn get(&self, round_id: Uuid) -> Result<Option<MatchingRound>, RepositoryError>;
    /// Newest first
    fn list(&self, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<MatchingRound>, RepositoryError>;
}

pub trait MatchRepository: Send + Sync {
    /// Persist every match or none of them
    ///
    /// Fails with `Conflict` if any (round, student, organization) triple
    /// already exists or repeats within the batch.
    fn insert_batch(&self, matches: Vec<Match>) -> Result<Vec<Match>, RepositoryError>;
    fn update(&self, record: &Match) -> Result<(), RepositoryError>;
    fn get(&self, match_id: Uuid) -> Result<Option<Match>, RepositoryError>;
    fn for_round(&self, round_id: Uuid) -> Result<Vec<Match>, RepositoryError>;
    fn for_student(&self, student_id: &str) -> Result<Vec<Match>, RepositoryError>;
    fn for_organization(&self, organization_id: &str) -> Result<Vec<Match>, RepositoryError>;
    fn all(&self) -> Result<Vec<Match>, RepositoryError>;
    /// Remove every match of a round, returning how many were dropped
    fn delete_for_round(&self, round_id: Uuid) -> Result<usize, RepositoryError>;
}
