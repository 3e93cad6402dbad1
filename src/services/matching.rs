use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::matcher::{Matcher, MatchingInput};
use crate::error::MatchingError;
use crate::models::{
    AlgorithmType, Match, MatchStatistics, MatchStatus, MatchingRound, MatchingStatistics,
    OverallStatistics, RoundStatistics, RoundStatus, ScoringWeights,
};
use crate::services::events::{DomainEvent, EventBus};
use crate::services::locks::{with_lock, KeyedLocks};
use crate::services::memory::InMemoryStore;
use crate::services::repository::{
    GradeRepository, MatchRepository, OrganizationRepository, PreferenceRepository,
    RepositoryError, RoundRepository, StatementRepository, StudentRepository,
};

/// Storage collaborators used by the service
#[derive(Clone)]
pub struct Repositories {
    pub students: Arc<dyn StudentRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
    pub statements: Arc<dyn StatementRepository>,
    pub grades: Arc<dyn GradeRepository>,
    pub rounds: Arc<dyn RoundRepository>,
    pub matches: Arc<dyn MatchRepository>,
}

impl Repositories {
    /// Back every repository with the same store
    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            students: store.clone(),
            organizations: store.clone(),
            preferences: store.clone(),
            statements: store.clone(),
            grades: store.clone(),
            rounds: store.clone(),
            matches: store,
        }
    }
}

/// Values applied when a round is created without explicit settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchingDefaults {
    pub algorithm_type: AlgorithmType,
    pub weights: ScoringWeights,
}

/// Orchestrates rounds and the match approval workflow
pub struct MatchingService {
    repos: Repositories,
    defaults: MatchingDefaults,
    events: EventBus,
    round_locks: KeyedLocks,
    organization_locks: KeyedLocks,
}

impl MatchingService {
    pub fn new(repos: Repositories, defaults: MatchingDefaults) -> Self {
        Self {
            repos,
            defaults,
            events: EventBus::with_default_handlers(),
            round_locks: KeyedLocks::new(),
            organization_locks: KeyedLocks::new(),
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn defaults(&self) -> &MatchingDefaults {
        &self.defaults
    }

    /// Create a PENDING round
    pub fn create_round(
        &self,
        name: &str,
        description: Option<String>,
        algorithm_type: Option<AlgorithmType>,
        settings: Option<ScoringWeights>,
    ) -> Result<MatchingRound, MatchingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchingError::validation("round name must not be empty"));
        }

        let settings = settings.unwrap_or(self.defaults.weights);
        settings.validate()?;

        let round = MatchingRound::new(
            name,
            description,
            algorithm_type.unwrap_or(self.defaults.algorithm_type),
            settings,
            Utc::now(),
        );
        let round = self.repos.rounds.insert(round)?;

        info!(
            "Created matching round {} ({}) using {}",
            round.id, round.name, round.algorithm_type
        );
        Ok(round)
    }

    /// Execute a PENDING round; a COMPLETED round is returned unchanged
    ///
    /// Calls for the same round are serialized. Any failure after the round
    /// has started marks it FAILED, removes its matches and surfaces
    /// `AlgorithmExecution`.
    pub fn run_matching(
        &self,
        round_id: Uuid,
        initiated_by: Option<String>,
    ) -> Result<MatchingRound, MatchingError> {
        with_lock(&self.round_locks, &round_id.to_string(), || {
            self.run_matching_locked(round_id, initiated_by)
        })
    }

    fn run_matching_locked(
        &self,
        round_id: Uuid,
        initiated_by: Option<String>,
    ) -> Result<MatchingRound, MatchingError> {
        let mut round = self.get_round(round_id)?;

        if round.status == RoundStatus::Completed {
            info!("Matching round {} already completed, nothing to do", round_id);
            return Ok(round);
        }

        round.start(initiated_by, Utc::now())?;
        self.repos.rounds.update(&round)?;
        info!(
            "Starting matching round {} with {}",
            round.id, round.algorithm_type
        );

        match self.execute_round(&mut round) {
            Ok(created) => {
                for record in &created {
                    self.events.publish(&DomainEvent::MatchCreated {
                        match_id: record.id,
                        round_id: record.round_id,
                        student_id: record.student_id.clone(),
                        organization_id: record.organization_id.clone(),
                    });
                }
                self.events.publish(&DomainEvent::RoundCompleted {
                    round_id: round.id,
                    matched_students: round.matched_students,
                    average_score: round.average_match_score,
                });
                Ok(round)
            }
            Err(err) => {
                let reason = err.to_string();
                self.record_failure(&mut round, &reason);
                Err(MatchingError::AlgorithmExecution { round_id, reason })
            }
        }
    }

    fn load_input(&self) -> Result<MatchingInput, MatchingError> {
        let students = self.repos.students.get_all_active()?;
        let organizations = self.repos.organizations.get_all_active()?;
        let preferences = self.repos.preferences.get_all()?;
        let statements = self.repos.statements.get_all_with_grades()?;
        let student_ids: Vec<String> = students.iter().map(|s| s.id.clone()).collect();
        let grades = self.repos.grades.get_all_for_students(&student_ids)?;

        Ok(MatchingInput {
            students,
            organizations,
            preferences,
            grades,
            statements,
        })
    }

    fn execute_round(&self, round: &mut MatchingRound) -> Result<Vec<Match>, MatchingError> {
        let input = self.load_input()?;
        round.total_students = input.students.len();
        round.total_organizations = input.organizations.len();

        let matcher = Matcher::new(round.algorithm_type, round.algorithm_settings);
        let result = matcher.run(input)?;

        let now = Utc::now();
        let records: Vec<Match> = result
            .proposals
            .into_iter()
            .map(|proposal| Match::from_proposal(round.id, proposal, now))
            .collect();

        let created = self.repos.matches.insert_batch(records)?;
        round.complete(result.summary.matched_count, result.summary.average_score, now)?;
        self.repos.rounds.update(round)?;

        info!(
            "Matching round {} completed: {}/{} students matched across {} organizations",
            round.id, round.matched_students, round.total_students, round.total_organizations
        );
        Ok(created)
    }

    fn record_failure(&self, round: &mut MatchingRound, reason: &str) {
        error!("Matching round {} failed: {}", round.id, reason);

        if let Err(err) = self.repos.matches.delete_for_round(round.id) {
            error!("Failed to remove matches of round {}: {}", round.id, err);
        }
        round.matched_students = 0;
        round.average_match_score = None;
        round.fail(reason, Utc::now());
        if let Err(err) = self.repos.rounds.update(round) {
            error!("Failed to persist FAILED status of round {}: {}", round.id, err);
        }

        self.events.publish(&DomainEvent::RoundFailed {
            round_id: round.id,
            reason: reason.to_string(),
        });
    }

    /// Move a match through PENDING -> ACCEPTED | REJECTED, ACCEPTED -> CONFIRMED
    ///
    /// Transitions on matches of one organization are serialized.
    pub fn update_match_status(
        &self,
        match_id: Uuid,
        status: MatchStatus,
        approver_id: Option<String>,
        notes: Option<String>,
    ) -> Result<Match, MatchingError> {
        let organization_id = self.get_match(match_id)?.organization_id;

        with_lock(&self.organization_locks, &organization_id, || {
            // Re-read under the lock: another caller may have moved it
            let record = self.get_match(match_id)?;
            match status {
                MatchStatus::Accepted => self.accept_match(record, approver_id),
                MatchStatus::Rejected => self.reject_match(record, approver_id, notes),
                MatchStatus::Confirmed => self.confirm_match(record),
                MatchStatus::Pending => Err(MatchingError::invalid_state(format!(
                    "match {} cannot be moved back to PENDING",
                    match_id
                ))),
            }
        })
    }

    fn accept_match(&self, mut record: Match, approver_id: Option<String>) -> Result<Match, MatchingError> {
        let original = record.clone();
        record.approve(approver_id.clone(), Utc::now())?;

        self.repos
            .organizations
            .reserve_position(&record.organization_id)
            .map_err(|err| self.capacity_error(err))?;

        if let Err(err) = self.repos.matches.update(&record) {
            self.release_position(&record.organization_id);
            return Err(err.into());
        }

        if let Err(err) = self.repos.students.mark_matched(&record.student_id) {
            if let Err(revert) = self.repos.matches.update(&original) {
                error!("Failed to revert match {}: {}", record.id, revert);
            }
            self.release_position(&record.organization_id);
            return Err(err.into());
        }

        self.events.publish(&DomainEvent::MatchApproved {
            match_id: record.id,
            student_id: record.student_id.clone(),
            organization_id: record.organization_id.clone(),
            approved_by: approver_id,
        });
        self.events.publish(&DomainEvent::StudentMatched {
            student_id: record.student_id.clone(),
            match_id: record.id,
        });
        Ok(record)
    }

    fn reject_match(
        &self,
        mut record: Match,
        approver_id: Option<String>,
        notes: Option<String>,
    ) -> Result<Match, MatchingError> {
        record.reject(approver_id, notes, Utc::now())?;
        self.repos.matches.update(&record)?;

        self.events.publish(&DomainEvent::MatchRejected {
            match_id: record.id,
            notes: record.notes.clone(),
        });
        Ok(record)
    }

    fn confirm_match(&self, mut record: Match) -> Result<Match, MatchingError> {
        if record.confirm(Utc::now())? {
            self.repos.matches.update(&record)?;
            self.events.publish(&DomainEvent::MatchConfirmed { match_id: record.id });
        }
        Ok(record)
    }

    fn capacity_error(&self, err: RepositoryError) -> MatchingError {
        match err {
            RepositoryError::CapacityExceeded(organization_id) => {
                let (available, filled) = self
                    .repos
                    .organizations
                    .get(&organization_id)
                    .ok()
                    .flatten()
                    .map(|org| (org.available_positions, org.filled_positions))
                    .unwrap_or_default();
                warn!(
                    "Organization {} is full ({}/{}), approval refused",
                    organization_id, filled, available
                );
                MatchingError::CapacityExceeded {
                    organization_id,
                    available,
                    filled,
                }
            }
            RepositoryError::NotFound(organization_id) => {
                MatchingError::not_found("organization", organization_id)
            }
            other => other.into(),
        }
    }

    fn release_position(&self, organization_id: &str) {
        if let Err(err) = self.repos.organizations.release_position(organization_id) {
            error!(
                "Failed to release reserved position at {}: {}",
                organization_id, err
            );
        }
    }

    /// Counts and averages for one round (when given) and across everything
    pub fn get_matching_statistics(&self, round_id: Option<Uuid>) -> Result<MatchingStatistics, MatchingError> {
        let round = match round_id {
            Some(id) => {
                let round = self.get_round(id)?;
                Some(RoundStatistics {
                    id: round.id,
                    name: round.name.clone(),
                    status: round.status,
                    total_students: round.total_students,
                    matched_students: round.matched_students,
                    total_organizations: round.total_organizations,
                    match_percentage: round.match_percentage(),
                    average_score: round.average_match_score.unwrap_or(0.0),
                })
            }
            None => None,
        };

        let rounds = self.repos.rounds.list(None, None)?;
        let all_matches = self.repos.matches.all()?;
        let overall = OverallStatistics {
            total_rounds: rounds.len(),
            completed_rounds: rounds
                .iter()
                .filter(|r| r.status == RoundStatus::Completed)
                .count(),
            total_matches: all_matches.len(),
            confirmed_matches: all_matches
                .iter()
                .filter(|m| m.status == MatchStatus::Confirmed)
                .count(),
            average_score: average_score(&all_matches),
        };

        let scoped: Vec<Match> = match round_id {
            Some(id) => all_matches.into_iter().filter(|m| m.round_id == id).collect(),
            None => all_matches,
        };
        let mut by_status = BTreeMap::new();
        let mut by_area = BTreeMap::new();
        for record in &scoped {
            *by_status.entry(record.status).or_insert(0) += 1;
            *by_area.entry(record.area_of_law.clone()).or_insert(0) += 1;
        }

        Ok(MatchingStatistics {
            round,
            overall,
            matches: MatchStatistics {
                total: scoped.len(),
                by_status,
                by_area,
                average_score: average_score(&scoped),
            },
        })
    }

    pub fn get_round(&self, round_id: Uuid) -> Result<MatchingRound, MatchingError> {
        self.repos
            .rounds
            .get(round_id)?
            .ok_or_else(|| MatchingError::not_found("matching round", round_id))
    }

    pub fn list_rounds(&self, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<MatchingRound>, MatchingError> {
        Ok(self.repos.rounds.list(limit, offset)?)
    }

    pub fn get_match(&self, match_id: Uuid) -> Result<Match, MatchingError> {
        self.repos
            .matches
            .get(match_id)?
            .ok_or_else(|| MatchingError::not_found("match", match_id))
    }

    pub fn matches_for_round(&self, round_id: Uuid) -> Result<Vec<Match>, MatchingError> {
        self.get_round(round_id)?;
        Ok(self.repos.matches.for_round(round_id)?)
    }

    pub fn matches_for_student(&self, student_id: &str) -> Result<Vec<Match>, MatchingError> {
        if self.repos.students.get(student_id)?.is_none() {
            return Err(MatchingError::not_found("student", student_id));
        }
        Ok(self.repos.matches.for_student(student_id)?)
    }

    pub fn matches_for_organization(&self, organization_id: &str) -> Result<Vec<Match>, MatchingError> {
        if self.repos.organizations.get(organization_id)?.is_none() {
            return Err(MatchingError::not_found("organization", organization_id));
        }
        Ok(self.repos.matches.for_organization(organization_id)?)
    }
}

fn average_score(matches: &[Match]) -> f64 {
    if matches.is_empty() {
        0.0
    } else {
        matches.iter().map(|m| m.match_score).sum::<f64>() / matches.len() as f64
    }
}
