use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MatchingError;

/// Tolerance used when checking that scoring weights sum to 1.0
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Student snapshot as seen by the matching core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_matched: bool,
    #[serde(default)]
    pub location_preferences: BTreeSet<String>,
    #[serde(default)]
    pub work_preferences: BTreeSet<String>,
    /// Grade point average on the 4.3 scale, used when no course grades are on file
    #[serde(default)]
    pub grade_average: Option<f64>,
}

impl Student {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_active: true,
            is_matched: false,
            location_preferences: BTreeSet::new(),
            work_preferences: BTreeSet::new(),
            grade_average: None,
        }
    }
}

/// Organization snapshot as seen by the matching core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub available_positions: u32,
    #[serde(default)]
    pub filled_positions: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub work_types: BTreeSet<String>,
}

impl Organization {
    pub fn new(id: impl Into<String>, available_positions: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            is_active: true,
            available_positions,
            filled_positions: 0,
            location: None,
            work_types: BTreeSet::new(),
        }
    }

    /// Positions still open, never negative
    pub fn remaining_positions(&self) -> u32 {
        self.available_positions.saturating_sub(self.filled_positions)
    }

    pub fn has_capacity(&self) -> bool {
        self.remaining_positions() > 0
    }
}

fn default_true() -> bool {
    true
}

/// Who declared a preference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "preference_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceOwner {
    Student { student_id: String },
    Organization { organization_id: String },
}

/// A ranked (student) or weighted (organization) interest in an area of law
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    #[serde(flatten)]
    pub owner: PreferenceOwner,
    pub area_of_law: String,
    /// 1 = most preferred; student side only
    #[serde(default)]
    pub rank: Option<u32>,
    /// Non-negative weight; organization side only
    #[serde(default)]
    pub weight: Option<f64>,
}

impl Preference {
    pub fn student(student_id: impl Into<String>, area: impl Into<String>, rank: u32) -> Self {
        Self {
            owner: PreferenceOwner::Student {
                student_id: student_id.into(),
            },
            area_of_law: area.into(),
            rank: Some(rank),
            weight: None,
        }
    }

    pub fn organization(
        organization_id: impl Into<String>,
        area: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            owner: PreferenceOwner::Organization {
                organization_id: organization_id.into(),
            },
            area_of_law: area.into(),
            rank: None,
            weight: Some(weight),
        }
    }
}

/// A student's written statement for one area of law
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub student_id: String,
    pub area_of_law: String,
    /// Grade in [0, 100]; `None` until graded
    #[serde(default)]
    pub statement_grade: Option<u32>,
    #[serde(default)]
    pub graded_by: Option<String>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

impl Statement {
    pub const MAX_GRADE: u32 = 100;

    pub fn new(student_id: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            area_of_law: area.into(),
            statement_grade: None,
            graded_by: None,
            graded_at: None,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.statement_grade.is_some()
    }

    /// Assign a grade once; regrading is rejected
    pub fn grade(
        &mut self,
        value: u32,
        grader: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingError> {
        if value > Self::MAX_GRADE {
            return Err(MatchingError::validation(format!(
                "statement grade {} is outside 0..={}",
                value,
                Self::MAX_GRADE
            )));
        }
        if self.is_graded() {
            return Err(MatchingError::invalid_state(format!(
                "statement for {} / {} is already graded",
                self.student_id, self.area_of_law
            )));
        }

        self.statement_grade = Some(value);
        self.graded_by = Some(grader.into());
        self.graded_at = Some(now);
        Ok(())
    }
}

/// Course grades on file for a student, keyed by course name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub student_id: String,
    #[serde(default)]
    pub course_grades: BTreeMap<String, String>,
}

impl GradeRecord {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_grades: BTreeMap::new(),
        }
    }

    pub fn with_grade(mut self, course: impl Into<String>, letter: impl Into<String>) -> Self {
        self.course_grades.insert(course.into(), letter.into());
        self
    }
}

/// Weight configuration for the five scoring components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(rename = "area_weight", alias = "area", default = "default_area_weight")]
    pub area_of_law: f64,
    #[serde(rename = "statement_weight", alias = "statement", default = "default_statement_weight")]
    pub statement: f64,
    #[serde(rename = "location_weight", alias = "location", default = "default_location_weight")]
    pub location: f64,
    #[serde(
        rename = "work_preference_weight",
        alias = "work",
        default = "default_work_preference_weight"
    )]
    pub work_preference: f64,
    #[serde(rename = "grade_weight", alias = "grade", default = "default_grade_weight")]
    pub grade: f64,
}

fn default_area_weight() -> f64 { 0.35 }
fn default_statement_weight() -> f64 { 0.25 }
fn default_location_weight() -> f64 { 0.15 }
fn default_work_preference_weight() -> f64 { 0.10 }
fn default_grade_weight() -> f64 { 0.15 }

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            area_of_law: default_area_weight(),
            statement: default_statement_weight(),
            location: default_location_weight(),
            work_preference: default_work_preference_weight(),
            grade: default_grade_weight(),
        }
    }
}

impl ScoringWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.area_of_law,
            self.statement,
            self.location,
            self.work_preference,
            self.grade,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Reject weights that cannot be normalized
    pub fn validate(&self) -> Result<(), MatchingError> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MatchingError::validation(
                "scoring weights must be finite and non-negative",
            ));
        }
        if self.total() <= 0.0 {
            return Err(MatchingError::validation(
                "scoring weights must not all be zero",
            ));
        }
        Ok(())
    }

    /// Scale weights proportionally so they sum to 1.0
    ///
    /// Returns the weights to score with and whether a rescale happened.
    /// Weights already within `WEIGHT_TOLERANCE` of 1.0 are kept as given.
    pub fn normalized(&self) -> (ScoringWeights, bool) {
        let total = self.total();
        if total <= 0.0 || (total - 1.0).abs() <= WEIGHT_TOLERANCE {
            return (*self, false);
        }

        (
            ScoringWeights {
                area_of_law: self.area_of_law / total,
                statement: self.statement / total,
                location: self.location / total,
                work_preference: self.work_preference / total,
                grade: self.grade / total,
            },
            true,
        )
    }
}

/// Selects which matching strategy a round runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    WeightedPreference,
    PreferencePriority,
}

impl Default for AlgorithmType {
    fn default() -> Self {
        AlgorithmType::WeightedPreference
    }
}

impl AlgorithmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmType::WeightedPreference => "weighted_preference",
            AlgorithmType::PreferencePriority => "preference_priority",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmType {
    type Err = MatchingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted_preference" => Ok(AlgorithmType::WeightedPreference),
            "preference_priority" => Ok(AlgorithmType::PreferencePriority),
            other => Err(MatchingError::validation(format!(
                "unknown algorithm type: {}",
                other
            ))),
        }
    }
}

/// Per-component score breakdown kept for auditing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub area_of_law_score: f64,
    pub area_of_law_weight: f64,
    pub statement_score: f64,
    pub statement_weight: f64,
    pub location_score: f64,
    pub location_weight: f64,
    pub work_preference_score: f64,
    pub work_preference_weight: f64,
    pub grade_score: f64,
    pub grade_weight: f64,
}

impl ScoreBreakdown {
    /// Weighted sum of all components
    pub fn total(&self) -> f64 {
        self.area_of_law_score * self.area_of_law_weight
            + self.statement_score * self.statement_weight
            + self.location_score * self.location_weight
            + self.work_preference_score * self.work_preference_weight
            + self.grade_score * self.grade_weight
    }
}

/// A pairing proposed by a strategy, before it is persisted as a `Match`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub student_id: String,
    pub organization_id: String,
    pub area_of_law: String,
    pub match_score: f64,
    pub student_rank: Option<u32>,
    pub organization_rank: Option<u32>,
    pub components: Option<ScoreBreakdown>,
}

/// Lifecycle of a matching round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RoundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundStatus::Completed | RoundStatus::Failed)
    }
}

/// One execution of a matching strategy over a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRound {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: RoundStatus,
    pub algorithm_type: AlgorithmType,
    pub algorithm_settings: ScoringWeights,
    pub initiated_by: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_students: usize,
    pub matched_students: usize,
    pub total_organizations: usize,
    pub average_match_score: Option<f64>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MatchingRound {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        algorithm_type: AlgorithmType,
        algorithm_settings: ScoringWeights,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            status: RoundStatus::Pending,
            algorithm_type,
            algorithm_settings,
            initiated_by: None,
            started_at: None,
            completed_at: None,
            total_students: 0,
            matched_students: 0,
            total_organizations: 0,
            average_match_score: None,
            failure_reason: None,
            created_at: now,
        }
    }

    pub fn start(
        &mut self,
        initiated_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingError> {
        if self.status != RoundStatus::Pending {
            return Err(MatchingError::invalid_state(format!(
                "round {} cannot start from {:?}",
                self.id, self.status
            )));
        }
        self.status = RoundStatus::InProgress;
        self.started_at = Some(now);
        self.initiated_by = initiated_by;
        Ok(())
    }

    pub fn complete(
        &mut self,
        matched_count: usize,
        average_score: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingError> {
        if self.status != RoundStatus::InProgress {
            return Err(MatchingError::invalid_state(format!(
                "round {} cannot complete from {:?}",
                self.id, self.status
            )));
        }
        self.status = RoundStatus::Completed;
        self.completed_at = Some(now);
        self.matched_students = matched_count;
        self.average_match_score = average_score;
        Ok(())
    }

    /// Mark the round failed; allowed from any non-terminal state
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RoundStatus::Failed;
        self.completed_at = Some(now);
        self.failure_reason = Some(reason.into());
    }

    pub fn match_percentage(&self) -> f64 {
        if self.total_students == 0 {
            0.0
        } else {
            self.matched_students as f64 / self.total_students as f64 * 100.0
        }
    }
}

/// Approval lifecycle of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Confirmed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Accepted => "ACCEPTED",
            MatchStatus::Rejected => "REJECTED",
            MatchStatus::Confirmed => "CONFIRMED",
        }
    }

    /// Whether the match holds one of the organization's positions
    pub fn occupies_position(&self) -> bool {
        matches!(self, MatchStatus::Accepted | MatchStatus::Confirmed)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = MatchingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MatchStatus::Pending),
            "ACCEPTED" => Ok(MatchStatus::Accepted),
            "REJECTED" => Ok(MatchStatus::Rejected),
            "CONFIRMED" => Ok(MatchStatus::Confirmed),
            other => Err(MatchingError::validation(format!(
                "unknown match status: {}",
                other
            ))),
        }
    }
}

/// A persisted pairing of one student to one organization within a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub round_id: Uuid,
    pub student_id: String,
    pub organization_id: String,
    pub area_of_law: String,
    pub status: MatchStatus,
    pub match_score: f64,
    pub student_rank: Option<u32>,
    pub organization_rank: Option<u32>,
    pub statement_score: Option<f64>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn from_proposal(round_id: Uuid, proposal: MatchProposal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            statement_score: proposal.components.map(|c| c.statement_score),
            student_id: proposal.student_id,
            organization_id: proposal.organization_id,
            area_of_law: proposal.area_of_law,
            status: MatchStatus::Pending,
            match_score: proposal.match_score,
            student_rank: proposal.student_rank,
            organization_rank: proposal.organization_rank,
            score_breakdown: proposal.components,
            approved_by: None,
            approved_at: None,
            rejected_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn require_status(&self, expected: MatchStatus, action: &str) -> Result<(), MatchingError> {
        if self.status != expected {
            return Err(MatchingError::invalid_state(format!(
                "cannot {} match {} in status {}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }

    /// PENDING -> ACCEPTED
    pub fn approve(&mut self, approver: Option<String>, now: DateTime<Utc>) -> Result<(), MatchingError> {
        self.require_status(MatchStatus::Pending, "approve")?;
        self.status = MatchStatus::Accepted;
        self.approved_by = approver;
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// PENDING -> REJECTED
    pub fn reject(
        &mut self,
        approver: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingError> {
        self.require_status(MatchStatus::Pending, "reject")?;
        self.status = MatchStatus::Rejected;
        self.approved_by = approver;
        self.rejected_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// ACCEPTED -> CONFIRMED; re-confirming is a no-op
    ///
    /// Returns `true` when the status actually changed.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<bool, MatchingError> {
        match self.status {
            MatchStatus::Confirmed => Ok(false),
            MatchStatus::Accepted => {
                self.status = MatchStatus::Confirmed;
                self.updated_at = now;
                Ok(true)
            }
            _ => Err(MatchingError::invalid_state(format!(
                "cannot confirm match {} in status {}",
                self.id, self.status
            ))),
        }
    }
}
