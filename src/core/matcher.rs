use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::preferences::PreferenceStore;
use crate::core::priority::PreferencePriorityStrategy;
use crate::core::weighted::WeightedPreferenceStrategy;
use crate::error::MatchingError;
use crate::models::{
    AlgorithmType, GradeRecord, MatchProposal, Organization, Preference, ScoringWeights, Statement,
    Student,
};

/// Snapshot handed to a strategy at `prepare()` time
#[derive(Debug, Clone, Default)]
pub struct MatchingInput {
    pub students: Vec<Student>,
    pub organizations: Vec<Organization>,
    pub preferences: Vec<Preference>,
    pub grades: HashMap<String, GradeRecord>,
    pub statements: HashMap<(String, String), Statement>,
}

/// Snapshot indexed for lookups during `execute()`
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub students: Vec<Student>,
    pub organizations: Vec<Organization>,
    pub preferences: PreferenceStore,
    pub grades: HashMap<String, GradeRecord>,
    statements: HashMap<String, HashMap<String, Statement>>,
}

impl PreparedInput {
    pub fn new(input: MatchingInput) -> Result<Self, MatchingError> {
        let preferences = PreferenceStore::from_preferences(&input.preferences)?;

        let mut statements: HashMap<String, HashMap<String, Statement>> = HashMap::new();
        for ((student_id, area), statement) in input.statements {
            statements.entry(student_id).or_default().insert(area, statement);
        }

        Ok(Self {
            students: input.students,
            organizations: input.organizations,
            preferences,
            grades: input.grades,
            statements,
        })
    }

    pub fn statement(&self, student_id: &str, area: &str) -> Option<&Statement> {
        self.statements.get(student_id).and_then(|by_area| by_area.get(area))
    }
}

/// Students and organizations left out of candidate generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub students_without_preferences: usize,
    pub organizations_without_preferences: usize,
    pub organizations_without_capacity: usize,
}

/// Summary statistics about one strategy execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub matched_count: usize,
    pub total_students: usize,
    pub total_organizations: usize,
    pub average_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub skipped: SkipCounts,
    pub weights_normalized: bool,
}

impl ResultsSummary {
    pub fn from_results(
        results: &[MatchProposal],
        total_students: usize,
        total_organizations: usize,
        skipped: SkipCounts,
        weights_normalized: bool,
    ) -> Self {
        let scores = results.iter().map(|m| m.match_score);
        let (average_score, min_score, max_score) = if results.is_empty() {
            (None, None, None)
        } else {
            (
                Some(scores.clone().sum::<f64>() / results.len() as f64),
                scores.clone().reduce(f64::min),
                scores.reduce(f64::max),
            )
        };

        Self {
            matched_count: results.len(),
            total_students,
            total_organizations,
            average_score,
            min_score,
            max_score,
            skipped,
            weights_normalized,
        }
    }
}

/// A matching algorithm over a prepared snapshot
///
/// Implementations are deterministic: identical input ordering and settings
/// produce identical proposal lists.
pub trait MatchingStrategy: Send {
    fn algorithm_type(&self) -> AlgorithmType;

    /// Index the snapshot; replaces anything prepared earlier
    fn prepare(&mut self, input: MatchingInput) -> Result<(), MatchingError>;

    /// Produce accepted proposals, at most one per student
    fn execute(&mut self) -> Result<Vec<MatchProposal>, MatchingError>;

    /// Statistics about the last `execute()`
    fn summary(&self) -> ResultsSummary;
}

/// Build the strategy for an algorithm type
pub fn strategy_for(algorithm_type: AlgorithmType, weights: &ScoringWeights) -> Box<dyn MatchingStrategy> {
    match algorithm_type {
        AlgorithmType::WeightedPreference => Box::new(WeightedPreferenceStrategy::new(*weights)),
        AlgorithmType::PreferencePriority => Box::new(PreferencePriorityStrategy::new()),
    }
}

/// Output of one full prepare + execute cycle
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub proposals: Vec<MatchProposal>,
    pub summary: ResultsSummary,
}

/// Runs the configured strategy end to end
#[derive(Debug, Clone)]
pub struct Matcher {
    algorithm_type: AlgorithmType,
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(algorithm_type: AlgorithmType, weights: ScoringWeights) -> Self {
        Self {
            algorithm_type,
            weights,
        }
    }

    pub fn with_default_weights(algorithm_type: AlgorithmType) -> Self {
        Self::new(algorithm_type, ScoringWeights::default())
    }

    pub fn algorithm_type(&self) -> AlgorithmType {
        self.algorithm_type
    }

    pub fn run(&self, input: MatchingInput) -> Result<MatchResult, MatchingError> {
        let mut strategy = strategy_for(self.algorithm_type, &self.weights);
        strategy.prepare(input)?;
        let proposals = strategy.execute()?;
        Ok(MatchResult {
            proposals,
            summary: strategy.summary(),
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights(AlgorithmType::default())
    }
}
