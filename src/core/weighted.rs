use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::core::matcher::{MatchingInput, MatchingStrategy, PreparedInput, ResultsSummary, SkipCounts};
use crate::core::scoring::{calculate_match_score, ScoreInputs};
use crate::error::MatchingError;
use crate::models::{AlgorithmType, MatchProposal, Organization, ScoringWeights};

/// Score-first greedy assignment
///
/// # Pipeline Stages
/// 1. Eligibility: active organizations with preferences and open positions
/// 2. Candidate generation: one proposal per common (student, organization, area)
/// 3. Ranking: stable sort by score, descending
/// 4. Greedy acceptance under one-match-per-student and per-organization capacity
#[derive(Debug, Clone)]
pub struct WeightedPreferenceStrategy {
    weights: ScoringWeights,
    weights_normalized: bool,
    prepared: Option<PreparedInput>,
    results: Vec<MatchProposal>,
    skipped: SkipCounts,
}

impl WeightedPreferenceStrategy {
    pub fn new(weights: ScoringWeights) -> Self {
        let (normalized, changed) = weights.normalized();
        if changed {
            warn!(
                "Weights do not sum to 1.0 (total: {:.3}), normalized to {:?}",
                weights.total(),
                normalized
            );
        }

        Self {
            weights: normalized,
            weights_normalized: changed,
            prepared: None,
            results: Vec::new(),
            skipped: SkipCounts::default(),
        }
    }

    /// Weights actually used for scoring
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn weights_normalized(&self) -> bool {
        self.weights_normalized
    }

    fn eligible_organizations<'a>(
        prepared: &'a PreparedInput,
        skipped: &mut SkipCounts,
    ) -> Vec<&'a Organization> {
        let mut eligible = Vec::new();

        for org in prepared.organizations.iter().filter(|org| org.is_active) {
            if !prepared.preferences.has_organization(&org.id) {
                warn!("Organization {} has no preferences, skipping.", org.id);
                skipped.organizations_without_preferences += 1;
                continue;
            }

            if !org.has_capacity() {
                info!(
                    "Organization {} has no available positions ({}/{} filled), skipped for capacity.",
                    org.id, org.filled_positions, org.available_positions
                );
                skipped.organizations_without_capacity += 1;
                continue;
            }

            eligible.push(org);
        }

        eligible
    }

    fn generate_candidates(&self, prepared: &PreparedInput, skipped: &mut SkipCounts) -> Vec<MatchProposal> {
        let organizations = Self::eligible_organizations(prepared, skipped);
        let mut candidates = Vec::new();

        for student in prepared.students.iter().filter(|s| s.is_active) {
            let student_prefs = prepared.preferences.student_preferences(&student.id);
            if student_prefs.is_empty() {
                warn!("Student {} has no preferences, skipping.", student.id);
                skipped.students_without_preferences += 1;
                continue;
            }

            let grades = prepared.grades.get(&student.id);

            for org in &organizations {
                for pref in student_prefs {
                    let Some(org_weight) = prepared
                        .preferences
                        .organization_weight(&org.id, &pref.area_of_law)
                    else {
                        continue;
                    };

                    let inputs = ScoreInputs {
                        student,
                        organization: org,
                        area_of_law: &pref.area_of_law,
                        student_preference: Some(pref),
                        organization_weight: Some(org_weight),
                        statement: prepared.statement(&student.id, &pref.area_of_law),
                        grades,
                    };
                    let (score, breakdown) = calculate_match_score(&inputs, &self.weights);

                    debug!(
                        "Candidate {} <-> {} ({}): {:.4}",
                        student.id, org.id, pref.area_of_law, score
                    );

                    candidates.push(MatchProposal {
                        student_id: student.id.clone(),
                        organization_id: org.id.clone(),
                        area_of_law: pref.area_of_law.clone(),
                        match_score: score,
                        student_rank: pref.rank,
                        organization_rank: prepared
                            .preferences
                            .organization_rank(&org.id, &pref.area_of_law),
                        components: Some(breakdown),
                    });
                }
            }
        }

        candidates
    }

    fn assign(prepared: &PreparedInput, candidates: Vec<MatchProposal>) -> Vec<MatchProposal> {
        // Seeded once from the snapshot, never re-read mid-pass
        let mut remaining: HashMap<&str, u32> = prepared
            .organizations
            .iter()
            .map(|org| (org.id.as_str(), org.remaining_positions()))
            .collect();
        let mut matched_students: HashSet<String> = HashSet::new();
        let mut accepted = Vec::new();

        for candidate in candidates {
            if matched_students.contains(&candidate.student_id) {
                continue;
            }

            let Some(slots) = remaining.get_mut(candidate.organization_id.as_str()) else {
                continue;
            };
            if *slots == 0 {
                debug!(
                    "Organization {} is full, passing over {}",
                    candidate.organization_id, candidate.student_id
                );
                continue;
            }

            *slots -= 1;
            matched_students.insert(candidate.student_id.clone());
            accepted.push(candidate);
        }

        accepted
    }
}

impl MatchingStrategy for WeightedPreferenceStrategy {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::WeightedPreference
    }

    fn prepare(&mut self, input: MatchingInput) -> Result<(), MatchingError> {
        self.prepared = Some(PreparedInput::new(input)?);
        self.results.clear();
        self.skipped = SkipCounts::default();
        Ok(())
    }

    fn execute(&mut self) -> Result<Vec<MatchProposal>, MatchingError> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| MatchingError::invalid_state("execute called before prepare"))?;

        let mut skipped = SkipCounts::default();
        let mut candidates = self.generate_candidates(prepared, &mut skipped);
        let candidate_count = candidates.len();

        // Stable sort: equal scores keep student, organization, area order
        candidates.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));

        let accepted = Self::assign(prepared, candidates);

        info!(
            "Weighted preference matching: {} candidates, {} accepted",
            candidate_count,
            accepted.len()
        );

        self.skipped = skipped;
        self.results = accepted.clone();
        Ok(accepted)
    }

    fn summary(&self) -> ResultsSummary {
        let (students, organizations) = self
            .prepared
            .as_ref()
            .map(|p| (p.students.len(), p.organizations.len()))
            .unwrap_or_default();
        ResultsSummary::from_results(
            &self.results,
            students,
            organizations,
            self.skipped,
            self.weights_normalized,
        )
    }
}
