use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::core::matcher::{MatchingInput, MatchingStrategy, PreparedInput, ResultsSummary, SkipCounts};
use crate::core::preferences::StudentAreaPreference;
use crate::core::scoring::statement_score;
use crate::error::MatchingError;
use crate::models::{AlgorithmType, MatchProposal, Organization, Student};

/// Audit score recorded when the student has no graded statement for the area
pub const DEFAULT_PRIORITY_SCORE: f64 = 0.5;

/// Preference-first assignment
///
/// Each student is placed at the first organization (in snapshot order) that
/// declares the student's highest-ranked area still available. Score is only
/// recorded for auditing and never drives the choice.
#[derive(Debug, Clone, Default)]
pub struct PreferencePriorityStrategy {
    prepared: Option<PreparedInput>,
    results: Vec<MatchProposal>,
    skipped: SkipCounts,
}

impl PreferencePriorityStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn audit_score(prepared: &PreparedInput, student_id: &str, area: &str) -> f64 {
        match prepared.statement(student_id, area) {
            Some(statement) if statement.is_graded() => statement_score(Some(statement)),
            _ => DEFAULT_PRIORITY_SCORE,
        }
    }

    /// Walk the student's ranked areas and take the first open organization
    fn place_student(
        prepared: &PreparedInput,
        student: &Student,
        ranked: &[StudentAreaPreference],
        organizations: &[&Organization],
        remaining: &mut HashMap<String, u32>,
    ) -> Option<MatchProposal> {
        for pref in ranked {
            let area = pref.area_of_law.as_str();
            let open = organizations.iter().find(|org| {
                prepared.preferences.organization_declares(&org.id, area)
                    && remaining.get(&org.id).copied().unwrap_or(0) > 0
            });

            if let Some(org) = open {
                if let Some(slots) = remaining.get_mut(&org.id) {
                    *slots -= 1;
                }
                return Some(MatchProposal {
                    student_id: student.id.clone(),
                    organization_id: org.id.clone(),
                    area_of_law: pref.area_of_law.clone(),
                    match_score: Self::audit_score(prepared, &student.id, area),
                    student_rank: pref.rank,
                    organization_rank: prepared.preferences.organization_rank(&org.id, area),
                    components: None,
                });
            }
        }
        None
    }
}

impl MatchingStrategy for PreferencePriorityStrategy {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::PreferencePriority
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
        let mut organizations: Vec<&Organization> = Vec::new();
        for org in prepared.organizations.iter().filter(|org| org.is_active) {
            if !prepared.preferences.has_organization(&org.id) {
                warn!("Organization {} has no preferences, skipping.", org.id);
                skipped.organizations_without_preferences += 1;
            } else if !org.has_capacity() {
                info!("Organization {} has no available positions, skipped for capacity.", org.id);
                skipped.organizations_without_capacity += 1;
            } else {
                organizations.push(org);
            }
        }

        let mut remaining: HashMap<String, u32> = organizations
            .iter()
            .map(|org| (org.id.clone(), org.remaining_positions()))
            .collect();
        let mut matched: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        // First pass: each student's top available choice
        for student in prepared.students.iter().filter(|s| s.is_active) {
            let ranked = prepared.preferences.student_preferences(&student.id);
            if ranked.is_empty() {
                info!("Student {} has no preferences, skipping.", student.id);
                skipped.students_without_preferences += 1;
                continue;
            }

            if let Some(proposal) =
                Self::place_student(prepared, student, ranked, &organizations, &mut remaining)
            {
                matched.insert(student.id.as_str());
                results.push(proposal);
            }
        }

        // Second pass: retry anyone still unplaced against all open organizations
        let mut second_pass = 0;
        for student in prepared.students.iter().filter(|s| s.is_active) {
            if matched.contains(student.id.as_str()) {
                continue;
            }
            let ranked = prepared.preferences.student_preferences(&student.id);
            if ranked.is_empty() {
                continue;
            }

            if let Some(proposal) =
                Self::place_student(prepared, student, ranked, &organizations, &mut remaining)
            {
                matched.insert(student.id.as_str());
                results.push(proposal);
                second_pass += 1;
            }
        }

        info!(
            "Preference priority matching: {} placed ({} in second pass)",
            results.len(),
            second_pass
        );

        self.skipped = skipped;
        self.results = results.clone();
        Ok(results)
    }

    fn summary(&self) -> ResultsSummary {
        let (students, organizations) = self
            .prepared
            .as_ref()
            .map(|p| (p.students.len(), p.organizations.len()))
            .unwrap_or_default();
        ResultsSummary::from_results(&self.results, students, organizations, self.skipped, false)
    }
}
