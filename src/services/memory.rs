use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{GradeRecord, Match, MatchingRound, Organization, Preference, Statement, Student};
use crate::services::repository::{
    GradeRepository, MatchRepository, OrganizationRepository, PreferenceRepository,
    RepositoryError, RoundRepository, StatementRepository, StudentRepository,
};

/// Errors that can occur when loading a snapshot file
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML snapshot: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Seed data for the in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub preferences: Vec<Preference>,
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub grades: Vec<GradeRecord>,
}

impl Snapshot {
    /// Read a `.toml` or JSON snapshot, chosen by file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Ok(toml::from_str(&raw)?)
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    students: Vec<Student>,
    organizations: Vec<Organization>,
    preferences: Vec<Preference>,
    statements: Vec<Statement>,
    grades: HashMap<String, GradeRecord>,
    rounds: Vec<MatchingRound>,
    matches: Vec<Match>,
}

/// Process-local store implementing every repository
///
/// All writes go through one lock, so each trait method is atomic.
/// Iteration order follows insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let state = StoreState {
            students: snapshot.students,
            organizations: snapshot.organizations,
            preferences: snapshot.preferences,
            statements: snapshot.statements,
            grades: snapshot
                .grades
                .into_iter()
                .map(|record| (record.student_id.clone(), record))
                .collect(),
            ..Default::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn upsert_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state.students.iter_mut().find(|s| s.id == student.id) {
            Some(existing) => *existing = student,
            None => state.students.push(student),
        }
        Ok(())
    }

    pub fn upsert_organization(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state.organizations.iter_mut().find(|o| o.id == organization.id) {
            Some(existing) => *existing = organization,
            None => state.organizations.push(organization),
        }
        Ok(())
    }

    pub fn add_preference(&self, preference: Preference) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let duplicate = state
            .preferences
            .iter()
            .any(|p| p.owner == preference.owner && p.area_of_law == preference.area_of_law);
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "preference {:?} / {}",
                preference.owner, preference.area_of_law
            )));
        }
        state.preferences.push(preference);
        Ok(())
    }

    pub fn upsert_statement(&self, statement: Statement) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state
            .statements
            .iter_mut()
            .find(|s| s.student_id == statement.student_id && s.area_of_law == statement.area_of_law)
        {
            Some(existing) => *existing = statement,
            None => state.statements.push(statement),
        }
        Ok(())
    }

    pub fn upsert_grades(&self, record: GradeRecord) -> Result<(), RepositoryError> {
        self.write()?.grades.insert(record.student_id.clone(), record);
        Ok(())
    }
}

impl StudentRepository for InMemoryStore {
    fn get_all_active(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.read()?.students.iter().filter(|s| s.is_active).cloned().collect())
    }

    fn get(&self, student_id: &str) -> Result<Option<Student>, RepositoryError> {
        Ok(self.read()?.students.iter().find(|s| s.id == student_id).cloned())
    }

    fn mark_matched(&self, student_id: &str) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let student = state
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("student {}", student_id)))?;
        student.is_matched = true;
        Ok(())
    }
}

impl OrganizationRepository for InMemoryStore {
    fn get_all_active(&self) -> Result<Vec<Organization>, RepositoryError> {
        Ok(self
            .read()?
            .organizations
            .iter()
            .filter(|o| o.is_active)
            .cloned()
            .collect())
    }

    fn get(&self, organization_id: &str) -> Result<Option<Organization>, RepositoryError> {
        Ok(self
            .read()?
            .organizations
            .iter()
            .find(|o| o.id == organization_id)
            .cloned())
    }

    fn reserve_position(&self, organization_id: &str) -> Result<Organization, RepositoryError> {
        let mut state = self.write()?;
        let org = state
            .organizations
            .iter_mut()
            .find(|o| o.id == organization_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("organization {}", organization_id)))?;

        if org.filled_positions >= org.available_positions {
            return Err(RepositoryError::CapacityExceeded(organization_id.to_string()));
        }
        org.filled_positions += 1;
        Ok(org.clone())
    }

    fn release_position(&self, organization_id: &str) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let org = state
            .organizations
            .iter_mut()
            .find(|o| o.id == organization_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("organization {}", organization_id)))?;
        org.filled_positions = org.filled_positions.saturating_sub(1);
        Ok(())
    }
}

impl PreferenceRepository for InMemoryStore {
    fn get_all(&self) -> Result<Vec<Preference>, RepositoryError> {
        Ok(self.read()?.preferences.clone())
    }
}

impl StatementRepository for InMemoryStore {
    fn get_all_with_grades(&self) -> Result<HashMap<(String, String), Statement>, RepositoryError> {
        Ok(self
            .read()?
            .statements
            .iter()
            .filter(|s| s.is_graded())
            .map(|s| ((s.student_id.clone(), s.area_of_law.clone()), s.clone()))
            .collect())
    }
}

impl GradeRepository for InMemoryStore {
    fn get_all_for_students(&self, student_ids: &[String]) -> Result<HashMap<String, GradeRecord>, RepositoryError> {
        let state = self.read()?;
        Ok(student_ids
            .iter()
            .filter_map(|id| state.grades.get(id).map(|record| (id.clone(), record.clone())))
            .collect())
    }
}

impl RoundRepository for InMemoryStore {
    fn insert(&self, round: MatchingRound) -> Result<MatchingRound, RepositoryError> {
        let mut state = self.write()?;
        if state.rounds.iter().any(|r| r.id == round.id) {
            return Err(RepositoryError::Conflict(format!("round {}", round.id)));
        }
        state.rounds.push(round.clone());
        Ok(round)
    }

    fn update(&self, round: &MatchingRound) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let existing = state
            .rounds
            .iter_mut()
            .find(|r| r.id == round.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("round {}", round.id)))?;
        *existing = round.clone();
        Ok(())
    }

    fn get(&self, round_id: Uuid) -> Result<Option<MatchingRound>, RepositoryError> {
        Ok(self.read()?.rounds.iter().find(|r| r.id == round_id).cloned())
    }

    fn list(&self, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<MatchingRound>, RepositoryError> {
        let state = self.read()?;
        let mut rounds: Vec<MatchingRound> = state.rounds.iter().rev().cloned().collect();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rounds
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}

impl MatchRepository for InMemoryStore {
    fn insert_batch(&self, matches: Vec<Match>) -> Result<Vec<Match>, RepositoryError> {
        let mut state = self.write()?;

        let mut keys: HashSet<(Uuid, &str, &str)> = state
            .matches
            .iter()
            .map(|m| (m.round_id, m.student_id.as_str(), m.organization_id.as_str()))
            .collect();
        for m in &matches {
            if !keys.insert((m.round_id, m.student_id.as_str(), m.organization_id.as_str())) {
                return Err(RepositoryError::Conflict(format!(
                    "match for round {} / {} / {}",
                    m.round_id, m.student_id, m.organization_id
                )));
            }
        }
        drop(keys);

        state.matches.extend(matches.iter().cloned());
        Ok(matches)
    }

    fn update(&self, record: &Match) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let existing = state
            .matches
            .iter_mut()
            .find(|m| m.id == record.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("match {}", record.id)))?;
        *existing = record.clone();
        Ok(())
    }

    fn get(&self, match_id: Uuid) -> Result<Option<Match>, RepositoryError> {
        Ok(self.read()?.matches.iter().find(|m| m.id == match_id).cloned())
    }

    fn for_round(&self, round_id: Uuid) -> Result<Vec<Match>, RepositoryError> {
        Ok(self
            .read()?
            .matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect())
    }

    fn for_student(&self, student_id: &str) -> Result<Vec<Match>, RepositoryError> {
        Ok(self
            .read()?
            .matches
            .iter()
            .filter(|m| m.student_id == student_id)
            .cloned()
            .collect())
    }

    fn for_organization(&self, organization_id: &str) -> Result<Vec<Match>, RepositoryError> {
        Ok(self
            .read()?
            .matches
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Match>, RepositoryError> {
        Ok(self.read()?.matches.clone())
    }

    fn delete_for_round(&self, round_id: Uuid) -> Result<usize, RepositoryError> {
        let mut state = self.write()?;
        let before = state.matches.len();
        state.matches.retain(|m| m.round_id != round_id);
        Ok(before - state.matches.len())
    }
}
