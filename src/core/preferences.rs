use std::collections::{HashMap, HashSet};

use crate::error::MatchingError;
use crate::models::{Preference, PreferenceOwner};

/// Weight assumed for organization preferences that declare none
pub const DEFAULT_ORGANIZATION_WEIGHT: f64 = 1.0;

/// One area a student is interested in
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAreaPreference {
    pub area_of_law: String,
    pub rank: Option<u32>,
}

/// One area an organization needs, with its weight
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationAreaPreference {
    pub area_of_law: String,
    pub weight: f64,
}

/// Lookup tables over declared preferences
///
/// Student lists are ordered by rank ascending (unranked last, declaration
/// order between equal ranks). Organization lists are ordered by weight
/// descending.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    students: HashMap<String, Vec<StudentAreaPreference>>,
    organizations: HashMap<String, Vec<OrganizationAreaPreference>>,
}

impl PreferenceStore {
    /// Build the store, rejecting malformed or duplicate records
    pub fn from_preferences(preferences: &[Preference]) -> Result<Self, MatchingError> {
        let mut store = PreferenceStore::default();
        let mut seen: HashSet<(&PreferenceOwner, &str)> = HashSet::new();

        for preference in preferences {
            if !seen.insert((&preference.owner, preference.area_of_law.as_str())) {
                return Err(MatchingError::validation(format!(
                    "duplicate preference for {:?} in area {}",
                    preference.owner, preference.area_of_law
                )));
            }

            match &preference.owner {
                PreferenceOwner::Student { student_id } => {
                    if preference.rank == Some(0) {
                        return Err(MatchingError::validation(format!(
                            "student {} has rank 0 for {}; ranks start at 1",
                            student_id, preference.area_of_law
                        )));
                    }
                    store
                        .students
                        .entry(student_id.clone())
                        .or_default()
                        .push(StudentAreaPreference {
                            area_of_law: preference.area_of_law.clone(),
                            rank: preference.rank,
                        });
                }
                PreferenceOwner::Organization { organization_id } => {
                    let weight = preference.weight.unwrap_or(DEFAULT_ORGANIZATION_WEIGHT);
                    if !weight.is_finite() || weight < 0.0 {
                        return Err(MatchingError::validation(format!(
                            "organization {} has invalid weight {} for {}",
                            organization_id, weight, preference.area_of_law
                        )));
                    }
                    store
                        .organizations
                        .entry(organization_id.clone())
                        .or_default()
                        .push(OrganizationAreaPreference {
                            area_of_law: preference.area_of_law.clone(),
                            weight,
                        });
                }
            }
        }

        for list in store.students.values_mut() {
            list.sort_by_key(|p| p.rank.unwrap_or(u32::MAX));
        }
        for list in store.organizations.values_mut() {
            list.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        }

        Ok(store)
    }

    /// Ranked preferences of a student; empty when none were declared
    pub fn student_preferences(&self, student_id: &str) -> &[StudentAreaPreference] {
        self.students
            .get(student_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Weighted preferences of an organization; empty when none were declared
    pub fn organization_preferences(&self, organization_id: &str) -> &[OrganizationAreaPreference] {
        self.organizations
            .get(organization_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_student(&self, student_id: &str) -> bool {
        !self.student_preferences(student_id).is_empty()
    }

    pub fn has_organization(&self, organization_id: &str) -> bool {
        !self.organization_preferences(organization_id).is_empty()
    }

    pub fn student_preference(&self, student_id: &str, area: &str) -> Option<&StudentAreaPreference> {
        self.student_preferences(student_id)
            .iter()
            .find(|p| p.area_of_law == area)
    }

    pub fn organization_weight(&self, organization_id: &str, area: &str) -> Option<f64> {
        self.organization_preferences(organization_id)
            .iter()
            .find(|p| p.area_of_law == area)
            .map(|p| p.weight)
    }

    /// 1-based position of `area` in the organization's weight order
    pub fn organization_rank(&self, organization_id: &str, area: &str) -> Option<u32> {
        self.organization_preferences(organization_id)
            .iter()
            .position(|p| p.area_of_law == area)
            .map(|idx| idx as u32 + 1)
    }

    pub fn organization_declares(&self, organization_id: &str, area: &str) -> bool {
        self.organization_weight(organization_id, area).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_preferences_sorted_by_rank() {
        let store = PreferenceStore::from_preferences(&[
            Preference::student("s1", "Tax", 3),
            Preference::student("s1", "Litigation", 1),
            Preference {
                rank: None,
                ..Preference::student("s1", "Family", 1)
            },
            Preference::student("s1", "Criminal", 2),
        ])
        .unwrap();

        let areas: Vec<&str> = store
            .student_preferences("s1")
            .iter()
            .map(|p| p.area_of_law.as_str())
            .collect();
        assert_eq!(areas, vec!["Litigation", "Criminal", "Tax", "Family"]);
    }

    #[test]
    fn test_organization_weights_and_rank() {
        let store = PreferenceStore::from_preferences(&[
            Preference::organization("o1", "Tax", 0.4),
            Preference::organization("o1", "Litigation", 0.9),
            Preference {
                weight: None,
                ..Preference::organization("o1", "Family", 0.0)
            },
        ])
        .unwrap();

        assert_eq!(store.organization_weight("o1", "Family"), Some(1.0));
        assert_eq!(store.organization_rank("o1", "Family"), Some(1));
        assert_eq!(store.organization_rank("o1", "Litigation"), Some(2));
        assert_eq!(store.organization_rank("o1", "Tax"), Some(3));
        assert!(!store.organization_declares("o1", "Criminal"));
        assert!(store.organization_preferences("missing").is_empty());
    }

    #[test]
    fn test_duplicate_area_rejected() {
        let result = PreferenceStore::from_preferences(&[
            Preference::student("s1", "Tax", 1),
            Preference::student("s1", "Tax", 2),
        ]);
        assert!(matches!(result, Err(MatchingError::Validation(_))));
    }

    #[test]
    fn test_same_area_for_different_owners_allowed() {
        let store = PreferenceStore::from_preferences(&[
            Preference::student("s1", "Tax", 1),
            Preference::student("s2", "Tax", 1),
            Preference::organization("s1", "Tax", 1.0),
        ])
        .unwrap();
        assert!(store.has_student("s1"));
        assert!(store.has_student("s2"));
        assert!(store.has_organization("s1"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PreferenceStore::from_preferences(&[Preference::student("s1", "Tax", 0)]).is_err());
        assert!(
            PreferenceStore::from_preferences(&[Preference::organization("o1", "Tax", -1.0)])
                .is_err()
        );
    }
}
