// Unit tests for the placement engine

use placement_engine::core::{
    preferences::PreferenceStore,
    scoring::{area_score, calculate_match_score, grade_score, letter_grade_points, location_score, rank_score, statement_score, work_preference_score, ScoreInputs},
    StudentAreaPreference,
};
use placement_engine::models::{
    GradeRecord, Organization, Preference, ScoringWeights, Statement, Student,
};

fn student_with(locations: &[&str], work: &[&str]) -> Student {
    let mut student = Student::new("s1");
    student.location_preferences = locations.iter().map(|s| s.to_string()).collect();
    student.work_preferences = work.iter().map(|s| s.to_string()).collect();
    student
}

fn organization_at(location: Option<&str>, work: &[&str]) -> Organization {
    let mut org = Organization::new("org-a", 2);
    org.location = location.map(str::to_string);
    org.work_types = work.iter().map(|s| s.to_string()).collect();
    org
}

#[test]
fn test_rank_score_decay() {
    assert_eq!(rank_score(Some(1)), 1.0);
    assert!((rank_score(Some(2)) - 0.8).abs() < 1e-9);
    assert!((rank_score(Some(5)) - 0.2).abs() < 1e-9);
    assert_eq!(rank_score(Some(6)), 0.0);
    assert_eq!(rank_score(Some(42)), 0.0);
}

#[test]
fn test_missing_rank_treated_as_five() {
    assert_eq!(rank_score(None), rank_score(Some(5)));
}

#[test]
fn test_area_score_averages_rank_and_weight() {
    assert_eq!(area_score(Some(1), 1.0), 1.0);
    assert!((area_score(Some(2), 0.5) - 0.65).abs() < 1e-9);
    // Organization weights above 1 cannot push the component past 1
    assert_eq!(area_score(Some(1), 3.0), 1.0);
}

#[test]
fn test_statement_score() {
    assert_eq!(statement_score(None), 0.0);
    assert_eq!(statement_score(Some(&Statement::new("s1", "Tax"))), 0.0);

    let mut graded = Statement::new("s1", "Tax");
    graded.statement_grade = Some(75);
    assert!((statement_score(Some(&graded)) - 0.75).abs() < 1e-9);
}

#[test]
fn test_location_and_work_scores() {
    let student = student_with(&["London", "Leeds"], &["remote", "hybrid"]);

    assert_eq!(location_score(&student, &organization_at(Some("Leeds"), &[])), 1.0);
    assert_eq!(location_score(&student, &organization_at(Some("York"), &[])), 0.0);
    assert_eq!(location_score(&student, &organization_at(None, &[])), 0.0);

    assert_eq!(work_preference_score(&student, &organization_at(None, &["remote"])), 0.5);
    assert_eq!(
        work_preference_score(&student, &organization_at(None, &["remote", "hybrid", "office"])),
        1.0
    );
    let no_prefs = student_with(&[], &[]);
    assert_eq!(work_preference_score(&no_prefs, &organization_at(None, &["remote"])), 0.0);
}

#[test]
fn test_letter_grades() {
    assert_eq!(letter_grade_points("A+"), Some(4.3));
    assert_eq!(letter_grade_points(" b- "), Some(2.7));
    assert_eq!(letter_grade_points("F"), Some(0.0));
    assert_eq!(letter_grade_points("pass"), None);
}

#[test]
fn test_grade_score_from_letters_and_fallback() {
    let student = Student::new("s1");
    let record = GradeRecord::new("s1")
        .with_grade("contracts", "A+")
        .with_grade("torts", "A+");
    assert!((grade_score(&student, Some(&record)) - 1.0).abs() < 1e-9);

    let mut averaged = Student::new("s2");
    averaged.grade_average = Some(2.15);
    assert!((grade_score(&averaged, None) - 0.5).abs() < 1e-9);

    let unusable = GradeRecord::new("s2").with_grade("ethics", "pass");
    assert!((grade_score(&averaged, Some(&unusable)) - 0.5).abs() < 1e-9);

    assert_eq!(grade_score(&student, None), 0.0);
}

#[test]
fn test_match_score_full_marks() {
    let mut student = student_with(&["London"], &["remote"]);
    student.grade_average = Some(4.3);
    let org = organization_at(Some("London"), &["remote"]);
    let mut statement = Statement::new("s1", "Tax");
    statement.statement_grade = Some(100);
    let pref = StudentAreaPreference {
        area_of_law: "Tax".to_string(),
        rank: Some(1),
    };

    let inputs = ScoreInputs {
        student: &student,
        organization: &org,
        area_of_law: "Tax",
        student_preference: Some(&pref),
        organization_weight: Some(1.0),
        statement: Some(&statement),
        grades: None,
    };
    let (score, breakdown) = calculate_match_score(&inputs, &ScoringWeights::default());
    assert!((score - 1.0).abs() < 1e-9);
    assert_eq!(breakdown.location_score, 1.0);
    assert_eq!(breakdown.statement_score, 1.0);
}

#[test]
fn test_match_score_stays_bounded() {
    let student = Student::new("s1");
    let org = Organization::new("org-a", 1);
    let weights = ScoringWeights::default();

    for rank in [None, Some(1), Some(3), Some(9)] {
        for org_weight in [0.0, 0.5, 1.0, 4.0] {
            let pref = StudentAreaPreference {
                area_of_law: "Tax".to_string(),
                rank,
            };
            let inputs = ScoreInputs {
                student: &student,
                organization: &org,
                area_of_law: "Tax",
                student_preference: Some(&pref),
                organization_weight: Some(org_weight),
                statement: None,
                grades: None,
            };
            let (score, _) = calculate_match_score(&inputs, &weights);
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }
}

#[test]
fn test_preference_store_ordering() {
    let store = PreferenceStore::from_preferences(&[
        Preference::student("s1", "Tax", 3),
        Preference::student("s1", "Family", 1),
        Preference::organization("org-a", "Tax", 0.4),
        Preference::organization("org-a", "Family", 0.9),
    ])
    .unwrap();

    let areas: Vec<&str> = store
        .student_preferences("s1")
        .iter()
        .map(|p| p.area_of_law.as_str())
        .collect();
    assert_eq!(areas, vec!["Family", "Tax"]);
    assert_eq!(store.organization_rank("org-a", "Family"), Some(1));
    assert_eq!(store.organization_weight("org-a", "Tax"), Some(0.4));
    assert!(store.student_preferences("nobody").is_empty());
}

#[test]
fn test_preference_store_rejects_duplicates() {
    let result = PreferenceStore::from_preferences(&[
        Preference::student("s1", "Tax", 1),
        Preference::student("s1", "Tax", 2),
    ]);
    assert!(result.is_err());
}
