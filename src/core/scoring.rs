use crate::core::preferences::StudentAreaPreference;
use crate::models::{GradeRecord, Organization, ScoreBreakdown, ScoringWeights, Statement, Student};

/// Score lost per step down a student's ranking
pub const RANK_DECAY: f64 = 0.2;

/// Rank assumed for a student preference without one
pub const DEFAULT_RANK: u32 = 5;

/// Top of the letter-grade point scale (A+)
pub const MAX_GRADE_POINTS: f64 = 4.3;

/// Everything needed to score one (student, organization, area) triple
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub student: &'a Student,
    pub organization: &'a Organization,
    pub area_of_law: &'a str,
    pub student_preference: Option<&'a StudentAreaPreference>,
    pub organization_weight: Option<f64>,
    pub statement: Option<&'a Statement>,
    pub grades: Option<&'a GradeRecord>,
}

/// Calculate a match score in [0, 1] and its component breakdown
///
/// Scoring formula:
/// score = (
///     area_score * w_area +            # rank decay averaged with org weight
///     statement_score * w_statement +  # statement grade / 100
///     location_score * w_location +    # org location in student's set
///     work_score * w_work +            # share of student's work modes offered
///     grade_score * w_grade            # letter-grade average / 4.3
/// )
///
/// `weights` are used as given; callers normalize them first.
pub fn calculate_match_score(inputs: &ScoreInputs<'_>, weights: &ScoringWeights) -> (f64, ScoreBreakdown) {
    let area = match inputs.student_preference {
        Some(pref) => area_score(pref.rank, inputs.organization_weight.unwrap_or(0.0)),
        None => 0.0,
    };

    let breakdown = ScoreBreakdown {
        area_of_law_score: area,
        area_of_law_weight: weights.area_of_law,
        statement_score: statement_score(inputs.statement),
        statement_weight: weights.statement,
        location_score: location_score(inputs.student, inputs.organization),
        location_weight: weights.location,
        work_preference_score: work_preference_score(inputs.student, inputs.organization),
        work_preference_weight: weights.work_preference,
        grade_score: grade_score(inputs.student, inputs.grades),
        grade_weight: weights.grade,
    };

    (breakdown.total().clamp(0.0, 1.0), breakdown)
}

/// Rank 1 scores 1.0, each further rank loses `RANK_DECAY`, floored at 0
#[inline]
pub fn rank_score(rank: Option<u32>) -> f64 {
    let rank = rank.unwrap_or(DEFAULT_RANK).max(1);
    (1.0 - (rank - 1) as f64 * RANK_DECAY).clamp(0.0, 1.0)
}

/// Average of the student's rank score and the organization's weight
#[inline]
pub fn area_score(rank: Option<u32>, organization_weight: f64) -> f64 {
    ((rank_score(rank) + organization_weight) / 2.0).clamp(0.0, 1.0)
}

/// Graded statements contribute grade / 100; ungraded or missing ones 0
#[inline]
pub fn statement_score(statement: Option<&Statement>) -> f64 {
    statement
        .and_then(|s| s.statement_grade)
        .map(|grade| (grade as f64 / Statement::MAX_GRADE as f64).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

#[inline]
pub fn location_score(student: &Student, organization: &Organization) -> f64 {
    match &organization.location {
        Some(location) if student.location_preferences.contains(location) => 1.0,
        _ => 0.0,
    }
}

/// Share of the student's work modes the organization offers
#[inline]
pub fn work_preference_score(student: &Student, organization: &Organization) -> f64 {
    let common = student
        .work_preferences
        .intersection(&organization.work_types)
        .count();
    common as f64 / student.work_preferences.len().max(1) as f64
}

/// Grade points for a letter grade, `None` for anything unrecognised
pub fn letter_grade_points(letter: &str) -> Option<f64> {
    let points = match letter.trim().to_ascii_uppercase().as_str() {
        "A+" => 4.3,
        "A" => 4.0,
        "A-" => 3.7,
        "B+" => 3.3,
        "B" => 3.0,
        "B-" => 2.7,
        "C+" => 2.3,
        "C" => 2.0,
        "C-" => 1.7,
        "D+" => 1.3,
        "D" => 1.0,
        "D-" => 0.7,
        "F" => 0.0,
        _ => return None,
    };
    Some(points)
}

/// Normalized academic standing in [0, 1]
///
/// Uses the mean of recognised course letter grades. Falls back to the
/// student's numeric grade average when no letters are usable, and to 0
/// when neither is available.
pub fn grade_score(student: &Student, grades: Option<&GradeRecord>) -> f64 {
    let points: Vec<f64> = grades
        .map(|record| {
            record
                .course_grades
                .values()
                .filter_map(|letter| letter_grade_points(letter))
                .collect()
        })
        .unwrap_or_default();

    let average = if points.is_empty() {
        match student.grade_average {
            Some(avg) if avg.is_finite() => avg,
            _ => return 0.0,
        }
    } else {
        points.iter().sum::<f64>() / points.len() as f64
    };

    (average / MAX_GRADE_POINTS).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        let mut student = Student::new("s1");
        student.location_preferences.insert("Toronto".to_string());
        student.work_preferences.insert("remote".to_string());
        student.work_preferences.insert("hybrid".to_string());
        student
    }

    fn organization() -> Organization {
        let mut org = Organization::new("o1", 2);
        org.location = Some("Toronto".to_string());
        org.work_types.insert("hybrid".to_string());
        org
    }

    #[test]
    fn test_rank_score_decay_and_clamp() {
        assert_eq!(rank_score(Some(1)), 1.0);
        assert!((rank_score(Some(2)) - 0.8).abs() < 1e-9);
        assert!((rank_score(Some(5)) - 0.2).abs() < 1e-9);
        assert_eq!(rank_score(Some(6)), 0.0);
        assert_eq!(rank_score(Some(40)), 0.0);
        assert!((rank_score(None) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_area_score_bounded() {
        assert_eq!(area_score(Some(1), 1.0), 1.0);
        assert!((area_score(Some(2), 1.0) - 0.9).abs() < 1e-9);
        assert_eq!(area_score(Some(1), 3.0), 1.0);
    }

    #[test]
    fn test_statement_score() {
        let mut statement = Statement::new("s1", "Tax");
        assert_eq!(statement_score(Some(&statement)), 0.0);
        statement.statement_grade = Some(80);
        assert!((statement_score(Some(&statement)) - 0.8).abs() < 1e-9);
        assert_eq!(statement_score(None), 0.0);
    }

    #[test]
    fn test_location_and_work_scores() {
        let student = student();
        let org = organization();
        assert_eq!(location_score(&student, &org), 1.0);
        assert!((work_preference_score(&student, &org) - 0.5).abs() < 1e-9);

        let empty = Student::new("s2");
        assert_eq!(location_score(&empty, &org), 0.0);
        assert_eq!(work_preference_score(&empty, &org), 0.0);
    }

    #[test]
    fn test_grade_score_from_letters() {
        let student = Student::new("s1");
        let record = GradeRecord::new("s1")
            .with_grade("contracts", "A+")
            .with_grade("torts", "B")
            .with_grade("lrw_case_brief", "Pass");
        let expected = ((4.3 + 3.0) / 2.0) / 4.3;
        assert!((grade_score(&student, Some(&record)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_grade_score_fallbacks() {
        let mut student = Student::new("s1");
        assert_eq!(grade_score(&student, None), 0.0);

        student.grade_average = Some(3.44);
        assert!((grade_score(&student, None) - 0.8).abs() < 1e-9);

        student.grade_average = Some(9.0);
        assert_eq!(grade_score(&student, Some(&GradeRecord::new("s1"))), 1.0);
    }

    #[test]
    fn test_full_score_with_all_components() {
        let student = student();
        let org = organization();
        let pref = StudentAreaPreference {
            area_of_law: "Tax".to_string(),
            rank: Some(1),
        };
        let mut statement = Statement::new("s1", "Tax");
        statement.statement_grade = Some(100);
        let grades = GradeRecord::new("s1").with_grade("contracts", "A+");

        let inputs = ScoreInputs {
            student: &student,
            organization: &org,
            area_of_law: "Tax",
            student_preference: Some(&pref),
            organization_weight: Some(1.0),
            statement: Some(&statement),
            grades: Some(&grades),
        };
        let weights = ScoringWeights::default();
        let (score, breakdown) = calculate_match_score(&inputs, &weights);

        // everything maxed except work preference (0.5)
        let expected = 1.0 - weights.work_preference * 0.5;
        assert!((score - expected).abs() < 1e-9);
        assert_eq!(breakdown.area_of_law_score, 1.0);
        assert_eq!(breakdown.grade_weight, weights.grade);
    }

    #[test]
    fn test_missing_student_preference_zeroes_area() {
        let student = Student::new("s1");
        let org = Organization::new("o1", 1);
        let inputs = ScoreInputs {
            student: &student,
            organization: &org,
            area_of_law: "Tax",
            student_preference: None,
            organization_weight: Some(1.0),
            statement: None,
            grades: None,
        };
        let (score, breakdown) = calculate_match_score(&inputs, &ScoringWeights::default());
        assert_eq!(score, 0.0);
        assert_eq!(breakdown.area_of_law_score, 0.0);
    }
}
