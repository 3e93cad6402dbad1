// Integration tests for the placement engine

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use actix_web::{test as actix_test, web, App};
use placement_engine::core::{Matcher, MatchingInput};
use placement_engine::models::{
    AlgorithmType, GradeRecord, MatchStatus, Organization, Preference,
    RoundStatus, ScoringWeights, Statement, Student,
};
use placement_engine::routes::{configure_routes, AppState};
use placement_engine::services::{
    InMemoryStore, MatchRepository, MatchingDefaults, MatchingService, OrganizationRepository,
    Repositories, Snapshot,
};
use placement_engine::{Match, MatchingRound};

const AREAS: [&str; 4] = ["Litigation", "Tax", "Family", "Corporate"];
const CITIES: [&str; 3] = ["London", "Leeds", "Bristol"];

/// Deterministic mid-sized cohort with overlapping interests
fn create_test_snapshot(students: usize, organizations: usize) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for i in 0..organizations {
        let mut org = Organization::new(format!("org-{}", i), 1 + (i % 3) as u32);
        org.location = Some(CITIES[i % CITIES.len()].to_string());
        org.work_types.insert(if i % 2 == 0 { "remote" } else { "office" }.to_string());
        snapshot.organizations.push(org);

        snapshot
            .preferences
            .push(Preference::organization(format!("org-{}", i), AREAS[i % AREAS.len()], 1.0));
        snapshot.preferences.push(Preference::organization(
            format!("org-{}", i),
            AREAS[(i + 1) % AREAS.len()],
            0.5,
        ));
    }

    for i in 0..students {
        let id = format!("s{}", i);
        let mut student = Student::new(id.clone());
        student.location_preferences.insert(CITIES[i % CITIES.len()].to_string());
        student.work_preferences.insert("remote".to_string());
        student.grade_average = Some(2.0 + (i % 5) as f64 * 0.5);
        snapshot.students.push(student);

        for rank in 0..3 {
            snapshot.preferences.push(Preference::student(
                id.clone(),
                AREAS[(i + rank) % AREAS.len()],
                rank as u32 + 1,
            ));
        }

        let mut statement = Statement::new(id.clone(), AREAS[i % AREAS.len()]);
        statement.statement_grade = Some(50 + (i * 7 % 50) as u32);
        snapshot.statements.push(statement);

        if i % 2 == 0 {
            snapshot
                .grades
                .push(GradeRecord::new(id).with_grade("contracts", "B+").with_grade("torts", "A-"));
        }
    }

    snapshot
}

fn matching_input(snapshot: &Snapshot) -> MatchingInput {
    MatchingInput {
        students: snapshot.students.clone(),
        organizations: snapshot.organizations.clone(),
        preferences: snapshot.preferences.clone(),
        grades: snapshot
            .grades
            .iter()
            .map(|g| (g.student_id.clone(), g.clone()))
            .collect(),
        statements: snapshot
            .statements
            .iter()
            .map(|s| ((s.student_id.clone(), s.area_of_law.clone()), s.clone()))
            .collect(),
    }
}

fn service_for(snapshot: Snapshot) -> (Arc<InMemoryStore>, MatchingService) {
    let store = Arc::new(InMemoryStore::from_snapshot(snapshot));
    let service = MatchingService::new(Repositories::from_store(store.clone()), MatchingDefaults::default());
    (store, service)
}

fn assert_round_invariants(snapshot: &Snapshot, matches: &[Match]) {
    let mut students = HashSet::new();
    let mut per_org: HashMap<&str, u32> = HashMap::new();
    for m in matches {
        assert!(students.insert(m.student_id.as_str()), "{} matched twice", m.student_id);
        *per_org.entry(m.organization_id.as_str()).or_default() += 1;
        assert!((0.0..=1.0).contains(&m.match_score));
    }
    for org in &snapshot.organizations {
        let used = per_org.get(org.id.as_str()).copied().unwrap_or(0);
        assert!(used <= org.remaining_positions(), "{} overfilled", org.id);
    }
}

#[test]
fn test_integration_weighted_round_end_to_end() {
    let snapshot = create_test_snapshot(40, 10);
    let (_, service) = service_for(snapshot.clone());

    let round = service.create_round("Autumn intake", None, None, None).unwrap();
    let completed = service.run_matching(round.id, Some("coordinator".to_string())).unwrap();

    assert_eq!(completed.status, RoundStatus::Completed);
    assert_eq!(completed.total_students, 40);
    assert_eq!(completed.total_organizations, 10);
    assert!(completed.matched_students > 0);

    let matches = service.matches_for_round(round.id).unwrap();
    assert_eq!(matches.len(), completed.matched_students);
    assert!(matches.iter().all(|m| m.status == MatchStatus::Pending));
    assert!(matches.iter().all(|m| m.score_breakdown.is_some()));
    assert_round_invariants(&snapshot, &matches);
}

#[test]
fn test_integration_priority_round_end_to_end() {
    let snapshot = create_test_snapshot(40, 10);
    let (_, service) = service_for(snapshot.clone());

    let round = service
        .create_round("Priority intake", None, Some(AlgorithmType::PreferencePriority), None)
        .unwrap();
    let completed = service.run_matching(round.id, None).unwrap();
    let matches = service.matches_for_round(round.id).unwrap();

    assert_eq!(completed.status, RoundStatus::Completed);
    assert_eq!(matches.len(), completed.matched_students);
    assert!(matches.iter().all(|m| m.score_breakdown.is_none()));
    assert_round_invariants(&snapshot, &matches);
}

#[test]
fn test_weighted_strategy_is_deterministic() {
    let snapshot = create_test_snapshot(30, 8);
    let matcher = Matcher::new(AlgorithmType::WeightedPreference, ScoringWeights::default());

    let first = matcher.run(matching_input(&snapshot)).unwrap();
    let second = matcher.run(matching_input(&snapshot)).unwrap();

    assert_eq!(
        serde_json::to_string(&first.proposals).unwrap(),
        serde_json::to_string(&second.proposals).unwrap()
    );
}

#[test]
fn test_oversized_weights_are_normalized() {
    let snapshot = create_test_snapshot(10, 4);
    let weights = ScoringWeights {
        area_of_law: 0.5,
        statement: 0.5,
        location: 0.5,
        work_preference: 0.5,
        grade: 0.5,
    };

    let result = Matcher::new(AlgorithmType::WeightedPreference, weights)
        .run(matching_input(&snapshot))
        .unwrap();
    assert!(result.summary.weights_normalized);
    for proposal in &result.proposals {
        let components = proposal.components.unwrap();
        let weight_sum = components.area_of_law_weight
            + components.statement_weight
            + components.location_weight
            + components.work_preference_weight
            + components.grade_weight;
        assert!((weight_sum - 1.0).abs() <= 0.01);
        assert!(proposal.match_score <= 1.0);
    }
}

#[test]
fn test_capacity_from_prior_placements_respected() {
    let mut snapshot = create_test_snapshot(20, 5);
    for org in &mut snapshot.organizations {
        org.filled_positions = org.available_positions.saturating_sub(1);
    }
    let (_, service) = service_for(snapshot.clone());

    let round = service.create_round("Top-up", None, None, None).unwrap();
    service.run_matching(round.id, None).unwrap();
    let matches = service.matches_for_round(round.id).unwrap();

    assert!(matches.len() <= snapshot.organizations.len());
    assert_round_invariants(&snapshot, &matches);
}

#[test]
fn test_rerun_of_completed_round_creates_nothing() {
    let (store, service) = service_for(create_test_snapshot(12, 4));
    let round = service.create_round("Idempotent", None, None, None).unwrap();

    let first = service.run_matching(round.id, None).unwrap();
    let count = store.for_round(round.id).unwrap().len();
    let second = service.run_matching(round.id, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.for_round(round.id).unwrap().len(), count);
}

#[test]
fn test_approving_every_match_never_overfills() {
    let snapshot = create_test_snapshot(30, 6);
    let (store, service) = service_for(snapshot.clone());

    // Two rounds over the same snapshot propose twice as many placements
    let mut matches = Vec::new();
    for name in ["First", "Second"] {
        let round = service.create_round(name, None, None, None).unwrap();
        service.run_matching(round.id, None).unwrap();
        matches.extend(service.matches_for_round(round.id).unwrap());
    }

    for m in &matches {
        let _ = service.update_match_status(m.id, MatchStatus::Accepted, None, None);
    }

    for org in &snapshot.organizations {
        let stored = OrganizationRepository::get(store.as_ref(), &org.id).unwrap().unwrap();
        assert!(stored.filled_positions <= stored.available_positions);
        let accepted = service
            .matches_for_organization(&org.id)
            .unwrap()
            .iter()
            .filter(|m| m.status.occupies_position())
            .count() as u32;
        assert_eq!(accepted, stored.filled_positions);
    }
}

#[tokio::test]
async fn test_parallel_approvals_on_shared_organization() {
    let mut snapshot = Snapshot::default();
    snapshot.organizations.push(Organization::new("org-a", 2));
    snapshot.preferences.push(Preference::organization("org-a", "Tax", 1.0));
    for i in 0..6 {
        snapshot.students.push(Student::new(format!("s{}", i)));
        snapshot.preferences.push(Preference::student(format!("s{}", i), "Tax", 1));
    }
    let (store, service) = service_for(snapshot);
    let service = Arc::new(service);

    // Each round fills both positions, so three rounds yield six proposals
    let mut match_ids = Vec::new();
    for i in 0..3 {
        let round = service.create_round(&format!("Round {}", i), None, None, None).unwrap();
        service.run_matching(round.id, None).unwrap();
        match_ids.extend(service.matches_for_round(round.id).unwrap().into_iter().map(|m| m.id));
    }
    assert_eq!(match_ids.len(), 6);

    let tasks: Vec<_> = match_ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::task::spawn_blocking(move || {
                service.update_match_status(id, MatchStatus::Accepted, Some("admin".to_string()), None)
            })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 2);
    let org = OrganizationRepository::get(store.as_ref(), "org-a").unwrap().unwrap();
    assert_eq!(org.filled_positions, 2);
}

#[actix_web::test]
async fn test_http_round_lifecycle() {
    let (_, service) = service_for(create_test_snapshot(8, 3));
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(service)))
            .configure(configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/rounds")
        .set_json(serde_json::json!({
            "name": "HTTP round",
            "algorithmType": "weighted_preference"
        }))
        .to_request();
    let round: MatchingRound = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(round.status, RoundStatus::Pending);

    let req = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/rounds/{}/run", round.id))
        .set_json(serde_json::json!({ "userId": "coordinator" }))
        .to_request();
    let completed: MatchingRound = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(completed.status, RoundStatus::Completed);
    assert_eq!(completed.initiated_by.as_deref(), Some("coordinator"));

    let req = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/rounds/{}/matches", round.id))
        .to_request();
    let matches: Vec<Match> = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(matches.len(), completed.matched_students);
    let first = &matches[0];

    let req = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/matches/{}/status", first.id))
        .set_json(serde_json::json!({ "status": "accepted", "approverId": "admin" }))
        .to_request();
    let accepted: Match = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(accepted.status, MatchStatus::Accepted);

    let req = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/matches/{}/status", first.id))
        .set_json(serde_json::json!({ "status": "REJECTED" }))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);

    let req = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/statistics?roundId={}", round.id))
        .to_request();
    let stats: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["matches"]["total"], matches.len());
    assert_eq!(stats["matches"]["by_status"]["ACCEPTED"], 1);
    assert_eq!(stats["round"]["status"], "COMPLETED");
}

#[actix_web::test]
async fn test_http_validation_errors() {
    let (_, service) = service_for(Snapshot::default());
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(service)))
            .configure(configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/rounds")
        .set_json(serde_json::json!({ "name": "" }))
        .to_request();
    assert_eq!(actix_test::call_service(&app, req).await.status().as_u16(), 400);

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/rounds")
        .set_json(serde_json::json!({ "name": "x", "algorithmType": "random" }))
        .to_request();
    assert_eq!(actix_test::call_service(&app, req).await.status().as_u16(), 400);

    let req = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/statistics?roundId={}", uuid::Uuid::new_v4()))
        .to_request();
    assert_eq!(actix_test::call_service(&app, req).await.status().as_u16(), 404);

    let req = actix_test::TestRequest::get()
        .uri("/api/v1/students/ghost/matches")
        .to_request();
    assert_eq!(actix_test::call_service(&app, req).await.status().as_u16(), 404);
}

#[test]
fn test_demo_snapshot_loads_and_matches() {
    let snapshot = Snapshot::load("demos/snapshot.json").unwrap();
    assert_eq!(snapshot.students.len(), 3);
    assert_eq!(snapshot.grades.len(), 1);

    let (_, service) = service_for(snapshot.clone());
    let round = service.create_round("Demo", None, None, None).unwrap();
    let completed = service.run_matching(round.id, None).unwrap();
    assert_eq!(completed.matched_students, 3);
    assert_round_invariants(&snapshot, &service.matches_for_round(round.id).unwrap());
}
