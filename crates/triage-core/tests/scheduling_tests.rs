//! End-to-end scheduling tests against the in-memory and SQLite stores.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use triage_core::capacity::{AssignmentOutcome, AssignmentPlanner, CapacityLedger};
use triage_core::models::{
    demo_roster, CaseStatus, Department, DutyStatus, Intake, Provider, RiskTier, TimeWindow,
    Vitals,
};
use triage_core::service::{IntakeRequest, TriageService};
use triage_core::store::{MemoryStore, TriageStore};
use triage_core::{SqliteStore, TriageConfig, TriageError};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
}

fn memory_service(providers: Vec<Provider>) -> TriageService<MemoryStore> {
    TriageService::with_business_day(MemoryStore::with_providers(providers), TriageConfig::default(), day())
        .unwrap()
        .with_clock(|| at(day(), 9))
}

fn request(patient: &str, symptoms: &[&str]) -> IntakeRequest {
    IntakeRequest {
        patient_id: patient.into(),
        date: day(),
        window: TimeWindow::Morning,
        intake: Intake::new(symptoms.iter().map(|s| s.to_string()).collect()),
    }
}

fn positions(service: &TriageService<impl TriageStore>, department: Department) -> Vec<u32> {
    service
        .queue(department, day())
        .unwrap()
        .iter()
        .map(|e| e.queue_position.unwrap())
        .collect()
}

fn full(mut provider: Provider) -> Provider {
    provider.current_load = provider.max_daily;
    provider.duty_status = DutyStatus::Busy;
    provider
}

// ============================================================================
// Assignment scenarios
// ============================================================================

#[test]
fn test_full_regulars_fall_back_to_backup() {
    let department = Department::EmergencyDepartment;
    let mut roster: Vec<Provider> = (1..=4)
        .map(|i| full(Provider::new(format!("reg_{}", i), format!("Dr. Regular {}", i), department, 10)))
        .collect();
    roster.push(Provider::backup("backup", "Dr. Backup", department, 15));

    let store = MemoryStore::with_providers(roster.clone());
    let ledger = CapacityLedger::with_providers(roster, Some(day()));
    let planner = AssignmentPlanner::new(&ledger, &store);

    let assignment = planner.assign(department, RiskTier::High, day()).unwrap();
    assert_eq!(assignment.provider.id, "backup");
    assert_eq!(assignment.provider.current_load, 1);
    assert_eq!(assignment.alert.as_deref(), Some("Assigned to backup provider Dr. Backup"));
}

#[test]
fn test_everyone_full_needs_admin() {
    let department = Department::UrgentCare;
    let roster = vec![
        full(Provider::new("reg", "Dr. Regular", department, 10)),
        full(Provider::backup("backup", "Dr. Backup", department, 15)),
    ];
    let store = MemoryStore::with_providers(roster.clone());
    let ledger = CapacityLedger::with_providers(roster, Some(day()));
    let planner = AssignmentPlanner::new(&ledger, &store);

    let outcome = AssignmentOutcome::from_result(planner.assign(department, RiskTier::High, day())).unwrap();
    assert!(outcome.provider.is_none());
    assert!(outcome.needs_admin_intervention);
    assert_eq!(outcome.alert.as_deref(), Some("no providers available in Urgent Care"));

    let stored = store.load_providers(department).unwrap();
    assert!(stored.iter().all(|p| p.current_load == p.max_daily));
}

#[test]
fn test_exhaustion_creates_no_entry() {
    let service = memory_service(vec![Provider::new("solo", "Dr. Solo", Department::GeneralPractice, 1)]);
    service.submit_intake(&request("p1", &["Headache"])).unwrap();

    let err = service.submit_intake(&request("p2", &["Cough"])).unwrap_err();
    assert!(matches!(err, TriageError::CapacityExhausted { .. }));
    assert!(err.needs_admin_intervention());
    assert_eq!(service.store().entry_count(), 1);
}

// ============================================================================
// Queue scenarios
// ============================================================================

#[test]
fn test_queue_orders_by_priority_then_arrival() {
    // Each submission arrives one minute after the previous one
    let minutes = Arc::new(AtomicI64::new(0));
    let ticks = Arc::clone(&minutes);
    let service = TriageService::with_business_day(
        MemoryStore::with_providers(demo_roster()),
        TriageConfig::default(),
        day(),
    )
    .unwrap()
    .with_clock(move || at(day(), 9) + Duration::minutes(ticks.fetch_add(1, Ordering::SeqCst)));

    let low = service.submit_intake(&request("p1", &["Sore throat"])).unwrap();
    let higher = service.submit_intake(&request("p2", &["Back pain"])).unwrap();
    let same_as_low = service.submit_intake(&request("p3", &["Cough"])).unwrap();

    let queue = service.queue(Department::GeneralPractice, day()).unwrap();
    let order: Vec<&str> = queue.iter().map(|e| e.case_id.as_str()).collect();
    assert_eq!(
        order,
        vec![
            higher.entry.case_id.as_str(),
            low.entry.case_id.as_str(),
            same_as_low.entry.case_id.as_str()
        ]
    );
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1, 2, 3]);
}

#[test]
fn test_cancel_and_reschedule_keep_positions_dense() {
    let service = memory_service(demo_roster());
    let bookings: Vec<_> = ["p1", "p2", "p3", "p4"]
        .iter()
        .map(|p| service.submit_intake(&request(p, &["Headache"])).unwrap())
        .collect();
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1, 2, 3, 4]);

    service.cancel_case(&bookings[1].entry.case_id).unwrap();
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1, 2, 3]);

    let moved = service
        .reschedule_case(
            &bookings[0].entry.case_id,
            day(),
            "11:00 AM".parse().unwrap(),
            Some(Department::UrgentCare),
        )
        .unwrap();
    assert_eq!(moved.entry.queue_position, Some(1));
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1, 2]);
    assert_eq!(positions(&service, Department::UrgentCare), vec![1]);

    service.start_case(&bookings[2].entry.case_id, None).unwrap();
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1]);
}

#[test]
fn test_reschedule_requires_pending() {
    let service = memory_service(demo_roster());
    let booking = service.submit_intake(&request("p1", &["Headache"])).unwrap();
    service.start_case(&booking.entry.case_id, None).unwrap();

    let err = service
        .reschedule_case(&booking.entry.case_id, day(), "9:00 AM".parse().unwrap(), None)
        .unwrap_err();
    assert!(matches!(err, TriageError::InvalidTransition { .. }));
}

#[test]
fn test_live_queue_flags_delayed_high_risk() {
    let minutes = Arc::new(AtomicI64::new(0));
    let clock = Arc::clone(&minutes);
    let service = TriageService::with_business_day(
        MemoryStore::with_providers(demo_roster()),
        TriageConfig::default(),
        day(),
    )
    .unwrap()
    .with_clock(move || at(day(), 9) + Duration::minutes(clock.load(Ordering::SeqCst)));

    let critical = IntakeRequest {
        intake: Intake::new(vec!["Chest pain".into()]).with_vitals(Vitals::new().with_oxygen_level(92)),
        ..request("p1", &[])
    };
    service.submit_intake(&critical).unwrap();

    let live = service.live_queue(Department::EmergencyDepartment, day()).unwrap();
    assert_eq!(live[0].severity_score, 100);
    assert!(!live[0].delayed);

    minutes.store(16, Ordering::SeqCst);
    let live = service.live_queue(Department::EmergencyDepartment, day()).unwrap();
    assert_eq!(live[0].waiting_minutes, 16);
    assert_eq!(live[0].severity_score, 103);
    assert!(live[0].delayed);
}

// ============================================================================
// Capacity lifecycle
// ============================================================================

#[test]
fn test_new_day_rolls_over_before_first_assignment() {
    let days = Arc::new(AtomicI64::new(0));
    let clock = Arc::clone(&days);
    let service = TriageService::with_business_day(
        MemoryStore::with_providers(vec![Provider::new("solo", "Dr. Solo", Department::GeneralPractice, 1)]),
        TriageConfig::default(),
        day(),
    )
    .unwrap()
    .with_clock(move || at(day(), 9) + Duration::days(clock.load(Ordering::SeqCst)));

    service.submit_intake(&request("p1", &["Headache"])).unwrap();
    assert!(service.submit_intake(&request("p2", &["Headache"])).is_err());

    days.store(1, Ordering::SeqCst);
    let booking = service.submit_intake(&request("p2", &["Headache"])).unwrap();
    assert_eq!(booking.provider.unwrap().current_load, 1);

    let stored = service.store().load_all_providers().unwrap();
    assert_eq!(stored[0].current_load, 1);
}

#[test]
fn test_completed_case_keeps_load_cancelled_releases() {
    let service = memory_service(vec![Provider::new("solo", "Dr. Solo", Department::GeneralPractice, 2)]);
    let first = service.submit_intake(&request("p1", &["Headache"])).unwrap();
    let second = service.submit_intake(&request("p2", &["Headache"])).unwrap();

    service.start_case(&first.entry.case_id, None).unwrap();
    service.complete_case(&first.entry.case_id).unwrap();
    let outcome = service.cancel_case(&second.entry.case_id).unwrap();

    let solo = outcome.released.unwrap();
    assert_eq!(solo.current_load, 1);
    assert_eq!(solo.duty_status, DutyStatus::Available);
    assert_eq!(service.get_case(&first.entry.case_id).unwrap().status, CaseStatus::Completed);
}

#[test]
fn test_concurrent_submissions_never_exceed_capacity() {
    let roster = vec![
        Provider::new("a", "Dr. A", Department::GeneralPractice, 3),
        Provider::backup("b", "Dr. B", Department::GeneralPractice, 2),
    ];
    let service = memory_service(roster);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..12)
            .map(|i| {
                let service = &service;
                scope.spawn(move || service.submit_intake(&request(&format!("p{}", i), &["Headache"])))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let booked = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(booked, 5);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, TriageError::CapacityExhausted { .. })));

    for provider in service.list_providers(None).unwrap() {
        assert_eq!(provider.current_load, provider.max_daily);
    }
    assert_eq!(positions(&service, Department::GeneralPractice), vec![1, 2, 3, 4, 5]);
}

// ============================================================================
// SQLite persistence
// ============================================================================

#[test]
fn test_sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triage.db");

    let case_id = {
        let service = TriageService::with_business_day(
            SqliteStore::open(&path).unwrap(),
            TriageConfig::default(),
            day(),
        )
        .unwrap()
        .with_clock(|| at(day(), 9));
        assert_eq!(service.seed_roster_if_empty(demo_roster()).unwrap(), 12);

        let first = service.submit_intake(&request("p1", &["Severe pain"])).unwrap();
        service.submit_intake(&request("p2", &["Head injury"])).unwrap();
        first.entry.case_id
    };

    let service = TriageService::with_business_day(
        SqliteStore::open(&path).unwrap(),
        TriageConfig::default(),
        day(),
    )
    .unwrap()
    .with_clock(|| at(day(), 10));
    assert_eq!(service.seed_roster_if_empty(demo_roster()).unwrap(), 0);

    let load: u32 = service
        .list_providers(Some(Department::UrgentCare))
        .unwrap()
        .iter()
        .map(|p| p.current_load)
        .sum();
    assert_eq!(load, 2);

    // Head injury (45) outranks severe pain (40)
    assert_eq!(positions(&service, Department::UrgentCare), vec![1, 2]);
    assert_eq!(service.get_case(&case_id).unwrap().queue_position, Some(2));

    service.cancel_case(&case_id).unwrap();
    assert_eq!(positions(&service, Department::UrgentCare), vec![1]);
}
