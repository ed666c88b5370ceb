use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use skillpay::catalog::SkillCatalog;
use skillpay::incidents::{IncidentLedger, NewIncident};
use skillpay::qualification::{Qualifications, SkillStatus};
use skillpay::storage::Database;
use skillpay::PayError;

const CATALOG: &str = r#"
[[skills]]
id = "forklift"
name = "Forklift operation"
category = "warehouse"
verification = "theory_practice"
bonus = "3.00"
criteria = ["Pre-shift inspection", "Reverse parking"]

[[tests]]
id = "warehouse-basics"
name = "Warehouse basics"
skills = ["forklift"]
"#;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn prepared(dir: &TempDir) -> (SkillCatalog, std::path::PathBuf) {
    let catalog = SkillCatalog::from_toml_str(CATALOG).unwrap();
    let db_path = dir.path().join("skillpay.db");
    let db = Database::open(&db_path).unwrap();
    let q = Qualifications::new(&db, &catalog, Duration::hours(24));
    q.record_test_result("w-1", "warehouse-basics", true, at(2, 9)).unwrap();
    q.toggle_checklist_item("w-1", "forklift", 1, true, "sup-1", at(2, 10)).unwrap();
    q.toggle_checklist_item("w-1", "forklift", 2, true, "sup-1", at(2, 10)).unwrap();
    (catalog, db_path)
}

#[test]
fn test_concurrent_confirm_and_reject_have_one_winner() {
    let dir = TempDir::new().unwrap();
    let (catalog, db_path) = prepared(&dir);
    let catalog = Arc::new(catalog);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["confirm", "reject"]
        .into_iter()
        .map(|action| {
            let catalog = Arc::clone(&catalog);
            let barrier = Arc::clone(&barrier);
            let db_path = db_path.clone();
            thread::spawn(move || {
                let db = Database::open(&db_path).unwrap();
                let q = Qualifications::new(&db, &catalog, Duration::hours(24));
                barrier.wait();
                match action {
                    "confirm" => q.confirm("w-1", "forklift", SkillStatus::TheoryPassed, "sup-1", at(2, 11)),
                    _ => q.reject(
                        "w-1",
                        "forklift",
                        SkillStatus::TheoryPassed,
                        "sup-2",
                        "Unsafe reversing",
                        at(2, 11),
                    ),
                }
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "results: {results:?}");
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(PayError::StaleState { .. }))),
        "results: {results:?}"
    );

    let db = Database::open(&db_path).unwrap();
    let stored = db.get_worker_skill("w-1", "forklift").unwrap().unwrap();
    assert_eq!(stored.status, winners[0].status);
}

#[test]
fn test_concurrent_incidents_get_distinct_numbers() {
    let dir = TempDir::new().unwrap();
    let (catalog, db_path) = prepared(&dir);
    let catalog = Arc::new(catalog);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let catalog = Arc::clone(&catalog);
            let barrier = Arc::clone(&barrier);
            let db_path = db_path.clone();
            thread::spawn(move || {
                let db = Database::open(&db_path).unwrap();
                let ledger = IncidentLedger::new(&db, &catalog);
                barrier.wait();
                ledger
                    .report_incident(NewIncident {
                        worker_id: "w-1".into(),
                        skill_id: "forklift".into(),
                        description: format!("Defect {n}"),
                        reporter: "sup-1".into(),
                        evidence: vec![],
                        occurred_at: at(10 + n, 9),
                    })
                    .unwrap()
                    .incident
                    .incident_number
            })
        })
        .collect();

    let mut numbers: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, [1, 2, 3, 4]);
}
