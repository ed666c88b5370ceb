use rust_decimal::Decimal;
use serde_json::Value;

use super::fixture::TestFixture;

fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}

fn qualify_forklift(fixture: &TestFixture) {
    fixture.robot(&[
        "test", "submit", "w-1", "warehouse-basics", "--failed", "--at", "2026-03-01T08:00:00Z",
    ]);
    let retry = fixture.run(&[
        "--robot", "test", "submit", "w-1", "warehouse-basics", "--passed",
        "--at", "2026-03-01T09:00:00Z",
    ]);
    assert_error_code!(retry, "COOLDOWN_ACTIVE");

    let passed = fixture.robot(&[
        "test", "submit", "w-1", "warehouse-basics", "--passed", "--at", "2026-03-02T09:00:00Z",
    ]);
    let advanced: Vec<&str> = passed["outcome"]["advanced"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|ws| ws["skill_id"].as_str())
        .collect();
    assert_eq!(advanced, ["forklift", "pallet-jack"]);

    for index in ["1", "2", "3"] {
        fixture.robot(&[
            "skill", "check", "w-1", "forklift", index, "--by", "sup-1", "--at",
            "2026-03-02T10:00:00Z",
        ]);
    }
    fixture.robot(&["skill", "request-practical", "w-1", "forklift", "--at", "2026-03-02T10:05:00Z"]);
    let confirmed = fixture.robot(&[
        "skill", "confirm", "w-1", "forklift", "--expect", "practice_pending", "--by", "sup-1",
        "--at", "2026-03-02T10:30:00Z",
    ]);
    assert_eq!(confirmed["skill"]["status"], "confirmed");
    assert_eq!(confirmed["skill"]["confirmed_by"], "sup-1");
}

#[test]
fn test_full_qualification_workflow() {
    let fixture = TestFixture::initialized("test_full_qualification_workflow");
    qualify_forklift(&fixture);

    let show = fixture.robot(&["skill", "show", "w-1", "forklift"]);
    assert_eq!(show["skill"]["display"]["label"], "confirmed");
    assert_eq!(show["skill"]["checklist"].as_array().unwrap().len(), 3);

    let history = fixture.robot(&["skill", "history", "w-1", "forklift"]);
    let statuses: Vec<&str> = history["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["to_status"].as_str())
        .collect();
    assert_eq!(statuses.first(), Some(&"theory_passed"));
    assert_eq!(statuses.last(), Some(&"confirmed"));

    let pallet = fixture.robot(&["skill", "show", "w-1", "pallet-jack"]);
    assert_eq!(pallet["skill"]["record"]["status"], "theory_passed");
}

#[test]
fn test_confirmed_skill_is_final() {
    let fixture = TestFixture::initialized("test_confirmed_skill_is_final");
    qualify_forklift(&fixture);

    let again = fixture.run(&[
        "--robot", "skill", "confirm", "w-1", "forklift", "--expect", "confirmed", "--by", "sup-2",
    ]);
    assert_error_code!(again, "ALREADY_FINAL");

    let stale = fixture.run(&[
        "--robot", "skill", "reject", "w-1", "forklift", "--expect", "practice_pending", "--by",
        "sup-2", "--reason", "late objection",
    ]);
    assert_error_code!(stale, "STALE_STATE");

    let untick = fixture.run(&[
        "--robot", "skill", "check", "w-1", "forklift", "1", "--uncheck", "--by", "sup-2",
    ]);
    assert!(!untick.success);
}

#[test]
fn test_backdated_confirmation_does_not_pay_early() {
    let fixture = TestFixture::initialized("test_backdated_confirmation_does_not_pay_early");
    fixture.robot(&[
        "test", "submit", "w-4", "warehouse-basics", "--passed", "--at", "2026-10-15T09:00:00Z",
    ]);
    for index in ["1", "2", "3"] {
        fixture.robot(&[
            "skill", "check", "w-4", "forklift", index, "--by", "sup-1", "--at",
            "2026-10-15T10:00:00Z",
        ]);
    }

    let backdated = fixture.run(&[
        "--robot", "skill", "confirm", "w-4", "forklift", "--expect", "theory_passed", "--by",
        "sup-1", "--at", "2026-01-01T00:00:00Z",
    ]);
    assert_error_code!(backdated, "INVALID_INPUT");

    fixture.robot(&[
        "skill", "confirm", "w-4", "forklift", "--expect", "theory_passed", "--by", "sup-1",
        "--at", "2026-10-15T11:00:00Z",
    ]);
    let october = fixture.robot(&["rate", "w-4", "--base", "25.00", "--date", "2026-10-20"]);
    assert_eq!(money(&october["rate"]["current_rate"]), Decimal::new(2500, 2));
    assert_eq!(money(&october["rate"]["next_month_rate"]), Decimal::new(2800, 2));
}

#[test]
fn test_reject_and_restart() {
    let fixture = TestFixture::initialized("test_reject_and_restart");
    fixture.robot(&[
        "test", "submit", "w-2", "warehouse-basics", "--passed", "--at", "2026-03-02T09:00:00Z",
    ]);

    let no_reason = fixture.run(&[
        "--robot", "skill", "reject", "w-2", "pallet-jack", "--expect", "theory_passed", "--by",
        "sup-1", "--reason", "   ",
    ]);
    assert_error_code!(no_reason, "MISSING_REASON");

    let rejected = fixture.robot(&[
        "skill", "reject", "w-2", "pallet-jack", "--expect", "theory_passed", "--by", "sup-1",
        "--reason", "Load not secured",
    ]);
    assert_eq!(rejected["skill"]["status"], "failed");
    assert_eq!(rejected["skill"]["rejection_reason"], "Load not secured");

    let restarted = fixture.robot(&["skill", "restart", "w-2", "pallet-jack", "--by", "sup-1"]);
    assert_eq!(restarted["skill"]["status"], "pending");
}

#[test]
fn test_document_skill_confirms_on_filing() {
    let fixture = TestFixture::initialized("test_document_skill_confirms_on_filing");

    let both = fixture.run(&[
        "--robot", "skill", "document", "w-3", "first-aid", "--issued", "2026-01-10",
        "--expires", "2028-01-10", "--indefinite", "--by", "hr-1",
    ]);
    assert!(!both.success);

    let filed = fixture.robot(&[
        "skill", "document", "w-3", "first-aid", "--issued", "2026-01-10", "--indefinite",
        "--attach", "scan-001.pdf", "--by", "hr-1", "--at", "2026-03-05T12:00:00Z",
    ]);
    assert_eq!(filed["skill"]["status"], "confirmed");

    let wrong_method = fixture.run(&[
        "--robot", "skill", "check", "w-3", "first-aid", "1", "--by", "hr-1",
    ]);
    assert_error_code!(wrong_method, "VERIFICATION_MISMATCH");
}

#[test]
fn test_rate_follows_month_boundaries_and_incidents() {
    let fixture = TestFixture::initialized("test_rate_follows_month_boundaries_and_incidents");
    qualify_forklift(&fixture);

    let march = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-03-20"]);
    assert_eq!(money(&march["rate"]["current_rate"]), Decimal::new(2500, 2));
    assert_eq!(money(&march["rate"]["next_month_rate"]), Decimal::new(2800, 2));
    assert_eq!(march["rate"]["skills"]["breakdown"]["pending"][0]["effective_from"], "2026-04-01");

    let april = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-04-10"]);
    assert_eq!(money(&april["rate"]["current_rate"]), Decimal::new(2800, 2));

    let first = fixture.robot(&[
        "incident", "report", "w-1", "forklift", "--description", "Damaged rack", "--by", "sup-1",
        "--at", "2026-04-11T09:00:00Z",
    ]);
    assert_eq!(first["reported"]["incident"]["incident_number"], 1);
    assert_eq!(first["reported"]["tier"], "warning");

    let warned = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-04-20"]);
    assert_eq!(money(&warned["rate"]["current_rate"]), Decimal::new(2800, 2));

    let second = fixture.robot(&[
        "incident", "report", "w-1", "forklift", "--description", "Dropped pallet", "--by", "sup-1",
        "--at", "2026-04-18T09:00:00Z",
    ]);
    assert_eq!(second["reported"]["tier"], "blocked");

    let blocked = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-04-20"]);
    assert_eq!(money(&blocked["rate"]["current_rate"]), Decimal::new(2500, 2));
    assert_eq!(blocked["rate"]["skills"]["breakdown"]["active"][0]["is_blocked"], true);
    assert_eq!(money(&blocked["rate"]["next_month_rate"]), Decimal::new(2800, 2));

    // Earlier evaluation dates ignore the later incidents.
    let replay = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-04-10"]);
    assert_eq!(money(&replay["rate"]["current_rate"]), Decimal::new(2800, 2));

    let may = fixture.robot(&["rate", "w-1", "--base", "25.00", "--date", "2026-05-02"]);
    assert_eq!(money(&may["rate"]["current_rate"]), Decimal::new(2800, 2));

    let tier = fixture.robot(&["incident", "tier", "w-1", "forklift", "--month", "2026-05"]);
    assert_eq!(tier["tier"], "clean");

    let listed = fixture.robot(&["incident", "list", "w-1", "--month", "2026-04"]);
    assert_eq!(listed["incidents"].as_array().unwrap().len(), 2);
}
