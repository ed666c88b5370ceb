use super::fixture::TestFixture;

const SHEET: &str = r#"
[workers.w-1.terms]
base_rate = "25.00"
contract_type = "employment"

[workers.w-1.bonus]
tenure_years = 12
plan_completed = true

[workers.w-2.terms]
base_rate = "22.00"
contract_type = "mandate"
student = true

[workers.w-3.terms]
base_rate = "24.00"
contract_type = "freelance"
"#;

#[test]
fn test_payroll_reports_each_worker_separately() {
    let fixture = TestFixture::initialized("test_payroll_reports_each_worker_separately");
    let sheet = fixture.write("sheet.toml", SHEET);
    let sheet = sheet.to_string_lossy();

    let json = fixture.robot(&["payroll", "--terms", &sheet, "--date", "2026-03-20"]);
    assert_eq!(json["status"], "partial");
    assert_eq!(json["failed"], 1);

    let workers = json["workers"].as_array().unwrap();
    assert_eq!(workers.len(), 3);

    assert_eq!(workers[0]["worker_id"], "w-1");
    // Tenure is capped at ten years.
    assert_eq!(workers[0]["rate"]["discretionary"]["tenure"], "1.00");
    assert_eq!(workers[0]["rate"]["current_rate"], "26.50");
    assert_eq!(workers[0]["rate"]["next_month_rate"], "25.00");

    assert_eq!(workers[1]["rate"]["current_rate"], "23.50");

    assert_eq!(workers[2]["status"], "error");
    assert_eq!(workers[2]["error"]["code"], "INVALID_INPUT");
}

#[test]
fn test_payroll_human_output_fails_on_bad_line() {
    let fixture = TestFixture::initialized("test_payroll_human_output_fails_on_bad_line");
    let sheet = fixture.write("sheet.toml", SHEET);
    assert!(fixture.root().join("sheet.toml").exists());

    let output = fixture.run(&["payroll", "--terms", &sheet.to_string_lossy(), "--date", "2026-03-20"]);
    assert!(!output.success);
    assert!(output.stdout.contains("w-1"));
    assert!(output.stdout.contains("unknown contract type 'freelance'"));
}
