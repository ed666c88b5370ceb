//! Property-based tests for the compensation engine.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use skillpay::calendar::YearMonth;
use skillpay::compensation::{calculate, CompensationInput, ConfirmedSkill};
use skillpay::incidents::{monthly_tier, MonthlyTier, QualityIncident};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..730 * 24).prop_map(|hours| start() + Duration::hours(hours))
}

fn arb_skill() -> impl Strategy<Value = ConfirmedSkill> {
    ("[a-d]", 0i64..1000, arb_instant()).prop_map(|(id, cents, confirmed_at)| ConfirmedSkill {
        skill_id: format!("skill-{id}"),
        name: format!("Skill {id}"),
        bonus: Decimal::new(cents, 2),
        confirmed_at,
    })
}

fn arb_incident() -> impl Strategy<Value = QualityIncident> {
    ("[a-d]", arb_instant(), 1u32..5).prop_map(|(id, occurred_at, n)| QualityIncident {
        id: format!("{id}-{n}-{}", occurred_at.timestamp()),
        worker_id: "w-1".into(),
        skill_id: format!("skill-{id}"),
        occurred_at,
        incident_number: n,
        description: "Defect".into(),
        reporter: "sup-1".into(),
        evidence: vec![],
    })
}

fn arb_input() -> impl Strategy<Value = CompensationInput> {
    (
        prop::collection::vec(arb_skill(), 0..5),
        prop::collection::vec(arb_incident(), 0..8),
        0i64..730,
        1000i64..5000,
    )
        .prop_map(|(mut skills, incidents, day, base)| {
            skills.sort_by(|a, b| a.skill_id.cmp(&b.skill_id));
            skills.dedup_by(|a, b| a.skill_id == b.skill_id);
            CompensationInput {
                worker_id: "w-1".into(),
                base_rate: Decimal::new(base, 2),
                confirmed_skills: skills,
                evaluation_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(day),
                incidents,
            }
        })
}

proptest! {
    #[test]
    fn calculate_is_deterministic(input in arb_input()) {
        prop_assert_eq!(calculate(&input), calculate(&input));
    }

    #[test]
    fn totals_never_drop_below_base(input in arb_input()) {
        let rate = calculate(&input);
        prop_assert!(rate.current_total >= input.base_rate);
        prop_assert!(rate.next_month_total >= rate.current_total);
    }

    #[test]
    fn only_prior_month_confirmations_pay(input in arb_input()) {
        let rate = calculate(&input);
        let month = YearMonth::of_date(input.evaluation_date);
        for active in &rate.breakdown.active {
            prop_assert!(YearMonth::of(active.confirmed_at) < month);
        }
        for pending in &rate.breakdown.pending {
            prop_assert_eq!(YearMonth::of(pending.confirmed_at), month);
            prop_assert_eq!(pending.effective_from, month.next().first_day());
        }
    }

    #[test]
    fn later_history_does_not_change_result(input in arb_input(), extra in arb_incident()) {
        let before = calculate(&input);
        let mut longer = input.clone();
        let cutoff = input.evaluation_date + Duration::days(1);
        let mut late = extra;
        late.occurred_at = Utc.from_utc_datetime(&cutoff.and_hms_opt(8, 0, 0).unwrap());
        longer.incidents.push(late);
        prop_assert_eq!(before, calculate(&longer));
    }

    #[test]
    fn tier_counts_only_its_month(incidents in prop::collection::vec(arb_incident(), 0..12)) {
        for incident in &incidents {
            let month = incident.month();
            let in_month = incidents
                .iter()
                .filter(|i| i.skill_id == incident.skill_id && i.month() == month)
                .count();
            let expected = match in_month {
                0 => MonthlyTier::Clean,
                1 => MonthlyTier::Warning,
                _ => MonthlyTier::Blocked,
            };
            prop_assert_eq!(monthly_tier(&incidents, "w-1", &incident.skill_id, month), expected);
            // The month before has nothing to do with this one.
            let prev = month.prev();
            let prev_count = incidents
                .iter()
                .filter(|i| i.skill_id == incident.skill_id && i.month() == prev)
                .count();
            prop_assert_eq!(
                monthly_tier(&incidents, "w-1", &incident.skill_id, prev),
                MonthlyTier::from_count(prev_count)
            );
        }
    }
}
