//! Property-based tests for the qualification state machine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use skillpay::catalog::{ChecklistSource, ChecklistTemplate};
use skillpay::qualification::{SkillStatus, WorkerSkill};
use skillpay::PayError;

#[derive(Debug, Clone)]
enum Op {
    PassTheory,
    RequestPractical,
    Tick(u32),
    Untick(u32),
    Confirm,
    Reject(String),
    Restart,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::PassTheory),
        Just(Op::RequestPractical),
        (1u32..5).prop_map(Op::Tick),
        (1u32..5).prop_map(Op::Untick),
        Just(Op::Confirm),
        "[ a-z]{0,8}".prop_map(Op::Reject),
        Just(Op::Restart),
    ]
}

fn source() -> ChecklistSource {
    ChecklistSource::Template(ChecklistTemplate::new(
        "forklift",
        1,
        ["Inspection", "Pick-up", "Parking"],
    ))
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

fn apply(ws: &mut WorkerSkill, op: &Op, source: &ChecklistSource, now: DateTime<Utc>) -> Result<(), PayError> {
    match op {
        Op::PassTheory => {
            ws.pass_theory(Some(1), now);
            Ok(())
        }
        Op::RequestPractical => ws.request_practical(now),
        Op::Tick(index) => ws.set_item(source, *index, true, now),
        Op::Untick(index) => ws.set_item(source, *index, false, now),
        Op::Confirm => ws.confirm(source, "sup-1", now),
        Op::Reject(reason) => ws.reject(reason, now),
        Op::Restart => ws.restart(now),
    }
}

proptest! {
    #[test]
    fn confirmed_records_never_change(ops in prop::collection::vec(arb_op(), 0..40)) {
        let source = source();
        let mut ws = WorkerSkill::new("w-1", "forklift", start());
        let mut frozen: Option<WorkerSkill> = None;

        for (step, op) in ops.iter().enumerate() {
            let now = start() + Duration::minutes(i64::try_from(step).unwrap());
            let result = apply(&mut ws, op, &source, now);
            if let Some(snapshot) = &frozen {
                prop_assert_eq!(&ws, snapshot);
                if !matches!(op, Op::PassTheory) {
                    prop_assert!(result.is_err());
                }
            } else if ws.status == SkillStatus::Confirmed {
                prop_assert!(ws.missing_items(&source).is_empty());
                prop_assert!(ws.confirmed_at.is_some());
                frozen = Some(ws.clone());
            }
        }
    }

    #[test]
    fn failed_records_always_carry_a_reason(ops in prop::collection::vec(arb_op(), 0..40)) {
        let source = source();
        let mut ws = WorkerSkill::new("w-1", "forklift", start());
        for op in &ops {
            let before = ws.clone();
            if apply(&mut ws, op, &source, start()).is_err() {
                prop_assert_eq!(&ws, &before);
            }
            if ws.status == SkillStatus::Failed {
                let reason = ws.rejection_reason.as_deref().unwrap_or_default();
                prop_assert!(!reason.trim().is_empty());
            }
        }
    }
}
