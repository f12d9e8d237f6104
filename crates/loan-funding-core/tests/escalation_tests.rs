use chrono::{Days, NaiveDate};
use loan_funding_core::escalation::{
    run_escalation_sweep, Audience, DispatchError, EscalationMilestone, NotificationDispatcher,
    NotificationRequest,
};
use loan_funding_core::schedule::{
    regenerate_schedule, InMemoryInstallmentStore, InstallmentStore,
};
use loan_funding_core::{LoanTerms, RepaymentFrequency};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::sync::Mutex;

// ===========================================================================
// Test dispatchers
// ===========================================================================

/// Records every request it is handed.
#[derive(Default)]
struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingDispatcher {
    fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Fails a configurable number of sends before recovering.
struct FlakyDispatcher {
    failures_remaining: Mutex<u32>,
    inner: RecordingDispatcher,
}

impl FlakyDispatcher {
    fn failing(times: u32) -> Self {
        Self {
            failures_remaining: Mutex::new(times),
            inner: RecordingDispatcher::default(),
        }
    }
}

impl NotificationDispatcher for FlakyDispatcher {
    fn send(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        let mut remaining = self.failures_remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(DispatchError::new("smtp connection refused"));
        }
        self.inner.send(request)
    }
}

// ===========================================================================
// Fixtures
// ===========================================================================

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Seed one application with a 3-installment monthly schedule settling on
/// `settlement`; due dates are settlement + 1, 2, 3 months.
fn seed_schedule(
    store: &InMemoryInstallmentStore,
    application_id: u64,
    settlement: NaiveDate,
) -> Vec<loan_funding_core::schedule::RepaymentInstallment> {
    let loan = LoanTerms {
        loan_amount: dec!(12_000),
        loan_term: 3,
        interest_rate: Some(dec!(0)),
        repayment_frequency: RepaymentFrequency::Monthly,
        estimated_settlement_date: Some(settlement),
    };
    regenerate_schedule(store, application_id, &loan, settlement)
        .unwrap()
        .result
}

// ===========================================================================
// Reminder and overdue milestones
// ===========================================================================

#[test]
fn test_reminder_fires_seven_days_before_due() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let due = installments[0].due_date; // 2025-02-15

    let dispatcher = RecordingDispatcher::default();
    let report = run_escalation_sweep(&store, &dispatcher, due - Days::new(7)).unwrap();

    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].milestone, EscalationMilestone::UpcomingReminder);
    assert_eq!(report.dispatched[0].audience, Audience::Borrowers);
    assert!(store.get(installments[0].installment_id).unwrap().reminder_sent);

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].application_id, 1);
}

#[test]
fn test_sweep_is_idempotent_for_same_day() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let today = installments[0].due_date - Days::new(7);

    let dispatcher = RecordingDispatcher::default();
    let first = run_escalation_sweep(&store, &dispatcher, today).unwrap();
    let second = run_escalation_sweep(&store, &dispatcher, today).unwrap();

    assert_eq!(first.dispatched.len(), 1);
    assert_eq!(second.dispatched.len(), 0);
    assert_eq!(dispatcher.sent().len(), 1);
}

#[test]
fn test_overdue_milestones_step_through_recipients() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let due = installments[0].due_date;
    let dispatcher = RecordingDispatcher::default();

    for (offset, milestone, audience) in [
        (3u64, EscalationMilestone::Overdue3Day, Audience::Borrowers),
        (7, EscalationMilestone::Overdue7Day, Audience::Borrowers),
        (10, EscalationMilestone::Overdue10Day, Audience::AssignedBd),
    ] {
        let report = run_escalation_sweep(&store, &dispatcher, due + Days::new(offset)).unwrap();
        let fired: Vec<_> = report
            .dispatched
            .iter()
            .filter(|n| n.installment_id == installments[0].installment_id)
            .collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].milestone, milestone);
        assert_eq!(fired[0].audience, audience);
    }
}

#[test]
fn test_thresholds_are_point_in_time_not_catch_up() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let due = installments[0].due_date;

    // First ever sweep happens when the installment is already 10 days
    // overdue: only the 10-day escalation fires, nothing retroactive.
    let dispatcher = RecordingDispatcher::default();
    let report = run_escalation_sweep(&store, &dispatcher, due + Days::new(10)).unwrap();

    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].milestone, EscalationMilestone::Overdue10Day);

    let flags = store.get(installments[0].installment_id).unwrap();
    assert!(!flags.reminder_sent);
    assert!(!flags.overdue_3_day_sent);
    assert!(!flags.overdue_7_day_sent);
    assert!(flags.overdue_10_day_sent);
}

#[test]
fn test_days_between_thresholds_are_quiet() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let due = installments[0].due_date;
    let dispatcher = RecordingDispatcher::default();

    for offset in [1u64, 2, 4, 5, 6, 8, 9, 11, 12] {
        let report = run_escalation_sweep(&store, &dispatcher, due + Days::new(offset)).unwrap();
        let for_first: Vec<_> = report
            .dispatched
            .iter()
            .filter(|n| n.installment_id == installments[0].installment_id)
            .collect();
        assert!(for_first.is_empty(), "unexpected dispatch at +{offset}d");
    }
}

// ===========================================================================
// Terminal and partial installments
// ===========================================================================

#[test]
fn test_paid_installment_is_terminal_for_the_sweep() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let first = &installments[0];
    store
        .record_payment(first.installment_id, first.amount, first.due_date)
        .unwrap();

    let dispatcher = RecordingDispatcher::default();
    for offset in [3u64, 7, 10] {
        let report =
            run_escalation_sweep(&store, &dispatcher, first.due_date + Days::new(offset)).unwrap();
        assert!(report
            .dispatched
            .iter()
            .all(|n| n.installment_id != first.installment_id));
    }
    assert!(dispatcher.sent().is_empty());
}

#[test]
fn test_partial_installment_keeps_escalating() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let first = &installments[0];
    store
        .record_payment(first.installment_id, dec!(100), first.due_date)
        .unwrap();

    let dispatcher = RecordingDispatcher::default();
    let report =
        run_escalation_sweep(&store, &dispatcher, first.due_date + Days::new(3)).unwrap();
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].milestone, EscalationMilestone::Overdue3Day);
}

// ===========================================================================
// Failure handling
// ===========================================================================

#[test]
fn test_dispatch_failure_leaves_latch_unset_and_retries() {
    let store = InMemoryInstallmentStore::new();
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let today = installments[0].due_date - Days::new(7);

    let dispatcher = FlakyDispatcher::failing(1);
    let first = run_escalation_sweep(&store, &dispatcher, today).unwrap();
    assert!(first.dispatched.is_empty());
    assert_eq!(first.failures.len(), 1);
    assert!(!first.failures[0].duplicate_risk);
    assert!(!store.get(installments[0].installment_id).unwrap().reminder_sent);

    // Next sweep (same day, dispatcher recovered) retries and latches.
    let second = run_escalation_sweep(&store, &dispatcher, today).unwrap();
    assert_eq!(second.dispatched.len(), 1);
    assert!(store.get(installments[0].installment_id).unwrap().reminder_sent);
}

#[test]
fn test_one_failing_send_does_not_block_other_applications() {
    let store = InMemoryInstallmentStore::new();
    let app_a = seed_schedule(&store, 1, d(2025, 1, 15));
    let app_b = seed_schedule(&store, 2, d(2025, 1, 15));
    let today = app_a[0].due_date - Days::new(7);

    // Application 1 is swept first (stable id order); its send fails, the
    // sweep carries on and application 2 still gets its reminder.
    let dispatcher = FlakyDispatcher::failing(1);
    let report = run_escalation_sweep(&store, &dispatcher, today).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].application_id, 1);
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].application_id, 2);
    assert!(store.get(app_b[0].installment_id).unwrap().reminder_sent);
}

#[test]
fn test_multiple_installments_same_application_fire_independently() {
    let store = InMemoryInstallmentStore::new();
    // Monthly due dates are far enough apart that a single day can only ever
    // match one milestone per installment; craft a day where installment 1
    // is 10 days overdue while installment 2 has its reminder quiet window.
    let installments = seed_schedule(&store, 1, d(2025, 1, 15));
    let dispatcher = RecordingDispatcher::default();

    let report = run_escalation_sweep(
        &store,
        &dispatcher,
        installments[0].due_date + Days::new(10),
    )
    .unwrap();

    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(
        report.dispatched[0].installment_id,
        installments[0].installment_id
    );
}
