//! Repayment lifecycle tracker: the daily escalation sweep.
//!
//! Each non-paid installment steps through date-triggered milestones
//! (upcoming reminder, then 3-, 7-, and 10-day overdue) against an injected
//! "today". Every milestone fires at most once ever per installment: the
//! matching flag is a one-way latch, so re-running a sweep with unchanged
//! flag state is a no-op. Milestones are point-in-time triggers, not
//! cumulative catch-up: an installment first seen 10 days overdue receives
//! only the 10-day escalation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::escalation::notify::{Audience, NotificationDispatcher, NotificationRequest};
use crate::schedule::generator::{EscalationFlag, RepaymentInstallment};
use crate::schedule::store::InstallmentStore;
use crate::types::{ApplicationId, InstallmentId};
use crate::FundingResult;

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

/// The ordered escalation stages of a scheduled repayment.
///
/// Day offsets are fixed business thresholds, not per-application settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMilestone {
    /// Due in 7 days; remind the borrowers.
    UpcomingReminder,
    /// 3 days past due; chase the borrowers.
    Overdue3Day,
    /// 7 days past due; chase the borrowers again.
    Overdue7Day,
    /// 10 days past due; escalate to the assigned BD.
    Overdue10Day,
}

impl EscalationMilestone {
    pub const ALL: [EscalationMilestone; 4] = [
        EscalationMilestone::UpcomingReminder,
        EscalationMilestone::Overdue3Day,
        EscalationMilestone::Overdue7Day,
        EscalationMilestone::Overdue10Day,
    ];

    /// The latch gating this milestone.
    pub fn flag(&self) -> EscalationFlag {
        match self {
            EscalationMilestone::UpcomingReminder => EscalationFlag::ReminderSent,
            EscalationMilestone::Overdue3Day => EscalationFlag::Overdue3DaySent,
            EscalationMilestone::Overdue7Day => EscalationFlag::Overdue7DaySent,
            EscalationMilestone::Overdue10Day => EscalationFlag::Overdue10DaySent,
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            EscalationMilestone::Overdue10Day => Audience::AssignedBd,
            _ => Audience::Borrowers,
        }
    }

    /// The single date on which this milestone fires for a given due date.
    fn fire_date(&self, due_date: NaiveDate) -> NaiveDate {
        match self {
            // due_date == today + 7d
            EscalationMilestone::UpcomingReminder => due_date - Days::new(7),
            // due_date == today - 3d
            EscalationMilestone::Overdue3Day => due_date + Days::new(3),
            EscalationMilestone::Overdue7Day => due_date + Days::new(7),
            EscalationMilestone::Overdue10Day => due_date + Days::new(10),
        }
    }

    pub fn triggers_on(&self, due_date: NaiveDate, today: NaiveDate) -> bool {
        self.fire_date(due_date) == today
    }

    fn title(&self) -> &'static str {
        match self {
            EscalationMilestone::UpcomingReminder => "Repayment due in 7 days",
            EscalationMilestone::Overdue3Day => "Repayment 3 days overdue",
            EscalationMilestone::Overdue7Day => "Repayment 7 days overdue",
            EscalationMilestone::Overdue10Day => "Repayment 10 days overdue — escalation",
        }
    }

    fn message(&self, installment: &RepaymentInstallment) -> String {
        match self {
            EscalationMilestone::UpcomingReminder => format!(
                "Repayment {} of {} is due on {}.",
                installment.sequence_no, installment.amount, installment.due_date
            ),
            EscalationMilestone::Overdue10Day => format!(
                "Repayment {} of {} was due on {} and remains unpaid after 10 days. \
                 Follow up with the borrowers directly.",
                installment.sequence_no, installment.amount, installment.due_date
            ),
            _ => format!(
                "Repayment {} of {} was due on {} and has not been received in full.",
                installment.sequence_no, installment.amount, installment.due_date
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Sweep report
// ---------------------------------------------------------------------------

/// One notification sent during a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchedNotification {
    pub application_id: ApplicationId,
    pub installment_id: InstallmentId,
    pub sequence_no: u32,
    pub milestone: EscalationMilestone,
    pub audience: Audience,
    pub title: String,
}

/// One failure encountered during a sweep. `duplicate_risk` marks the case
/// where the send succeeded but the latch write failed, so the next sweep
/// may notify again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub application_id: ApplicationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_id: Option<InstallmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<EscalationMilestone>,
    pub error: String,
    pub duplicate_risk: bool,
}

/// Outcome of one escalation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub today: NaiveDate,
    pub dispatched: Vec<DispatchedNotification>,
    pub failures: Vec<SweepFailure>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the escalation sweep over every application's outstanding installments.
///
/// Idempotent for a given `today`: each (installment, milestone) pair
/// notifies at most once ever, and a failure while processing one
/// application never blocks the rest. Dispatch failures leave the latch
/// unset so the next sweep retries them.
pub fn run_escalation_sweep(
    store: &dyn InstallmentStore,
    dispatcher: &dyn NotificationDispatcher,
    today: NaiveDate,
) -> FundingResult<SweepReport> {
    let mut report = SweepReport {
        today,
        dispatched: Vec::new(),
        failures: Vec::new(),
    };

    for application_id in store.application_ids()? {
        if let Err(e) = sweep_application(store, dispatcher, application_id, today, &mut report) {
            warn!(application_id, error = %e, "escalation sweep failed for application");
            report.failures.push(SweepFailure {
                application_id,
                installment_id: None,
                milestone: None,
                error: e.to_string(),
                duplicate_risk: false,
            });
        }
    }

    info!(
        today = %today,
        dispatched = report.dispatched.len(),
        failures = report.failures.len(),
        "escalation sweep complete"
    );
    Ok(report)
}

fn sweep_application(
    store: &dyn InstallmentStore,
    dispatcher: &dyn NotificationDispatcher,
    application_id: ApplicationId,
    today: NaiveDate,
    report: &mut SweepReport,
) -> FundingResult<()> {
    for installment in store.for_application(application_id)? {
        // Paid installments are terminal; never evaluated again.
        if installment.is_terminal() {
            continue;
        }

        for milestone in EscalationMilestone::ALL {
            if !milestone.triggers_on(installment.due_date, today)
                || installment.flag(milestone.flag())
            {
                continue;
            }

            let request = NotificationRequest {
                audience: milestone.audience(),
                title: milestone.title().to_string(),
                message: milestone.message(&installment),
                application_id,
            };

            // Send, then latch. The dispatcher is called without holding any
            // lock; a failed send leaves the flag unset for the next sweep.
            if let Err(e) = dispatcher.send(&request) {
                let failure = crate::FundingError::from(e);
                warn!(
                    application_id,
                    installment_id = installment.installment_id,
                    milestone = ?milestone,
                    error = %failure,
                    "notification dispatch failed; will retry next sweep"
                );
                report.failures.push(SweepFailure {
                    application_id,
                    installment_id: Some(installment.installment_id),
                    milestone: Some(milestone),
                    error: failure.to_string(),
                    duplicate_risk: false,
                });
                continue;
            }

            match store.latch_flag(installment.installment_id, milestone.flag()) {
                Ok(true) => {
                    info!(
                        application_id,
                        installment_id = installment.installment_id,
                        milestone = ?milestone,
                        audience = ?request.audience,
                        "escalation notification dispatched"
                    );
                    report.dispatched.push(DispatchedNotification {
                        application_id,
                        installment_id: installment.installment_id,
                        sequence_no: installment.sequence_no,
                        milestone,
                        audience: request.audience,
                        title: request.title,
                    });
                }
                Ok(false) => {
                    // Another sweep latched between our read and send: the
                    // notification went out twice.
                    warn!(
                        application_id,
                        installment_id = installment.installment_id,
                        milestone = ?milestone,
                        "flag already latched after send; duplicate notification possible"
                    );
                    report.failures.push(SweepFailure {
                        application_id,
                        installment_id: Some(installment.installment_id),
                        milestone: Some(milestone),
                        error: "flag latched concurrently after send".to_string(),
                        duplicate_risk: true,
                    });
                }
                Err(e) => {
                    // The send succeeded; losing the latch means the next
                    // sweep may notify again. Known duplicate-risk event.
                    error!(
                        application_id,
                        installment_id = installment.installment_id,
                        milestone = ?milestone,
                        error = %e,
                        "flag write failed after successful send; duplicate risk"
                    );
                    report.failures.push(SweepFailure {
                        application_id,
                        installment_id: Some(installment.installment_id),
                        milestone: Some(milestone),
                        error: e.to_string(),
                        duplicate_risk: true,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_fire_dates_match_thresholds() {
        let due = d(2025, 5, 10);
        assert!(EscalationMilestone::UpcomingReminder.triggers_on(due, d(2025, 5, 3)));
        assert!(EscalationMilestone::Overdue3Day.triggers_on(due, d(2025, 5, 13)));
        assert!(EscalationMilestone::Overdue7Day.triggers_on(due, d(2025, 5, 17)));
        assert!(EscalationMilestone::Overdue10Day.triggers_on(due, d(2025, 5, 20)));
    }

    #[test]
    fn test_at_most_one_milestone_per_day() {
        let due = d(2025, 5, 10);
        for offset in -20i64..=20 {
            let today = if offset >= 0 {
                due + Days::new(offset as u64)
            } else {
                due - Days::new((-offset) as u64)
            };
            let matching = EscalationMilestone::ALL
                .iter()
                .filter(|m| m.triggers_on(due, today))
                .count();
            assert!(matching <= 1);
        }
    }

    #[test]
    fn test_only_final_milestone_escalates_to_bd() {
        assert_eq!(
            EscalationMilestone::Overdue10Day.audience(),
            Audience::AssignedBd
        );
        for milestone in [
            EscalationMilestone::UpcomingReminder,
            EscalationMilestone::Overdue3Day,
            EscalationMilestone::Overdue7Day,
        ] {
            assert_eq!(milestone.audience(), Audience::Borrowers);
        }
    }
}
