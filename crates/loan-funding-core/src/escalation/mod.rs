//! Date-driven reminder and escalation of scheduled repayments.

pub mod notify;
pub mod tracker;

pub use notify::{Audience, DispatchError, NotificationDispatcher, NotificationRequest};
pub use tracker::{
    run_escalation_sweep, DispatchedNotification, EscalationMilestone, SweepFailure, SweepReport,
};
